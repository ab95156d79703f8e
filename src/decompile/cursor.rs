use crate::error::DecompileError;

use super::context::DecompilationContext;

/// Callback queued against a future program counter; run by the engine once
/// the cursor reaches the target position.
pub type LookAhead = Box<dyn FnOnce(&mut DecompilationContext) -> Result<(), DecompileError>>;

/// Instruction sequences only ever need to see a handful of bytes ahead;
/// a peek running past this is a handler defect surfaced as a format error.
const MAX_PEEK_DEPTH: usize = 16;

/// Sequential reader over one method's code array with bounded look-ahead.
///
/// `next_*` reads advance the visible position and discard any outstanding
/// peeks. `peek_*` reads advance a shadow position only; `commit` replays
/// them onto the visible position, letting a handler consume the bytes of
/// an instruction pattern it has just recognized.
pub struct InstructionCursor<'a> {
    code: &'a [u8],
    pos: usize,
    peek_pos: usize,
    pending: Vec<(u32, LookAhead)>,
}

impl<'a> InstructionCursor<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            pos: 0,
            peek_pos: 0,
            pending: Vec::new(),
        }
    }

    /// Current visible position, the program counter of the next read.
    pub fn pc(&self) -> u32 {
        self.pos as u32
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.code.len()
    }

    pub fn next_opcode(&mut self) -> Result<u8, DecompileError> {
        self.next_u8()
    }

    pub fn next_u8(&mut self) -> Result<u8, DecompileError> {
        let byte = self.byte_at(self.pos)?;
        self.pos += 1;
        self.peek_pos = self.pos;
        Ok(byte)
    }

    pub fn next_i8(&mut self) -> Result<i8, DecompileError> {
        Ok(self.next_u8()? as i8)
    }

    pub fn next_u16(&mut self) -> Result<u16, DecompileError> {
        let hi = self.next_u8()?;
        let lo = self.next_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub fn next_i16(&mut self) -> Result<i16, DecompileError> {
        Ok(self.next_u16()? as i16)
    }

    pub fn next_i32(&mut self) -> Result<i32, DecompileError> {
        let hi = self.next_u16()?;
        let lo = self.next_u16()?;
        Ok((((hi as u32) << 16) | lo as u32) as i32)
    }

    pub fn peek_u8(&mut self) -> Result<u8, DecompileError> {
        if self.peek_pos + 1 - self.pos > MAX_PEEK_DEPTH {
            return Err(DecompileError::format(format!(
                "peek depth exceeds {} bytes at pc {}",
                MAX_PEEK_DEPTH, self.pos
            )));
        }
        let byte = self.byte_at(self.peek_pos)?;
        self.peek_pos += 1;
        Ok(byte)
    }

    pub fn peek_i8(&mut self) -> Result<i8, DecompileError> {
        Ok(self.peek_u8()? as i8)
    }

    pub fn peek_u16(&mut self) -> Result<u16, DecompileError> {
        let hi = self.peek_u8()?;
        let lo = self.peek_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub fn peek_i16(&mut self) -> Result<i16, DecompileError> {
        Ok(self.peek_u16()? as i16)
    }

    /// Makes all outstanding peeks visible: the next `next_*` read continues
    /// from where the peeks stopped.
    pub fn commit(&mut self) {
        self.pos = self.peek_pos;
    }

    /// Discards outstanding peeks.
    pub fn reset_peek(&mut self) {
        self.peek_pos = self.pos;
    }

    /// Queues `callback` to run once the visible position reaches `target`.
    pub fn look_ahead(&mut self, target: u32, callback: LookAhead) {
        self.pending.push((target, callback));
    }

    /// Removes and returns the callbacks whose target is at or before `pc`,
    /// in registration order.
    pub fn take_due(&mut self, pc: u32) -> Vec<LookAhead> {
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(self.pending.len());
        for (target, callback) in self.pending.drain(..) {
            if target <= pc {
                due.push(callback);
            } else {
                remaining.push((target, callback));
            }
        }
        self.pending = remaining;
        due
    }

    /// True if any look-ahead callback is still queued.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn byte_at(&self, at: usize) -> Result<u8, DecompileError> {
        self.code.get(at).copied().ok_or_else(|| {
            DecompileError::format(format!(
                "unexpected end of code at offset {} (length {})",
                at,
                self.code.len()
            ))
        })
    }
}
