use crate::attribute_info::CodeAttribute;
use crate::constant_info::ConstantPool;
use crate::error::DecompileError;

use super::ast::{Node, Origin};
use super::descriptor::{parse_type_descriptor, JvmType};

/// Stable handle into a [`StatementList`]. Handles survive insertion and
/// removal of other statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StmtHandle(usize);

/// Ordered statement sequence backed by a slot arena. Statements are
/// addressed by handle; the visible order is kept separately so positional
/// edits never invalidate outstanding handles.
#[derive(Debug, Default)]
pub struct StatementList {
    slots: Vec<Option<Node>>,
    order: Vec<usize>,
}

impl StatementList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn push(&mut self, node: Node) -> StmtHandle {
        let slot = self.slots.len();
        self.slots.push(Some(node));
        self.order.push(slot);
        StmtHandle(slot)
    }

    pub fn insert_before(
        &mut self,
        at: StmtHandle,
        node: Node,
    ) -> Result<StmtHandle, DecompileError> {
        let position = self.position_of(at)?;
        let slot = self.slots.len();
        self.slots.push(Some(node));
        self.order.insert(position, slot);
        Ok(StmtHandle(slot))
    }

    pub fn replace(&mut self, at: StmtHandle, node: Node) -> Result<Node, DecompileError> {
        self.position_of(at)?;
        let slot = &mut self.slots[at.0];
        let old = slot.take();
        *slot = Some(node);
        old.ok_or_else(|| DecompileError::argument("statement handle is vacant"))
    }

    pub fn remove(&mut self, at: StmtHandle) -> Result<Node, DecompileError> {
        let position = self.position_of(at)?;
        self.order.remove(position);
        self.slots[at.0]
            .take()
            .ok_or_else(|| DecompileError::argument("statement handle is vacant"))
    }

    pub fn get(&self, at: StmtHandle) -> Option<&Node> {
        self.slots.get(at.0).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, at: StmtHandle) -> Option<&mut Node> {
        self.slots.get_mut(at.0).and_then(|s| s.as_mut())
    }

    pub fn last_handle(&self) -> Option<StmtHandle> {
        self.order.last().map(|&slot| StmtHandle(slot))
    }

    pub fn handles(&self) -> impl Iterator<Item = StmtHandle> + '_ {
        self.order.iter().map(|&slot| StmtHandle(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|&slot| self.slots[slot].as_ref())
    }

    pub fn into_vec(mut self) -> Vec<Node> {
        self.order
            .iter()
            .filter_map(|&slot| self.slots[slot].take())
            .collect()
    }

    fn position_of(&self, at: StmtHandle) -> Result<usize, DecompileError> {
        if self.slots.get(at.0).map(|s| s.is_some()) != Some(true) {
            return Err(DecompileError::argument("statement handle is vacant"));
        }
        self.order
            .iter()
            .position(|&slot| slot == at.0)
            .ok_or_else(|| DecompileError::argument("statement handle was removed"))
    }
}

/// Mutable state of one decompilation run: the expression stack, the
/// statement sequence, the current origin and the abort flag.
pub struct DecompilationContext {
    stack: Vec<Node>,
    pub statements: StatementList,
    pub pc: u32,
    pub line: Option<u16>,
    aborted: Option<String>,
}

impl DecompilationContext {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            statements: StatementList::new(),
            pc: 0,
            line: None,
            aborted: None,
        }
    }

    pub fn origin(&self) -> Origin {
        Origin {
            pc: self.pc,
            line: self.line,
        }
    }

    pub fn push(&mut self, node: Node) {
        self.stack.push(node);
    }

    pub fn pop(&mut self) -> Result<Node, DecompileError> {
        self.stack
            .pop()
            .ok_or_else(|| DecompileError::illegal_state("pop from empty expression stack"))
    }

    pub fn top(&self) -> Option<&Node> {
        self.stack.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Node> {
        self.stack.last_mut()
    }

    pub fn stack(&self) -> &[Node] {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Vec<Node> {
        &mut self.stack
    }

    /// Moves the top of the stack into the statement sequence. The top must
    /// exist and be statement-shaped; anything else is a handler defect.
    pub fn reduce(&mut self) -> Result<StmtHandle, DecompileError> {
        let node = self
            .stack
            .pop()
            .ok_or_else(|| DecompileError::illegal_state("reduce on empty expression stack"))?;
        if !node.is_statement() {
            return Err(DecompileError::illegal_state(format!(
                "reduce on non-statement node {}",
                node.kind_id().name()
            )));
        }
        Ok(self.statements.push(node))
    }

    /// Drains the stack bottom-to-top into the statement sequence. Fails if
    /// any remaining node is not statement-shaped.
    pub fn reduce_all(&mut self) -> Result<(), DecompileError> {
        let drained: Vec<Node> = self.stack.drain(..).collect();
        for node in drained {
            if !node.is_statement() {
                return Err(DecompileError::illegal_state(format!(
                    "expression of kind {} left on stack at end of code",
                    node.kind_id().name()
                )));
            }
            self.statements.push(node);
        }
        Ok(())
    }

    /// Appends a statement directly, bypassing the stack.
    pub fn emit(&mut self, node: Node) -> StmtHandle {
        self.statements.push(node)
    }

    /// Marks the decompilation as failed on an unsupported construct. The
    /// engine stops dispatching and surfaces the reason from its flush pass.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.aborted.is_none() {
            self.aborted = Some(reason.into());
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.aborted.as_deref()
    }
}

impl Default for DecompilationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One local variable's liveness range and identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name: String,
    pub ty: JvmType,
    pub slot: u16,
}

impl LocalVariableEntry {
    /// An entry valid at every pc, used for synthesized variables (lambda
    /// captures, the enclosing `this`).
    pub fn unbounded(name: impl Into<String>, ty: JvmType, slot: u16) -> Self {
        Self {
            start_pc: 0,
            length: u16::MAX,
            name: name.into(),
            ty,
            slot,
        }
    }

    pub fn covers(&self, pc: u32) -> bool {
        let start = self.start_pc as u32;
        let end = start + self.length as u32;
        pc >= start && pc < end
    }
}

/// Local variable lookup for one method, built from its LocalVariableTable
/// plus any synthesized entries.
#[derive(Clone, Debug, Default)]
pub struct LocalVariables {
    entries: Vec<LocalVariableEntry>,
}

impl LocalVariables {
    pub fn from_code(
        code: &CodeAttribute,
        pool: &ConstantPool,
    ) -> Result<Self, DecompileError> {
        let mut entries = Vec::new();
        if let Some(table) = code.local_variable_table() {
            for item in &table.items {
                let name = pool.utf8(item.name_index)?.to_string();
                let descriptor = pool.utf8(item.descriptor_index)?;
                let ty = parse_type_descriptor(descriptor).ok_or_else(|| {
                    DecompileError::format(format!(
                        "malformed local variable descriptor '{}'",
                        descriptor
                    ))
                })?;
                entries.push(LocalVariableEntry {
                    start_pc: item.start_pc,
                    length: item.length,
                    name,
                    ty,
                    slot: item.index,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Variable live in `slot` at `pc`. An entry containing `pc` wins over
    /// any later reuse of the slot; only when none contains it does the
    /// lookup fall back to a short window ahead, because store instructions
    /// define their variable one instruction before the recorded start.
    pub fn lookup(&self, slot: u16, pc: u32) -> Option<&LocalVariableEntry> {
        self.entries
            .iter()
            .find(|e| e.slot == slot && e.covers(pc))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.slot == slot && e.covers(pc + 3))
            })
    }

    /// Adds synthesized entries with priority over table entries.
    pub fn merge_front(&mut self, extra: Vec<LocalVariableEntry>) {
        let mut merged = extra;
        merged.append(&mut self.entries);
        self.entries = merged;
    }

    pub fn push(&mut self, entry: LocalVariableEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LocalVariableEntry] {
        &self.entries
    }
}
