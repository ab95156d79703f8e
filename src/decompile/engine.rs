use log::debug;

use crate::attribute_info::CodeAttribute;
use crate::error::DecompileError;
use crate::method_info::MethodInfo;
use crate::types::ClassFile;

use super::ast::{Node, NodeKind};
use super::context::{DecompilationContext, LocalVariables};
use super::cursor::InstructionCursor;

/// Which opcodes an extension or enhancement applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeMatch {
    One(u8),
    /// Inclusive range.
    Range(u8, u8),
}

impl OpcodeMatch {
    pub fn matches(&self, opcode: u8) -> bool {
        match *self {
            OpcodeMatch::One(op) => opcode == op,
            OpcodeMatch::Range(lo, hi) => (lo..=hi).contains(&opcode),
        }
    }
}

pub type GuardFn = fn(&DecompilationContext) -> bool;
pub type HandlerFn = fn(&mut Engine<'_>, u8) -> Result<(), DecompileError>;

/// Primary opcode handler. Among extensions whose opcode set contains the
/// current opcode and whose guard passes, the first registered wins.
pub struct Extension {
    pub name: &'static str,
    pub opcodes: Vec<OpcodeMatch>,
    pub guard: GuardFn,
    pub run: HandlerFn,
}

/// When an advisory enhancement runs relative to the primary handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Before,
    After,
}

pub enum EnhancementKind {
    /// Observes or annotates; never replaces the primary handler. Runs in
    /// ascending priority order, ties broken by registration order.
    Advisory { stage: Stage, priority: i32 },
    /// Runs after the primary handler and its advisories; may rewrite the
    /// stack and the statement sequence.
    Corrective,
}

pub struct Enhancement {
    pub name: &'static str,
    pub opcodes: Vec<OpcodeMatch>,
    pub kind: EnhancementKind,
    pub run: HandlerFn,
}

/// Registry of extensions and enhancements. Built once (usually via
/// `DecompilerConfig::standard()`) and shared across decompilations.
#[derive(Default)]
pub struct DecompilerConfig {
    extensions: Vec<Extension>,
    enhancements: Vec<Enhancement>,
}

impl DecompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_extension(&mut self, extension: Extension) {
        self.extensions.push(extension);
    }

    pub fn register_enhancement(&mut self, enhancement: Enhancement) {
        self.enhancements.push(enhancement);
    }

    fn select_extension(
        &self,
        opcode: u8,
        ctx: &DecompilationContext,
    ) -> Option<(&'static str, HandlerFn)> {
        self.extensions
            .iter()
            .find(|e| e.opcodes.iter().any(|m| m.matches(opcode)) && (e.guard)(ctx))
            .map(|e| (e.name, e.run))
    }

    fn advisory_runs(&self, opcode: u8, stage: Stage) -> Vec<HandlerFn> {
        let mut selected: Vec<(i32, HandlerFn)> = self
            .enhancements
            .iter()
            .filter_map(|e| match e.kind {
                EnhancementKind::Advisory { stage: s, priority }
                    if s == stage && e.opcodes.iter().any(|m| m.matches(opcode)) =>
                {
                    Some((priority, e.run))
                }
                _ => None,
            })
            .collect();
        // Stable sort keeps registration order for equal priorities.
        selected.sort_by_key(|&(priority, _)| priority);
        selected.into_iter().map(|(_, run)| run).collect()
    }

    fn corrective_runs(&self, opcode: u8) -> Vec<HandlerFn> {
        self.enhancements
            .iter()
            .filter(|e| {
                matches!(e.kind, EnhancementKind::Corrective)
                    && e.opcodes.iter().any(|m| m.matches(opcode))
            })
            .map(|e| e.run)
            .collect()
    }
}

/// One decompilation run over one method's code.
pub struct Engine<'a> {
    pub config: &'a DecompilerConfig,
    pub class: &'a ClassFile,
    pub code: &'a CodeAttribute,
    pub is_static: bool,
    pub locals: LocalVariables,
    pub ctx: DecompilationContext,
    pub cursor: InstructionCursor<'a>,
}

/// Decompiles a method body into its statement sequence.
pub fn decompile_method(
    config: &DecompilerConfig,
    class: &ClassFile,
    method: &MethodInfo,
) -> Result<Vec<Node>, DecompileError> {
    let code = method.code().ok_or_else(|| {
        DecompileError::format("method has no Code attribute".to_string())
    })?;
    let locals = LocalVariables::from_code(code, &class.const_pool)?;
    decompile_code(config, class, code, method.is_static(), locals)
}

/// Decompiles a code attribute with caller-provided local variables. Lambda
/// backing methods go through here with synthesized capture entries.
pub fn decompile_code(
    config: &DecompilerConfig,
    class: &ClassFile,
    code: &CodeAttribute,
    is_static: bool,
    locals: LocalVariables,
) -> Result<Vec<Node>, DecompileError> {
    let mut engine = Engine {
        config,
        class,
        code,
        is_static,
        locals,
        ctx: DecompilationContext::new(),
        cursor: InstructionCursor::new(&code.code),
    };
    engine.run()
}

impl<'a> Engine<'a> {
    fn run(&mut self) -> Result<Vec<Node>, DecompileError> {
        let code = self.code;
        let line_table = code.line_number_table();

        loop {
            let pc = self.cursor.pc();
            for callback in self.cursor.take_due(pc) {
                callback(&mut self.ctx)?;
            }
            if self.ctx.is_aborted() || self.cursor.is_at_end() {
                break;
            }

            self.ctx.pc = pc;
            self.ctx.line = line_table.and_then(|t| t.line_for_pc(pc as u16));

            let opcode = self.cursor.next_opcode()?;
            let (_name, primary) =
                self.config.select_extension(opcode, &self.ctx).ok_or_else(|| {
                    DecompileError::format(format!(
                        "unsupported opcode 0x{:02x} at pc {} in current state",
                        opcode, pc
                    ))
                })?;

            // Handler fns are plain fn pointers, copied out of the config
            // before the engine is borrowed mutably.
            for run in self.config.advisory_runs(opcode, Stage::Before) {
                run(self, opcode)?;
            }
            primary(self, opcode)?;
            if self.ctx.is_aborted() {
                continue;
            }
            for run in self.config.advisory_runs(opcode, Stage::After) {
                run(self, opcode)?;
            }
            for run in self.config.corrective_runs(opcode) {
                run(self, opcode)?;
            }
        }

        self.flush()
    }

    /// Single exit funnel: every decompilation, successful or not, passes
    /// through here. An aborted run never yields a partial tree.
    fn flush(&mut self) -> Result<Vec<Node>, DecompileError> {
        if let Some(reason) = self.ctx.abort_reason() {
            debug!("decompilation aborted: {}", reason);
            return Err(DecompileError::format(format!(
                "unsupported construct: {}",
                reason
            )));
        }
        for callback in self.cursor.take_due(u32::MAX) {
            callback(&mut self.ctx)?;
        }
        self.ctx.reduce_all().map_err(|e| match e {
            DecompileError::IllegalState(msg) => DecompileError::format(msg),
            other => other,
        })?;
        // Control transfers and bookkeeping nodes must have been collapsed
        // by now; any that reached statement position mean the input needs
        // control-flow reconstruction.
        for node in self.ctx.statements.iter() {
            if matches!(
                node.kind,
                NodeKind::Branch { .. }
                    | NodeKind::Goto { .. }
                    | NodeKind::Dup(_)
                    | NodeKind::UninitNew { .. }
                    | NodeKind::Cmp { .. }
            ) {
                return Err(DecompileError::format(format!(
                    "unsupported construct: {} in statement position",
                    node.kind_id().name()
                )));
            }
        }
        let statements = std::mem::take(&mut self.ctx.statements);
        Ok(statements.into_vec())
    }
}
