use std::fmt;

/// Error type for decompilation failures.
///
/// Every kind is fatal to the current decompilation; nothing is retried and
/// no partial result is ever returned. Callers may catch [`DecompileError::Format`]
/// and fall back to a non-decompiled description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecompileError {
    /// Malformed or unsupported input: an unknown constant pool tag, an index
    /// out of range, an opcode with no handler in the current state, a missing
    /// lambda declaration.
    Format(String),
    /// Caller defect: a typed view was requested for a pool entry of another
    /// kind, or a lookup argument was malformed.
    Argument(String),
    /// Defect in opcode-handler wiring, e.g. `reduce()` on an empty or
    /// non-statement-shaped stack.
    IllegalState(String),
}

impl DecompileError {
    pub fn format(message: impl Into<String>) -> Self {
        DecompileError::Format(message.into())
    }

    pub fn argument(message: impl Into<String>) -> Self {
        DecompileError::Argument(message.into())
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        DecompileError::IllegalState(message.into())
    }
}

impl fmt::Display for DecompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompileError::Format(msg) => write!(f, "format error: {}", msg),
            DecompileError::Argument(msg) => write!(f, "argument error: {}", msg),
            DecompileError::IllegalState(msg) => write!(f, "illegal state: {}", msg),
        }
    }
}

impl std::error::Error for DecompileError {}

/// Error type for code generation failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
    /// No delegate in the generator configuration accepted the node.
    NoDelegate { kind: &'static str },
    /// A selected delegate failed while rendering.
    Delegate(String),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::NoDelegate { kind } => {
                write!(f, "no generator delegate for node kind '{}'", kind)
            }
            GenerateError::Delegate(msg) => write!(f, "generator delegate failed: {}", msg),
        }
    }
}

impl std::error::Error for GenerateError {}
