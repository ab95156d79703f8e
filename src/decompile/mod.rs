//! Stack-based symbolic execution of method bodies and source-text
//! regeneration.

pub mod ast;
pub mod context;
pub mod cursor;
pub mod descriptor;
pub mod engine;
pub mod generate;
pub mod handlers;
pub mod lambda;
pub mod opcodes;
