//! Resolution of lambda backing methods.
//!
//! `invokedynamic` sites turn into [`NodeKind::Lambda`] values naming a
//! synthetic backing method (`lambda$test$0` and friends). Decompiling that
//! backing body needs context the class file does not record directly: which
//! method the lambda was written in, and what its leading parameter slots
//! mean (they hold the captured variables, in capture order).

use crate::error::DecompileError;
use crate::types::ClassFile;

use super::ast::{Node, NodeKind};
use super::context::{LocalVariableEntry, LocalVariables};
use super::engine::{decompile_code, decompile_method, DecompilerConfig};

/// A lambda expression located in its enclosing method.
#[derive(Debug)]
pub struct ResolvedLambda {
    /// Name of the method the lambda expression appears in.
    pub enclosing_method: String,
    /// The Lambda node from the enclosing method's decompiled body.
    pub lambda: Node,
    /// Synthesized variable entries for the backing method's capture slots.
    pub captured_locals: Vec<LocalVariableEntry>,
}

/// Finds the method enclosing `backing_name` and the Lambda node referring
/// to it.
///
/// Candidate enclosers are narrowed by line number containment when both
/// sides carry a LineNumberTable; a backing method without one can only be
/// enclosed by another synthetic backing method, so the search is restricted
/// to those. Candidates are then decompiled and searched for a matching
/// Lambda node. Candidates that fail to decompile are skipped; a lambda
/// inside an unsupported method body cannot be resolved anyway.
pub fn resolve_backing_method(
    config: &DecompilerConfig,
    class: &ClassFile,
    backing_name: &str,
) -> Result<ResolvedLambda, DecompileError> {
    let backing = class.find_method(backing_name).ok_or_else(|| {
        DecompileError::format(format!("backing method '{}' not found", backing_name))
    })?;
    let backing_lines = backing.code().and_then(|c| {
        c.line_number_table().and_then(|t| t.line_range())
    });

    for method in &class.methods {
        let name = match class.method_name(method) {
            Ok(name) => name,
            Err(_) => continue,
        };
        if name == backing_name || method.code().is_none() {
            continue;
        }
        if backing_lines.is_none() && !method.is_synthetic() {
            continue;
        }
        if let (Some((backing_lo, backing_hi)), Some(code)) = (backing_lines, method.code()) {
            if let Some((lo, hi)) = code.line_number_table().and_then(|t| t.line_range()) {
                if backing_lo < lo || backing_hi > hi {
                    continue;
                }
            }
        }

        let statements = match decompile_method(config, class, method) {
            Ok(statements) => statements,
            Err(_) => continue,
        };
        if let Some(lambda) = statements
            .iter()
            .find_map(|s| find_lambda(s, backing_name))
        {
            let captured_locals = capture_locals(lambda, backing.is_static());
            return Ok(ResolvedLambda {
                enclosing_method: name.to_string(),
                lambda: lambda.clone(),
                captured_locals,
            });
        }
    }

    Err(DecompileError::format(format!(
        "no method encloses lambda backing method '{}'",
        backing_name
    )))
}

/// Decompiles a lambda backing method with its capture slots named after
/// the captured expressions.
pub fn decompile_backing_method(
    config: &DecompilerConfig,
    class: &ClassFile,
    backing_name: &str,
) -> Result<Vec<Node>, DecompileError> {
    let resolved = resolve_backing_method(config, class, backing_name)?;
    let backing = class.find_method(backing_name).ok_or_else(|| {
        DecompileError::format(format!("backing method '{}' not found", backing_name))
    })?;
    let code = backing.code().ok_or_else(|| {
        DecompileError::format(format!("backing method '{}' has no code", backing_name))
    })?;
    let mut locals = LocalVariables::from_code(code, &class.const_pool)?;
    locals.merge_front(resolved.captured_locals);
    decompile_code(config, class, code, backing.is_static(), locals)
}

fn find_lambda<'a>(node: &'a Node, backing_name: &str) -> Option<&'a Node> {
    if let NodeKind::Lambda { backing_method, .. } = &node.kind {
        if backing_method == backing_name {
            return Some(node);
        }
    }
    node.children()
        .into_iter()
        .find_map(|child| find_lambda(child, backing_name))
}

/// Synthesizes unbounded variable entries for the capture slots of a
/// backing method. Captures fill the leading parameter slots in capture
/// order; an instance backing method keeps slot 0 for `this`, which the
/// engine already names.
pub fn capture_locals(lambda: &Node, backing_is_static: bool) -> Vec<LocalVariableEntry> {
    let captures = match &lambda.kind {
        NodeKind::Lambda { captures, .. } => captures,
        _ => return Vec::new(),
    };
    let mut slot: u16 = if backing_is_static { 0 } else { 1 };
    let mut entries = Vec::with_capacity(captures.len());
    for (i, capture) in captures.iter().enumerate() {
        let name = match &capture.kind {
            NodeKind::VarRef(variable) => variable
                .name
                .clone()
                .unwrap_or_else(|| format!("arg{}", i)),
            NodeKind::FieldRef { name, .. } => name.clone(),
            _ => format!("arg{}", i),
        };
        entries.push(LocalVariableEntry::unbounded(
            name,
            capture.ty.clone(),
            slot,
        ));
        slot += if capture.ty.is_wide() { 2 } else { 1 };
    }
    entries
}
