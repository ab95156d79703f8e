//! Decompiles single statements from [Java class files](https://docs.oracle.com/javase/specs/jvms/se10/html/jvms-4.html).
//!
//! The crate reads one method's raw instruction stream, reconstructs a typed
//! expression/statement tree via stack-based symbolic execution, and
//! regenerates readable source-like text. Its purpose is descriptive failure
//! reporting: given the declaring type, method name and line of a failing
//! check, [`decompile_call_site`] produces the source form of the exact
//! statement behind it.
//!
//! No control-flow reconstruction is attempted; input that needs it (loops,
//! switches, exception handling) fails with a [`DecompileError::Format`]
//! rather than producing a partial result.

pub mod attribute_info;
pub mod constant_info;
pub mod decompile;
pub mod error;
pub mod field_info;
pub mod method_info;
pub mod types;

use std::io::Cursor;

use binrw::BinRead;

pub use error::{DecompileError, GenerateError};
pub use types::*;

use decompile::engine::DecompilerConfig;
use decompile::generate::{Generator, GeneratorConfig};

/// Parses a class file from raw bytes and resolves known attribute payloads.
pub fn parse_class_bytes(bytes: &[u8]) -> Result<ClassFile, DecompileError> {
    let mut cursor = Cursor::new(bytes);
    let mut class = ClassFile::read(&mut cursor)
        .map_err(|e| DecompileError::format(format!("malformed class file: {}", e)))?;
    let pool = &class.const_pool;
    for field in &mut class.fields {
        attribute_info::resolve_attribute_list(&mut field.attributes, pool)?;
    }
    for method in &mut class.methods {
        attribute_info::resolve_attribute_list(&mut method.attributes, pool)?;
    }
    attribute_info::resolve_attribute_list(&mut class.attributes, pool)?;
    Ok(class)
}

/// Source of class bytes for a call site. The lookup key mirrors what a
/// failure report knows: the declaring type, the enclosing method and the
/// source line of the failing statement.
pub trait CallSiteResolver {
    fn resolve(
        &self,
        declaring_type: &str,
        method_name: &str,
        line: u16,
    ) -> Result<Vec<u8>, DecompileError>;
}

/// Decompiles the statement at `line` of `declaring_type::method_name` and
/// renders it as source text.
pub fn decompile_call_site(
    resolver: &dyn CallSiteResolver,
    declaring_type: &str,
    method_name: &str,
    line: u16,
) -> Result<String, DecompileError> {
    let bytes = resolver.resolve(declaring_type, method_name, line)?;
    let class = parse_class_bytes(&bytes)?;
    let method = class.find_method(method_name).ok_or_else(|| {
        DecompileError::format(format!(
            "method '{}' not found in {}",
            method_name, declaring_type
        ))
    })?;

    let config = DecompilerConfig::standard();
    let statements = decompile::engine::decompile_method(&config, &class, method)?;
    let statement = statements
        .iter()
        .find(|s| s.origin.as_ref().and_then(|o| o.line) == Some(line))
        .ok_or_else(|| {
            DecompileError::format(format!(
                "no statement at line {} of {}::{}",
                line, declaring_type, method_name
            ))
        })?;

    let generator_config = GeneratorConfig::standard();
    let generator = Generator::new(&generator_config);
    generator
        .generate(statement)
        .map_err(|e| DecompileError::format(e.to_string()))
}
