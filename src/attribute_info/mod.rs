pub mod parser;
mod types;

pub use types::*;

use crate::constant_info::ConstantPool;
use crate::error::DecompileError;

/// Resolves the payloads of known attributes into [`AttributeInfoVariant`]s.
/// Attribute names live in the constant pool, so this runs as a post-parse
/// pass once the pool is available. Unknown attributes keep their raw bytes.
pub fn resolve_attribute_list(
    attributes: &mut [AttributeInfo],
    pool: &ConstantPool,
) -> Result<(), DecompileError> {
    for attribute in attributes {
        let name = pool.utf8(attribute.attribute_name_index)?;
        let parsed = match name {
            "Code" => {
                let (_, mut code) = parser::code_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                resolve_attribute_list(&mut code.attributes, pool)?;
                Some(AttributeInfoVariant::Code(code))
            }
            "LineNumberTable" => {
                let (_, table) = parser::line_number_table_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::LineNumberTable(table))
            }
            "LocalVariableTable" => {
                let (_, table) = parser::local_variable_table_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::LocalVariableTable(table))
            }
            "BootstrapMethods" => {
                let (_, methods) = parser::bootstrap_methods_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::BootstrapMethods(methods))
            }
            "SourceFile" => {
                let (_, source) = parser::sourcefile_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::SourceFile(source))
            }
            "ConstantValue" => {
                let (_, value) = parser::constant_value_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::ConstantValue(value))
            }
            "Exceptions" => {
                let (_, exceptions) = parser::exceptions_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::Exceptions(exceptions))
            }
            "Signature" => {
                let (_, signature) = parser::signature_attribute_parser(&attribute.info)
                    .map_err(|_| malformed(name))?;
                Some(AttributeInfoVariant::Signature(signature))
            }
            "Synthetic" => Some(AttributeInfoVariant::Synthetic(SyntheticAttribute {})),
            _ => None,
        };
        attribute.info_parsed = parsed;
    }
    Ok(())
}

fn malformed(name: &str) -> DecompileError {
    DecompileError::format(format!("malformed {} attribute", name))
}
