use binrw::binread;

/// A raw attribute as it appears in the class file. The payload is kept as
/// bytes at read time; [`crate::attribute_info::resolve_attribute_list`] fills in
/// `info_parsed` for the attribute kinds the decompiler understands.
#[derive(Clone, Debug)]
#[binread]
#[br(big)]
pub struct AttributeInfo {
    pub attribute_name_index: u16,
    pub attribute_length: u32,
    #[br(count = attribute_length)]
    pub info: Vec<u8>,
    #[br(ignore)]
    pub info_parsed: Option<AttributeInfoVariant>,
}

#[derive(Clone, Debug)]
pub enum AttributeInfoVariant {
    Code(CodeAttribute),
    LineNumberTable(LineNumberTableAttribute),
    LocalVariableTable(LocalVariableTableAttribute),
    BootstrapMethods(BootstrapMethodsAttribute),
    SourceFile(SourceFileAttribute),
    ConstantValue(ConstantValueAttribute),
    Exceptions(ExceptionsAttribute),
    Signature(SignatureAttribute),
    Synthetic(SyntheticAttribute),
}

#[derive(Clone, Debug)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Clone, Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_length: u32,
    pub code: Vec<u8>,
    pub exception_table_length: u16,
    pub exception_table: Vec<ExceptionEntry>,
    pub attributes_count: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn line_number_table(&self) -> Option<&LineNumberTableAttribute> {
        self.attributes.iter().find_map(|a| match &a.info_parsed {
            Some(AttributeInfoVariant::LineNumberTable(t)) => Some(t),
            _ => None,
        })
    }

    pub fn local_variable_table(&self) -> Option<&LocalVariableTableAttribute> {
        self.attributes.iter().find_map(|a| match &a.info_parsed {
            Some(AttributeInfoVariant::LocalVariableTable(t)) => Some(t),
            _ => None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct LineNumberTableAttribute {
    pub line_number_table_length: u16,
    pub entries: Vec<LineNumberTableEntry>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineNumberTableEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

impl LineNumberTableAttribute {
    /// Source line for a program counter: the entry with the greatest
    /// `start_pc` not exceeding `pc`.
    pub fn line_for_pc(&self, pc: u16) -> Option<u16> {
        self.entries
            .iter()
            .filter(|e| e.start_pc <= pc)
            .max_by_key(|e| e.start_pc)
            .map(|e| e.line_number)
    }

    /// Inclusive range of source lines covered by this table.
    pub fn line_range(&self) -> Option<(u16, u16)> {
        let min = self.entries.iter().map(|e| e.line_number).min()?;
        let max = self.entries.iter().map(|e| e.line_number).max()?;
        Some((min, max))
    }
}

#[derive(Clone, Debug)]
pub struct LocalVariableTableAttribute {
    pub local_variable_table_length: u16,
    pub items: Vec<LocalVariableTableItem>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LocalVariableTableItem {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Clone, Debug)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub num_bootstrap_arguments: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Clone, Debug)]
pub struct BootstrapMethodsAttribute {
    pub num_bootstrap_methods: u16,
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SourceFileAttribute {
    pub sourcefile_index: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConstantValueAttribute {
    pub constant_value_index: u16,
}

#[derive(Clone, Debug)]
pub struct ExceptionsAttribute {
    pub exception_table_length: u16,
    pub exception_table: Vec<u16>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SignatureAttribute {
    pub signature_index: u16,
}

// "Synthetic" is a zero-sized marker attribute.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SyntheticAttribute {}
