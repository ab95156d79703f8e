#![allow(dead_code)]

//! Shared builders for in-memory class files and raw class file bytes.

use callsite_decompiler::attribute_info::{
    AttributeInfo, AttributeInfoVariant, BootstrapMethod, BootstrapMethodsAttribute,
    CodeAttribute, LineNumberTableAttribute, LineNumberTableEntry, LocalVariableTableAttribute,
    LocalVariableTableItem,
};
use callsite_decompiler::constant_info::{
    ClassConstant, ConstantInfo, ConstantPool, FieldRefConstant, IntegerConstant,
    InvokeDynamicConstant, LongConstant, MethodHandleConstant, MethodRefConstant,
    NameAndTypeConstant, StringConstant, Utf8Constant,
};
use callsite_decompiler::method_info::{MethodAccessFlags, MethodInfo};
use callsite_decompiler::types::{ClassAccessFlags, ClassFile};

// ---- constant pool builders ----

pub fn utf8(pool: &mut ConstantPool, s: &str) -> u16 {
    pool.push(ConstantInfo::Utf8(Utf8Constant {
        utf8_string: s.to_string(),
    }))
}

pub fn int_entry(pool: &mut ConstantPool, value: i32) -> u16 {
    pool.push(ConstantInfo::Integer(IntegerConstant { value }))
}

pub fn long_entry(pool: &mut ConstantPool, value: i64) -> u16 {
    pool.push(ConstantInfo::Long(LongConstant { value }))
}

pub fn class_entry(pool: &mut ConstantPool, name: &str) -> u16 {
    let name_index = utf8(pool, name);
    pool.push(ConstantInfo::Class(ClassConstant { name_index }))
}

pub fn string_entry(pool: &mut ConstantPool, s: &str) -> u16 {
    let string_index = utf8(pool, s);
    pool.push(ConstantInfo::String(StringConstant { string_index }))
}

pub fn name_and_type(pool: &mut ConstantPool, name: &str, descriptor: &str) -> u16 {
    let name_index = utf8(pool, name);
    let descriptor_index = utf8(pool, descriptor);
    pool.push(ConstantInfo::NameAndType(NameAndTypeConstant {
        name_index,
        descriptor_index,
    }))
}

pub fn field_ref(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str) -> u16 {
    let class_index = class_entry(pool, owner);
    let name_and_type_index = name_and_type(pool, name, descriptor);
    pool.push(ConstantInfo::FieldRef(FieldRefConstant {
        class_index,
        name_and_type_index,
    }))
}

pub fn method_ref(pool: &mut ConstantPool, owner: &str, name: &str, descriptor: &str) -> u16 {
    let class_index = class_entry(pool, owner);
    let name_and_type_index = name_and_type(pool, name, descriptor);
    pool.push(ConstantInfo::MethodRef(MethodRefConstant {
        class_index,
        name_and_type_index,
    }))
}

pub fn method_handle(pool: &mut ConstantPool, kind: u8, reference_index: u16) -> u16 {
    pool.push(ConstantInfo::MethodHandle(MethodHandleConstant {
        reference_kind: kind,
        reference_index,
    }))
}

pub fn invoke_dynamic(pool: &mut ConstantPool, bootstrap_index: u16, nat_index: u16) -> u16 {
    pool.push(ConstantInfo::InvokeDynamic(InvokeDynamicConstant {
        bootstrap_method_attr_index: bootstrap_index,
        name_and_type_index: nat_index,
    }))
}

// ---- attribute builders ----

/// Wraps an already-parsed attribute variant; nothing in the decompiler
/// re-reads the raw name or payload once `info_parsed` is set.
pub fn attr(variant: AttributeInfoVariant) -> AttributeInfo {
    AttributeInfo {
        attribute_name_index: 0,
        attribute_length: 0,
        info: Vec::new(),
        info_parsed: Some(variant),
    }
}

pub fn line_table(entries: &[(u16, u16)]) -> AttributeInfo {
    attr(AttributeInfoVariant::LineNumberTable(
        LineNumberTableAttribute {
            line_number_table_length: entries.len() as u16,
            entries: entries
                .iter()
                .map(|&(start_pc, line_number)| LineNumberTableEntry {
                    start_pc,
                    line_number,
                })
                .collect(),
        },
    ))
}

/// Items are `(start_pc, length, name, descriptor, slot)`.
pub fn local_var_table(
    pool: &mut ConstantPool,
    items: &[(u16, u16, &str, &str, u16)],
) -> AttributeInfo {
    let items = items
        .iter()
        .map(|&(start_pc, length, name, descriptor, index)| LocalVariableTableItem {
            start_pc,
            length,
            name_index: utf8(pool, name),
            descriptor_index: utf8(pool, descriptor),
            index,
        })
        .collect::<Vec<_>>();
    attr(AttributeInfoVariant::LocalVariableTable(
        LocalVariableTableAttribute {
            local_variable_table_length: items.len() as u16,
            items,
        },
    ))
}

pub fn bootstrap_methods(methods: Vec<BootstrapMethod>) -> AttributeInfo {
    attr(AttributeInfoVariant::BootstrapMethods(
        BootstrapMethodsAttribute {
            num_bootstrap_methods: methods.len() as u16,
            bootstrap_methods: methods,
        },
    ))
}

pub fn code(code: Vec<u8>, attributes: Vec<AttributeInfo>) -> AttributeInfo {
    attr(AttributeInfoVariant::Code(CodeAttribute {
        max_stack: 8,
        max_locals: 8,
        code_length: code.len() as u32,
        code,
        exception_table_length: 0,
        exception_table: Vec::new(),
        attributes_count: attributes.len() as u16,
        attributes,
    }))
}

// ---- class and method builders ----

pub fn method(
    pool: &mut ConstantPool,
    name: &str,
    descriptor: &str,
    flags: MethodAccessFlags,
    code_attr: AttributeInfo,
) -> MethodInfo {
    MethodInfo {
        access_flags: flags,
        name_index: utf8(pool, name),
        descriptor_index: utf8(pool, descriptor),
        attributes_count: 1,
        attributes: vec![code_attr],
    }
}

pub fn class_file(
    mut pool: ConstantPool,
    this_class_name: &str,
    methods: Vec<MethodInfo>,
    attributes: Vec<AttributeInfo>,
) -> ClassFile {
    let this_class = class_entry(&mut pool, this_class_name);
    ClassFile {
        minor_version: 0,
        major_version: 52,
        const_pool_size: pool.len() as u16 + 1,
        const_pool: pool,
        access_flags: ClassAccessFlags::PUBLIC,
        this_class,
        super_class: 0,
        interfaces_count: 0,
        interfaces: Vec::new(),
        fields_count: 0,
        fields: Vec::new(),
        methods_count: methods.len() as u16,
        methods,
        attributes_count: attributes.len() as u16,
        attributes,
    }
}

// ---- raw class file bytes ----

/// Big-endian byte assembly for tests that exercise the binary reader.
#[derive(Default)]
pub struct ByteWriter {
    pub bytes: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn utf8_entry(&mut self, s: &str) -> &mut Self {
        self.u8(1);
        self.u16(s.len() as u16);
        self.raw(s.as_bytes())
    }

    pub fn class_entry(&mut self, name_index: u16) -> &mut Self {
        self.u8(7);
        self.u16(name_index)
    }
}
