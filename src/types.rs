use crate::attribute_info::{AttributeInfo, AttributeInfoVariant, BootstrapMethodsAttribute};
use crate::constant_info::{constant_pool_parser, ConstantPool};
use crate::error::DecompileError;
use crate::field_info::FieldInfo;
use crate::method_info::MethodInfo;

use binrw::binread;
use bitflags::bitflags;

#[derive(Clone, Debug)]
#[binread]
#[br(big, magic = b"\xca\xfe\xba\xbe")]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub const_pool_size: u16,
    #[br(parse_with = constant_pool_parser, args(const_pool_size))]
    pub const_pool: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces_count: u16,
    #[br(count = interfaces_count)]
    pub interfaces: Vec<u16>,
    pub fields_count: u16,
    #[br(count = fields_count)]
    pub fields: Vec<FieldInfo>,
    pub methods_count: u16,
    #[br(count = methods_count)]
    pub methods: Vec<MethodInfo>,
    pub attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Internal binary name of this class, e.g. `com/example/Foo`.
    pub fn this_class_name(&self) -> Result<&str, DecompileError> {
        self.const_pool.class_name(self.this_class)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&str, DecompileError> {
        self.const_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&str, DecompileError> {
        self.const_pool.utf8(method.descriptor_index)
    }

    /// First method with the given name, overloads notwithstanding.
    pub fn find_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| self.method_name(m).map(|n| n == name).unwrap_or(false))
    }

    pub fn bootstrap_methods(&self) -> Option<&BootstrapMethodsAttribute> {
        self.attributes.iter().find_map(|a| match &a.info_parsed {
            Some(AttributeInfoVariant::BootstrapMethods(b)) => Some(b),
            _ => None,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[binread]
pub struct ClassAccessFlags(u16);

bitflags! {
    impl ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;     //	Declared public; may be accessed from outside its package.
        const FINAL = 0x0010;      //	Declared final; no subclasses allowed.
        const SUPER = 0x0020;      //	Treat superclass methods specially when invoked by the invokespecial instruction.
        const INTERFACE = 0x0200;  //	Is an interface, not a class.
        const ABSTRACT = 0x0400;   //	Declared abstract; must not be instantiated.
        const SYNTHETIC = 0x1000;  //	Declared synthetic; not present in the source code.
        const ANNOTATION = 0x2000; //	Declared as an annotation type.
        const ENUM = 0x4000;       //	Declared as an enum type.
        const MODULE = 0x8000;     //	Declared as a module type.
    }
}
