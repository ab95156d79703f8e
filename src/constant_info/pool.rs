use binrw::{BinRead, BinResult};

use crate::error::DecompileError;

use super::types::*;

/// The class constant pool. Indices are 1-based; the slot following a Long
/// or Double entry is a shadow slot and can never be read.
#[derive(Clone, Debug, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantInfo>,
}

/// A fully resolved field/method/interface-method reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Reads `count - 1` pool slots, dispatching on the tag byte of each entry.
///
/// Long and Double entries occupy two slots; the second is materialized as
/// `ConstantInfo::Unusable` so slot indices stay aligned with the class file.
#[binrw::parser(reader, endian)]
pub fn constant_pool_parser(count: u16) -> BinResult<ConstantPool> {
    let mut entries = Vec::with_capacity(count.saturating_sub(1) as usize);
    let mut i: u32 = 1;
    while i < count as u32 {
        let tag = u8::read_options(reader, endian, ())?;
        let entry = match tag {
            1 => {
                let length = u16::read_options(reader, endian, ())?;
                let mut bytes = vec![0u8; length as usize];
                reader.read_exact(&mut bytes)?;
                let utf8_string = String::from_utf8(bytes).map_err(|e| binrw::Error::AssertFail {
                    pos: reader.stream_position().unwrap_or(0),
                    message: format!("invalid Utf8 constant: {}", e),
                })?;
                ConstantInfo::Utf8(Utf8Constant { utf8_string })
            }
            3 => ConstantInfo::Integer(IntegerConstant::read_options(reader, endian, ())?),
            4 => ConstantInfo::Float(FloatConstant::read_options(reader, endian, ())?),
            5 => ConstantInfo::Long(LongConstant::read_options(reader, endian, ())?),
            6 => ConstantInfo::Double(DoubleConstant::read_options(reader, endian, ())?),
            7 => ConstantInfo::Class(ClassConstant::read_options(reader, endian, ())?),
            8 => ConstantInfo::String(StringConstant::read_options(reader, endian, ())?),
            9 => ConstantInfo::FieldRef(FieldRefConstant::read_options(reader, endian, ())?),
            10 => ConstantInfo::MethodRef(MethodRefConstant::read_options(reader, endian, ())?),
            11 => ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant::read_options(
                reader,
                endian,
                (),
            )?),
            12 => ConstantInfo::NameAndType(NameAndTypeConstant::read_options(reader, endian, ())?),
            15 => ConstantInfo::MethodHandle(MethodHandleConstant::read_options(reader, endian, ())?),
            16 => ConstantInfo::MethodType(MethodTypeConstant::read_options(reader, endian, ())?),
            17 => ConstantInfo::Dynamic(DynamicConstant::read_options(reader, endian, ())?),
            18 => ConstantInfo::InvokeDynamic(InvokeDynamicConstant::read_options(
                reader,
                endian,
                (),
            )?),
            other => {
                return Err(binrw::Error::AssertFail {
                    pos: reader.stream_position().unwrap_or(0),
                    message: format!("unknown constant pool tag {} at slot {}", other, i),
                });
            }
        };
        let wide = matches!(entry, ConstantInfo::Long(_) | ConstantInfo::Double(_));
        entries.push(entry);
        if wide {
            entries.push(ConstantInfo::Unusable);
            i += 2;
        } else {
            i += 1;
        }
    }
    Ok(ConstantPool { entries })
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Number of occupied slots (shadow slots included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry and returns its 1-based index. A Long or Double
    /// entry also reserves its shadow slot.
    pub fn push(&mut self, entry: ConstantInfo) -> u16 {
        let index = (self.entries.len() + 1) as u16;
        let wide = matches!(entry, ConstantInfo::Long(_) | ConstantInfo::Double(_));
        self.entries.push(entry);
        if wide {
            self.entries.push(ConstantInfo::Unusable);
        }
        index
    }

    /// Fetches the entry at a 1-based index. Index 0, indices past the end
    /// and shadow slots are malformed references in the class file itself.
    pub fn get_entry(&self, index: u16) -> Result<&ConstantInfo, DecompileError> {
        if index == 0 || index as usize > self.entries.len() {
            return Err(DecompileError::format(format!(
                "constant pool index {} out of range (pool has {} slots)",
                index,
                self.entries.len()
            )));
        }
        let entry = &self.entries[index as usize - 1];
        if let ConstantInfo::Unusable = entry {
            return Err(DecompileError::format(format!(
                "constant pool index {} is the shadow slot of a wide constant",
                index
            )));
        }
        Ok(entry)
    }

    pub fn utf8(&self, index: u16) -> Result<&str, DecompileError> {
        match self.get_entry(index)? {
            ConstantInfo::Utf8(c) => Ok(&c.utf8_string),
            other => Err(self.wrong_kind(index, "Utf8", other)),
        }
    }

    /// Resolves a Class entry to its internal binary name, e.g. `java/lang/String`.
    pub fn class_name(&self, index: u16) -> Result<&str, DecompileError> {
        match self.get_entry(index)? {
            ConstantInfo::Class(c) => self.utf8(c.name_index),
            other => Err(self.wrong_kind(index, "Class", other)),
        }
    }

    /// Resolves a NameAndType entry to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), DecompileError> {
        match self.get_entry(index)? {
            ConstantInfo::NameAndType(c) => {
                Ok((self.utf8(c.name_index)?, self.utf8(c.descriptor_index)?))
            }
            other => Err(self.wrong_kind(index, "NameAndType", other)),
        }
    }

    /// Resolves a FieldRef/MethodRef/InterfaceMethodRef entry through its
    /// Class and NameAndType links.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>, DecompileError> {
        let (class_index, nat_index) = match self.get_entry(index)? {
            ConstantInfo::FieldRef(c) => (c.class_index, c.name_and_type_index),
            ConstantInfo::MethodRef(c) => (c.class_index, c.name_and_type_index),
            ConstantInfo::InterfaceMethodRef(c) => (c.class_index, c.name_and_type_index),
            other => return Err(self.wrong_kind(index, "FieldRef/MethodRef", other)),
        };
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef { owner, name, descriptor })
    }

    pub fn method_handle(&self, index: u16) -> Result<&MethodHandleConstant, DecompileError> {
        match self.get_entry(index)? {
            ConstantInfo::MethodHandle(c) => Ok(c),
            other => Err(self.wrong_kind(index, "MethodHandle", other)),
        }
    }

    pub fn invoke_dynamic(&self, index: u16) -> Result<&InvokeDynamicConstant, DecompileError> {
        match self.get_entry(index)? {
            ConstantInfo::InvokeDynamic(c) => Ok(c),
            other => Err(self.wrong_kind(index, "InvokeDynamic", other)),
        }
    }

    /// Fetches a loadable entry (ldc family operand).
    pub fn literal(&self, index: u16) -> Result<&ConstantInfo, DecompileError> {
        match self.get_entry(index)? {
            entry @ (ConstantInfo::Integer(_)
            | ConstantInfo::Float(_)
            | ConstantInfo::Long(_)
            | ConstantInfo::Double(_)
            | ConstantInfo::String(_)
            | ConstantInfo::Class(_)) => Ok(entry),
            other => Err(self.wrong_kind(index, "loadable constant", other)),
        }
    }

    fn wrong_kind(&self, index: u16, wanted: &str, got: &ConstantInfo) -> DecompileError {
        DecompileError::argument(format!(
            "constant pool index {} holds a {} entry, not {}",
            index,
            got.kind_name(),
            wanted
        ))
    }
}
