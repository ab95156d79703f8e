//! JVM type descriptor and method descriptor parsing.

/// A JVM type decoded from a descriptor string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    Short,
    Boolean,
    Void,
    Reference(String),
    Array(Box<JvmType>),
    /// Type of the `null` literal; assignable to any reference type.
    Null,
}

impl JvmType {
    /// True if this type occupies two slots on the JVM stack and in the
    /// local variable table.
    pub fn is_wide(&self) -> bool {
        matches!(self, JvmType::Long | JvmType::Double)
    }

    /// The simple (unqualified) name for display.
    pub fn simple_name(&self) -> String {
        match self {
            JvmType::Int => "int".into(),
            JvmType::Long => "long".into(),
            JvmType::Float => "float".into(),
            JvmType::Double => "double".into(),
            JvmType::Byte => "byte".into(),
            JvmType::Char => "char".into(),
            JvmType::Short => "short".into(),
            JvmType::Boolean => "boolean".into(),
            JvmType::Void => "void".into(),
            JvmType::Reference(name) => simple_class_name(name).to_string(),
            JvmType::Array(inner) => format!("{}[]", inner.simple_name()),
            JvmType::Null => "null".into(),
        }
    }
}

/// Parses a single type descriptor starting at byte `pos` of `desc`.
/// Returns the type and the position just past it.
pub fn parse_type_at(desc: &str, pos: usize) -> Option<(JvmType, usize)> {
    let bytes = desc.as_bytes();
    if pos >= bytes.len() {
        return None;
    }
    match bytes[pos] {
        b'B' => Some((JvmType::Byte, pos + 1)),
        b'C' => Some((JvmType::Char, pos + 1)),
        b'D' => Some((JvmType::Double, pos + 1)),
        b'F' => Some((JvmType::Float, pos + 1)),
        b'I' => Some((JvmType::Int, pos + 1)),
        b'J' => Some((JvmType::Long, pos + 1)),
        b'S' => Some((JvmType::Short, pos + 1)),
        b'Z' => Some((JvmType::Boolean, pos + 1)),
        b'V' => Some((JvmType::Void, pos + 1)),
        b'L' => {
            let semi = desc[pos + 1..].find(';')?;
            let class_name = &desc[pos + 1..pos + 1 + semi];
            Some((JvmType::Reference(class_name.to_string()), pos + 1 + semi + 1))
        }
        b'[' => {
            let (inner, next) = parse_type_at(desc, pos + 1)?;
            Some((JvmType::Array(Box::new(inner)), next))
        }
        _ => None,
    }
}

/// Parses a full type descriptor string.
pub fn parse_type_descriptor(desc: &str) -> Option<JvmType> {
    let (ty, _) = parse_type_at(desc, 0)?;
    Some(ty)
}

/// Parses a method descriptor, e.g. `(II)V` -> `([Int, Int], Void)`.
pub fn parse_method_descriptor(desc: &str) -> Option<(Vec<JvmType>, JvmType)> {
    if !desc.starts_with('(') {
        return None;
    }
    let close = desc.find(')')?;
    let mut params = Vec::new();
    let mut pos = 1;
    while pos < close {
        let (ty, next) = parse_type_at(desc, pos)?;
        params.push(ty);
        pos = next;
    }
    let (ret, _) = parse_type_at(desc, close + 1)?;
    Some((params, ret))
}

/// Converts an internal class name to a source name.
pub fn internal_to_source_name(name: &str) -> String {
    name.replace('/', ".")
}

/// Just the simple class name from an internal name.
pub fn simple_class_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Element type for a `newarray` type code.
pub fn newarray_type(atype: u8) -> Option<JvmType> {
    match atype {
        4 => Some(JvmType::Boolean),
        5 => Some(JvmType::Char),
        6 => Some(JvmType::Float),
        7 => Some(JvmType::Double),
        8 => Some(JvmType::Byte),
        9 => Some(JvmType::Short),
        10 => Some(JvmType::Int),
        11 => Some(JvmType::Long),
        _ => None,
    }
}
