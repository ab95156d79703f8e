mod common;

use callsite_decompiler::constant_info::{ConstantInfo, ConstantPool};
use callsite_decompiler::error::DecompileError;
use callsite_decompiler::parse_class_bytes;

use common::ByteWriter;

// ---- in-memory pool semantics ----

#[test]
fn indices_are_one_based() {
    let mut pool = ConstantPool::new();
    let idx = common::utf8(&mut pool, "hello");
    assert_eq!(idx, 1);
    assert_eq!(pool.utf8(1).unwrap(), "hello");
    assert!(matches!(pool.get_entry(0), Err(DecompileError::Format(_))));
}

#[test]
fn out_of_range_index_is_a_format_error() {
    let mut pool = ConstantPool::new();
    common::utf8(&mut pool, "only");
    assert!(matches!(pool.get_entry(9), Err(DecompileError::Format(_))));
}

#[test]
fn wide_constants_reserve_a_shadow_slot() {
    let mut pool = ConstantPool::new();
    let long_idx = common::long_entry(&mut pool, 42);
    let next_idx = common::utf8(&mut pool, "after");
    assert_eq!(long_idx, 1);
    assert_eq!(next_idx, 3);
    assert!(matches!(pool.get_entry(long_idx), Ok(ConstantInfo::Long(c)) if c.value == 42));
    assert!(matches!(
        pool.get_entry(long_idx + 1),
        Err(DecompileError::Format(_))
    ));
    assert_eq!(pool.utf8(next_idx).unwrap(), "after");
}

#[test]
fn wrong_kind_is_an_argument_error() {
    let mut pool = ConstantPool::new();
    let idx = common::utf8(&mut pool, "not a class");
    assert!(matches!(
        pool.class_name(idx),
        Err(DecompileError::Argument(_))
    ));
}

#[test]
fn member_ref_resolves_owner_name_and_descriptor() {
    let mut pool = ConstantPool::new();
    let idx = common::field_ref(&mut pool, "demo/Holder", "count", "I");
    let member = pool.member_ref(idx).unwrap();
    assert_eq!(member.owner, "demo/Holder");
    assert_eq!(member.name, "count");
    assert_eq!(member.descriptor, "I");
}

#[test]
fn literal_rejects_non_loadable_entries() {
    let mut pool = ConstantPool::new();
    let nat = common::name_and_type(&mut pool, "x", "I");
    assert!(matches!(pool.literal(nat), Err(DecompileError::Argument(_))));
    let int = common::int_entry(&mut pool, 7);
    assert!(matches!(
        pool.literal(int),
        Ok(ConstantInfo::Integer(c)) if c.value == 7
    ));
}

// ---- binary reading ----

fn minimal_class_bytes() -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.raw(&[0xca, 0xfe, 0xba, 0xbe]);
    w.u16(0); // minor
    w.u16(52); // major
    w.u16(3); // constant pool count (two entries)
    w.utf8_entry("demo/Empty"); // #1
    w.class_entry(1); // #2
    w.u16(0x0021); // access flags
    w.u16(2); // this_class
    w.u16(0); // super_class
    w.u16(0); // interfaces
    w.u16(0); // fields
    w.u16(0); // methods
    w.u16(0); // class attributes
    w.bytes
}

#[test]
fn parses_a_minimal_class() {
    let class = parse_class_bytes(&minimal_class_bytes()).unwrap();
    assert_eq!(class.major_version, 52);
    assert_eq!(class.this_class_name().unwrap(), "demo/Empty");
    assert!(class.methods.is_empty());
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = minimal_class_bytes();
    bytes[0] = 0x00;
    assert!(matches!(
        parse_class_bytes(&bytes),
        Err(DecompileError::Format(_))
    ));
}

#[test]
fn rejects_unknown_constant_tag() {
    let mut w = ByteWriter::new();
    w.raw(&[0xca, 0xfe, 0xba, 0xbe]);
    w.u16(0);
    w.u16(52);
    w.u16(2);
    w.u8(99); // no such tag
    assert!(matches!(
        parse_class_bytes(&w.bytes),
        Err(DecompileError::Format(_))
    ));
}

#[test]
fn rejects_truncated_input() {
    let mut bytes = minimal_class_bytes();
    bytes.truncate(10);
    assert!(matches!(
        parse_class_bytes(&bytes),
        Err(DecompileError::Format(_))
    ));
}
