mod common;

use callsite_decompiler::attribute_info::BootstrapMethod;
use callsite_decompiler::constant_info::ConstantPool;
use callsite_decompiler::decompile::ast::{Literal, LocalVariable, Node, NodeKind};
use callsite_decompiler::decompile::descriptor::JvmType;
use callsite_decompiler::decompile::engine::DecompilerConfig;
use callsite_decompiler::decompile::generate::{Generator, GeneratorConfig};
use callsite_decompiler::decompile::lambda::{
    capture_locals, decompile_backing_method, resolve_backing_method,
};
use callsite_decompiler::decompile::opcodes;
use callsite_decompiler::method_info::MethodAccessFlags;
use callsite_decompiler::types::ClassFile;

fn var_capture(slot: u16, name: &str, ty: JvmType) -> Node {
    Node::new(
        NodeKind::VarRef(LocalVariable {
            slot,
            name: Some(name.to_string()),
            ty: ty.clone(),
        }),
        ty,
    )
}

fn lambda_node(captures: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Lambda {
            functional_interface: "java/lang/Runnable".into(),
            backing_method: "lambda$run$0".into(),
            descriptor: "()Ljava/lang/Runnable;".into(),
            captures,
        },
        JvmType::Reference("java/lang/Runnable".into()),
    )
}

// ---- capture slot synthesis ----

#[test]
fn captures_fill_leading_slots_of_a_static_backing_method() {
    let lambda = lambda_node(vec![
        var_capture(1, "a", JvmType::Int),
        var_capture(2, "b", JvmType::Long),
        Node::new(NodeKind::Constant(Literal::Int(9)), JvmType::Int),
    ]);
    let entries = capture_locals(&lambda, true);
    assert_eq!(entries.len(), 3);
    assert_eq!((entries[0].slot, entries[0].name.as_str()), (0, "a"));
    // The long capture is wide, so the slot after it skips one.
    assert_eq!((entries[1].slot, entries[1].name.as_str()), (1, "b"));
    assert_eq!((entries[2].slot, entries[2].name.as_str()), (3, "arg2"));
    assert!(entries.iter().all(|e| e.covers(0) && e.covers(60_000)));
}

#[test]
fn instance_backing_method_keeps_slot_zero_for_this() {
    let lambda = lambda_node(vec![
        var_capture(1, "a", JvmType::Int),
        var_capture(2, "b", JvmType::Long),
    ]);
    let entries = capture_locals(&lambda, false);
    assert_eq!(entries[0].slot, 1);
    assert_eq!(entries[1].slot, 2);
}

// ---- backing method resolution ----

/// A class with a static method `run` holding an `invokedynamic` lambda
/// site, plus the synthetic backing method the metafactory points at.
fn lambda_class() -> ClassFile {
    let mut pool = ConstantPool::new();
    let factory_ref = common::method_ref(
        &mut pool,
        "java/lang/invoke/LambdaMetafactory",
        "metafactory",
        "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
    );
    let factory_handle = common::method_handle(&mut pool, 6, factory_ref);
    let impl_ref = common::method_ref(&mut pool, "demo/Caller", "lambda$run$0", "()V");
    let impl_handle = common::method_handle(&mut pool, 6, impl_ref);
    let nat = common::name_and_type(&mut pool, "run", "()Ljava/lang/Runnable;");
    let indy = common::invoke_dynamic(&mut pool, 0, nat);

    let run_code = common::code(
        vec![
            opcodes::INVOKEDYNAMIC,
            (indy >> 8) as u8,
            indy as u8,
            0,
            0,
            opcodes::ASTORE_0,
            opcodes::RETURN,
        ],
        vec![common::line_table(&[(0, 20), (5, 22)])],
    );
    let run = common::method(
        &mut pool,
        "run",
        "()V",
        MethodAccessFlags::STATIC,
        run_code,
    );

    // A decoy whose line range cannot contain the backing method's lines.
    let decoy_code = common::code(
        vec![opcodes::RETURN],
        vec![common::line_table(&[(0, 5)])],
    );
    let decoy = common::method(
        &mut pool,
        "setUp",
        "()V",
        MethodAccessFlags::STATIC,
        decoy_code,
    );

    let backing_code = common::code(
        vec![opcodes::RETURN],
        vec![common::line_table(&[(0, 21)])],
    );
    let backing = common::method(
        &mut pool,
        "lambda$run$0",
        "()V",
        MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC,
        backing_code,
    );

    let bootstrap = common::bootstrap_methods(vec![BootstrapMethod {
        bootstrap_method_ref: factory_handle,
        num_bootstrap_arguments: 3,
        bootstrap_arguments: vec![0, impl_handle, 0],
    }]);
    common::class_file(pool, "demo/Caller", vec![decoy, run, backing], vec![bootstrap])
}

/// Two call sites reference the same backing method, which carries no
/// LineNumberTable. A table-less backing method can only live inside another
/// synthetic backing method, so the plain method must not be its encloser.
fn nested_lambda_class() -> ClassFile {
    let mut pool = ConstantPool::new();
    let factory_ref = common::method_ref(
        &mut pool,
        "java/lang/invoke/LambdaMetafactory",
        "metafactory",
        "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
    );
    let factory_handle = common::method_handle(&mut pool, 6, factory_ref);
    let impl_ref = common::method_ref(&mut pool, "demo/Caller", "lambda$run$1", "()V");
    let impl_handle = common::method_handle(&mut pool, 6, impl_ref);
    let nat = common::name_and_type(&mut pool, "run", "()Ljava/lang/Runnable;");
    let indy = common::invoke_dynamic(&mut pool, 0, nat);

    let site_code = vec![
        opcodes::INVOKEDYNAMIC,
        (indy >> 8) as u8,
        indy as u8,
        0,
        0,
        opcodes::ASTORE_0,
        opcodes::RETURN,
    ];
    let plain = common::method(
        &mut pool,
        "run",
        "()V",
        MethodAccessFlags::STATIC,
        common::code(site_code.clone(), vec![]),
    );
    let outer = common::method(
        &mut pool,
        "lambda$run$0",
        "()V",
        MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC,
        common::code(site_code, vec![]),
    );
    let backing = common::method(
        &mut pool,
        "lambda$run$1",
        "()V",
        MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC,
        common::code(vec![opcodes::RETURN], vec![]),
    );

    let bootstrap = common::bootstrap_methods(vec![BootstrapMethod {
        bootstrap_method_ref: factory_handle,
        num_bootstrap_arguments: 3,
        bootstrap_arguments: vec![0, impl_handle, 0],
    }]);
    common::class_file(
        pool,
        "demo/Caller",
        vec![plain, outer, backing],
        vec![bootstrap],
    )
}

#[test]
fn backing_without_line_table_resolves_among_synthetic_methods() {
    let class = nested_lambda_class();
    let config = DecompilerConfig::standard();
    let resolved = resolve_backing_method(&config, &class, "lambda$run$1").unwrap();
    assert_eq!(resolved.enclosing_method, "lambda$run$0");
}

#[test]
fn resolves_the_enclosing_method_by_line_containment() {
    let class = lambda_class();
    let config = DecompilerConfig::standard();
    let resolved = resolve_backing_method(&config, &class, "lambda$run$0").unwrap();
    assert_eq!(resolved.enclosing_method, "run");
    assert!(resolved.captured_locals.is_empty());
    assert!(matches!(
        &resolved.lambda.kind,
        NodeKind::Lambda { backing_method, functional_interface, .. }
            if backing_method == "lambda$run$0"
                && functional_interface == "java/lang/Runnable"
    ));
}

#[test]
fn decompiles_the_backing_body() {
    let class = lambda_class();
    let config = DecompilerConfig::standard();
    let statements = decompile_backing_method(&config, &class, "lambda$run$0").unwrap();
    assert_eq!(statements.len(), 1);
    assert!(matches!(statements[0].kind, NodeKind::Return));
}

#[test]
fn unknown_backing_method_is_an_error() {
    let class = lambda_class();
    let config = DecompilerConfig::standard();
    let err = resolve_backing_method(&config, &class, "lambda$gone$9").unwrap_err();
    assert!(err.to_string().contains("lambda$gone$9"));
}

#[test]
fn resolved_lambda_renders_as_an_arrow_expression() {
    let class = lambda_class();
    let config = DecompilerConfig::standard();
    let resolved = resolve_backing_method(&config, &class, "lambda$run$0").unwrap();
    let generated = GeneratorConfig::standard();
    let text = Generator::new(&generated).generate(&resolved.lambda).unwrap();
    assert_eq!(text, "() -> lambda$run$0");
}
