use callsite_decompiler::decompile::ast::{
    BinaryOp, CompareOp, InvokeKind, Literal, LocalVariable, Node, NodeKind, NodeKindId,
};
use callsite_decompiler::decompile::descriptor::JvmType;
use callsite_decompiler::decompile::generate::{
    Around, Delegate, Generator, GeneratorConfig,
};
use callsite_decompiler::error::GenerateError;

fn int_const(v: i32) -> Node {
    Node::new(NodeKind::Constant(Literal::Int(v)), JvmType::Int)
}

fn var(name: &str, slot: u16) -> Node {
    Node::new(
        NodeKind::VarRef(LocalVariable {
            slot,
            name: Some(name.to_string()),
            ty: JvmType::Int,
        }),
        JvmType::Int,
    )
}

fn generate(node: &Node) -> String {
    let config = GeneratorConfig::standard();
    Generator::new(&config).generate(node).unwrap()
}

// ---- literals ----

#[test]
fn renders_literals() {
    assert_eq!(generate(&int_const(42)), "42");
    assert_eq!(
        generate(&Node::new(
            NodeKind::Constant(Literal::Long(7)),
            JvmType::Long
        )),
        "7L"
    );
    assert_eq!(
        generate(&Node::new(
            NodeKind::Constant(Literal::Float(1.5)),
            JvmType::Float
        )),
        "1.5f"
    );
    assert_eq!(
        generate(&Node::new(
            NodeKind::Constant(Literal::Double(2.0)),
            JvmType::Double
        )),
        "2.0"
    );
    assert_eq!(
        generate(&Node::new(NodeKind::Constant(Literal::Null), JvmType::Null)),
        "null"
    );
    assert_eq!(
        generate(&Node::new(
            NodeKind::Constant(Literal::Class("java/lang/String".into())),
            JvmType::Reference("java/lang/Class".into())
        )),
        "String.class"
    );
}

#[test]
fn escapes_string_literals() {
    let node = Node::new(
        NodeKind::Constant(Literal::Str("a\"b\n\tc\\".into())),
        JvmType::Reference("java/lang/String".into()),
    );
    assert_eq!(generate(&node), "\"a\\\"b\\n\\tc\\\\\"");
}

// ---- expressions ----

#[test]
fn nested_binary_operands_are_parenthesized() {
    let inner = Node::new(
        NodeKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(var("a", 0)),
            right: Box::new(var("b", 1)),
        },
        JvmType::Int,
    );
    let outer = Node::new(
        NodeKind::Binary {
            op: BinaryOp::Mul,
            left: Box::new(inner),
            right: Box::new(int_const(2)),
        },
        JvmType::Int,
    );
    assert_eq!(generate(&outer), "(a + b) * 2");
}

#[test]
fn cast_has_no_space_before_the_operand() {
    let node = Node::new(
        NodeKind::Cast {
            operand: Box::new(var("n", 0)),
        },
        JvmType::Byte,
    );
    assert_eq!(generate(&node), "(byte)n");
}

#[test]
fn comparison_renders_its_operator() {
    let node = Node::new(
        NodeKind::Compare {
            op: CompareOp::Ge,
            left: Box::new(var("size", 0)),
            right: Box::new(int_const(10)),
        },
        JvmType::Boolean,
    );
    assert_eq!(generate(&node), "size >= 10");
}

#[test]
fn generation_is_idempotent() {
    let node = Node::new(
        NodeKind::Compare {
            op: CompareOp::Ne,
            left: Box::new(var("x", 0)),
            right: Box::new(int_const(0)),
        },
        JvmType::Boolean,
    );
    let config = GeneratorConfig::standard();
    let generator = Generator::new(&config);
    let first = generator.generate(&node).unwrap();
    let second = generator.generate(&node).unwrap();
    assert_eq!(first, second);
}

// ---- delegate selection ----

#[test]
fn bookkeeping_nodes_have_no_delegate() {
    let node = Node::new(NodeKind::Dup(Box::new(int_const(1))), JvmType::Int);
    let config = GeneratorConfig::standard();
    let err = Generator::new(&config).generate(&node).unwrap_err();
    assert!(matches!(err, GenerateError::NoDelegate { kind: "Dup" }));
}

#[test]
fn higher_priority_delegate_wins() {
    let mut config = GeneratorConfig::standard();
    config.register_delegate(Delegate {
        name: "override",
        kind: NodeKindId::Constant,
        priority: 50,
        guard: |_, _| true,
        render: |_, _, out| {
            out.push('X');
            Ok(())
        },
    });
    let text = Generator::new(&config).generate(&int_const(1)).unwrap();
    assert_eq!(text, "X");
}

#[test]
fn equal_priority_keeps_the_earliest_registration() {
    let mut config = GeneratorConfig::standard();
    config.register_delegate(Delegate {
        name: "first",
        kind: NodeKindId::Constant,
        priority: 50,
        guard: |_, _| true,
        render: |_, _, out| {
            out.push('X');
            Ok(())
        },
    });
    config.register_delegate(Delegate {
        name: "second",
        kind: NodeKindId::Constant,
        priority: 50,
        guard: |_, _| true,
        render: |_, _, out| {
            out.push('Y');
            Ok(())
        },
    });
    let text = Generator::new(&config).generate(&int_const(1)).unwrap();
    assert_eq!(text, "X");
}

#[test]
fn guard_rejection_falls_back_to_the_base_delegate() {
    let mut config = GeneratorConfig::standard();
    config.register_delegate(Delegate {
        name: "never",
        kind: NodeKindId::Constant,
        priority: 50,
        guard: |_, _| false,
        render: |_, _, out| {
            out.push('X');
            Ok(())
        },
    });
    let text = Generator::new(&config).generate(&int_const(3)).unwrap();
    assert_eq!(text, "3");
}

// ---- around advice ----

#[test]
fn around_advice_wraps_every_node() {
    let mut config = GeneratorConfig::standard();
    config.register_around(Around {
        name: "bracket",
        wrap: |_, _, proceed, out| {
            out.push('<');
            proceed(out)?;
            out.push('>');
            Ok(())
        },
    });
    let generator = Generator::new(&config);
    assert_eq!(generator.generate(&int_const(5)).unwrap(), "<5>");

    let sum = Node::new(
        NodeKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(int_const(1)),
            right: Box::new(int_const(2)),
        },
        JvmType::Int,
    );
    assert_eq!(generator.generate(&sum).unwrap(), "<<1> + <2>>");
}

// ---- specialized delegates ----

#[test]
fn boxing_call_renders_as_its_argument() {
    let node = Node::new(
        NodeKind::MethodCall {
            kind: InvokeKind::Static,
            target: None,
            owner: "java/lang/Integer".into(),
            name: "valueOf".into(),
            descriptor: "(I)Ljava/lang/Integer;".into(),
            args: vec![int_const(5)],
        },
        JvmType::Reference("java/lang/Integer".into()),
    );
    assert_eq!(generate(&node), "5");
}

#[test]
fn varargs_array_is_spread_inline() {
    let array = Node::new(
        NodeKind::NewArray {
            element_type: JvmType::Int,
            length: Box::new(int_const(2)),
            elements: Some(vec![int_const(1), int_const(2)]),
        },
        JvmType::Array(Box::new(JvmType::Int)),
    );
    let call = Node::new(
        NodeKind::MethodCall {
            kind: InvokeKind::Static,
            target: None,
            owner: "demo/Log".into(),
            name: "log".into(),
            descriptor: "(Ljava/lang/String;[I)V".into(),
            args: vec![
                Node::new(
                    NodeKind::Constant(Literal::Str("m".into())),
                    JvmType::Reference("java/lang/String".into()),
                ),
                array,
            ],
        },
        JvmType::Void,
    );
    assert_eq!(generate(&call), "Log.log(\"m\", 1, 2)");
}

#[test]
fn natural_language_owner_reads_as_prose() {
    let mut config = GeneratorConfig::standard();
    config.add_natural_type("demo/Expectation");
    let call = Node::new(
        NodeKind::MethodCall {
            kind: InvokeKind::Virtual,
            target: Some(Box::new(var("result", 1))),
            owner: "demo/Expectation".into(),
            name: "shouldBeGreaterThan".into(),
            descriptor: "(I)V".into(),
            args: vec![int_const(10)],
        },
        JvmType::Void,
    );
    let text = Generator::new(&config).generate(&call).unwrap();
    assert_eq!(text, "result should be greater than 10");
}

// ---- statements ----

#[test]
fn renders_statements() {
    let assign = Node::new(
        NodeKind::FieldAssign {
            target: None,
            owner: "demo/Holder".into(),
            name: "count".into(),
            value: Box::new(int_const(1)),
        },
        JvmType::Void,
    );
    assert_eq!(generate(&assign), "Holder.count = 1");

    let decrement = Node::new(
        NodeKind::Increment {
            variable: LocalVariable {
                slot: 0,
                name: Some("i".into()),
                ty: JvmType::Int,
            },
            delta: -1,
        },
        JvmType::Void,
    );
    assert_eq!(generate(&decrement), "i--");

    let store = Node::new(
        NodeKind::ArrayStore {
            array: Box::new(var("xs", 0)),
            index: Box::new(int_const(3)),
            value: Box::new(int_const(9)),
        },
        JvmType::Void,
    );
    assert_eq!(generate(&store), "xs[3] = 9");
}

#[test]
fn lambda_renders_captures_and_backing_name() {
    let node = Node::new(
        NodeKind::Lambda {
            functional_interface: "java/util/function/Supplier".into(),
            backing_method: "lambda$check$0".into(),
            descriptor: "(I)Ljava/util/function/Supplier;".into(),
            captures: vec![var("seed", 0)],
        },
        JvmType::Reference("java/util/function/Supplier".into()),
    );
    assert_eq!(generate(&node), "(seed) -> lambda$check$0");
}
