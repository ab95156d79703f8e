//! Source text generation from decompiled trees.
//!
//! Rendering is driven by a delegate table keyed on node kind. Several
//! delegates may be registered for one kind; the highest priority whose
//! guard accepts the node wins, ties going to the earliest registration.
//! Around advice wraps the whole rendering of every node, outermost
//! registered first.

use crate::error::GenerateError;

use super::ast::{InvokeKind, Literal, Node, NodeKind, NodeKindId};
use super::descriptor::simple_class_name;

pub type DelegateGuard = fn(&Generator<'_>, &Node) -> bool;
pub type RenderFn = fn(&Generator<'_>, &Node, &mut String) -> Result<(), GenerateError>;
pub type AroundFn = fn(
    &Generator<'_>,
    &Node,
    &mut dyn FnMut(&mut String) -> Result<(), GenerateError>,
    &mut String,
) -> Result<(), GenerateError>;

/// One renderer for one node kind.
pub struct Delegate {
    pub name: &'static str,
    pub kind: NodeKindId,
    pub priority: i32,
    pub guard: DelegateGuard,
    pub render: RenderFn,
}

/// Wraps the rendering of every node; calls `proceed` to run the rest of
/// the chain and the selected delegate.
pub struct Around {
    pub name: &'static str,
    pub wrap: AroundFn,
}

/// Registry of delegates and around advice.
#[derive(Default)]
pub struct GeneratorConfig {
    delegates: Vec<Delegate>,
    arounds: Vec<Around>,
    natural_types: Vec<String>,
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_delegate(&mut self, delegate: Delegate) {
        self.delegates.push(delegate);
    }

    pub fn register_around(&mut self, around: Around) {
        self.arounds.push(around);
    }

    /// Marks an owner class (internal binary name) whose method calls read
    /// as natural language, e.g. fluent assertion APIs.
    pub fn add_natural_type(&mut self, owner: impl Into<String>) {
        self.natural_types.push(owner.into());
    }

    pub fn is_natural_type(&self, owner: &str) -> bool {
        self.natural_types.iter().any(|t| t == owner)
    }

    /// The full standard delegate table. Bookkeeping and control-transfer
    /// kinds get no delegate on purpose; asking to render one is an error.
    pub fn standard() -> Self {
        let mut config = GeneratorConfig::new();
        let base: &[(&'static str, NodeKindId, RenderFn)] = &[
            ("constant", NodeKindId::Constant, render_constant),
            ("unary", NodeKindId::Unary, render_unary),
            ("binary", NodeKindId::Binary, render_binary),
            ("compare", NodeKindId::Compare, render_compare),
            ("var-ref", NodeKindId::VarRef, render_var_ref),
            ("field-ref", NodeKindId::FieldRef, render_field_ref),
            ("cast", NodeKindId::Cast, render_cast),
            ("array-load", NodeKindId::ArrayLoad, render_array_load),
            ("new-array", NodeKindId::NewArray, render_new_array),
            ("lambda", NodeKindId::Lambda, render_lambda),
            ("method-call", NodeKindId::MethodCall, render_method_call),
            ("new-instance", NodeKindId::NewInstance, render_new_instance),
            ("field-assign", NodeKindId::FieldAssign, render_field_assign),
            ("var-assign", NodeKindId::VarAssign, render_var_assign),
            ("increment", NodeKindId::Increment, render_increment),
            ("array-store", NodeKindId::ArrayStore, render_array_store),
            ("return", NodeKindId::Return, render_return),
            ("return-value", NodeKindId::ReturnValue, render_return_value),
        ];
        for &(name, kind, render) in base {
            config.register_delegate(Delegate {
                name,
                kind,
                priority: 0,
                guard: accept_all,
                render,
            });
        }
        config.register_delegate(Delegate {
            name: "varargs",
            kind: NodeKindId::MethodCall,
            priority: 10,
            guard: guard_varargs,
            render: render_varargs_call,
        });
        config.register_delegate(Delegate {
            name: "boxing",
            kind: NodeKindId::MethodCall,
            priority: 20,
            guard: guard_boxing,
            render: render_boxing,
        });
        config.register_delegate(Delegate {
            name: "natural-language",
            kind: NodeKindId::MethodCall,
            priority: 30,
            guard: guard_natural_language,
            render: render_natural_language,
        });
        config
    }
}

/// Renders nodes against a [`GeneratorConfig`].
pub struct Generator<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        self.config
    }

    pub fn generate(&self, node: &Node) -> Result<String, GenerateError> {
        let mut out = String::new();
        self.render(node, &mut out)?;
        Ok(out)
    }

    /// Renders one node, running the around chain and then the selected
    /// delegate.
    pub fn render(&self, node: &Node, out: &mut String) -> Result<(), GenerateError> {
        self.render_chained(&self.config.arounds, node, out)
    }

    fn render_chained(
        &self,
        arounds: &[Around],
        node: &Node,
        out: &mut String,
    ) -> Result<(), GenerateError> {
        match arounds.split_first() {
            Some((first, rest)) => (first.wrap)(
                self,
                node,
                &mut |out| self.render_chained(rest, node, out),
                out,
            ),
            None => self.render_primary(node, out),
        }
    }

    fn render_primary(&self, node: &Node, out: &mut String) -> Result<(), GenerateError> {
        let kind = node.kind_id();
        let mut selected: Option<&Delegate> = None;
        for delegate in &self.config.delegates {
            if delegate.kind != kind || !(delegate.guard)(self, node) {
                continue;
            }
            // Strict comparison keeps the earliest registration on ties.
            if selected.map(|s| delegate.priority > s.priority).unwrap_or(true) {
                selected = Some(delegate);
            }
        }
        let delegate = selected.ok_or(GenerateError::NoDelegate { kind: kind.name() })?;
        (delegate.render)(self, node, out)
    }

    /// Renders a child expression, parenthesized when operator nesting
    /// would otherwise change how it reads.
    fn render_operand(&self, node: &Node, out: &mut String) -> Result<(), GenerateError> {
        let wrap = matches!(
            node.kind,
            NodeKind::Binary { .. } | NodeKind::Compare { .. } | NodeKind::Unary { .. }
        );
        if wrap {
            out.push('(');
        }
        self.render(node, out)?;
        if wrap {
            out.push(')');
        }
        Ok(())
    }

    fn render_args(&self, args: &[Node], out: &mut String) -> Result<(), GenerateError> {
        out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.render(arg, out)?;
        }
        out.push(')');
        Ok(())
    }
}

// ============================================================
// Guards
// ============================================================

fn accept_all(_gen: &Generator<'_>, _node: &Node) -> bool {
    true
}

fn guard_varargs(_gen: &Generator<'_>, node: &Node) -> bool {
    matches!(
        &node.kind,
        NodeKind::MethodCall { args, .. }
            if matches!(
                args.last().map(|a| &a.kind),
                Some(NodeKind::NewArray { elements: Some(_), .. })
            )
    )
}

const BOX_TYPES: [&str; 8] = [
    "java/lang/Boolean",
    "java/lang/Byte",
    "java/lang/Character",
    "java/lang/Double",
    "java/lang/Float",
    "java/lang/Integer",
    "java/lang/Long",
    "java/lang/Short",
];

fn guard_boxing(_gen: &Generator<'_>, node: &Node) -> bool {
    matches!(
        &node.kind,
        NodeKind::MethodCall {
            kind: InvokeKind::Static,
            owner,
            name,
            args,
            ..
        } if name == "valueOf" && args.len() == 1 && BOX_TYPES.contains(&owner.as_str())
    )
}

fn guard_natural_language(gen: &Generator<'_>, node: &Node) -> bool {
    matches!(
        &node.kind,
        NodeKind::MethodCall { owner, target: Some(_), args, .. }
            if gen.config().is_natural_type(owner) && !args.is_empty()
    )
}

// ============================================================
// Base delegates
// ============================================================

fn render_constant(_gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    let literal = match &node.kind {
        NodeKind::Constant(literal) => literal,
        _ => return Err(delegate_mismatch("constant", node)),
    };
    match literal {
        Literal::Int(v) => out.push_str(&v.to_string()),
        Literal::Long(v) => out.push_str(&format!("{}L", v)),
        Literal::Float(v) => out.push_str(&format_float(f64::from(*v), "f")),
        Literal::Double(v) => out.push_str(&format_float(*v, "")),
        Literal::Str(s) => {
            out.push('"');
            out.push_str(&escape_java_string(s));
            out.push('"');
        }
        Literal::Class(name) => {
            out.push_str(simple_class_name(name));
            out.push_str(".class");
        }
        Literal::Null => out.push_str("null"),
    }
    Ok(())
}

fn format_float(value: f64, suffix: &str) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}{}", value, suffix)
    } else {
        format!("{}{}", value, suffix)
    }
}

fn escape_java_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if (c as u32) < 0x20 => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

fn render_unary(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Unary { op, operand } => {
            out.push_str(op.as_str());
            gen.render_operand(operand, out)
        }
        _ => Err(delegate_mismatch("unary", node)),
    }
}

fn render_binary(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Binary { op, left, right } => {
            gen.render_operand(left, out)?;
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            gen.render_operand(right, out)
        }
        _ => Err(delegate_mismatch("binary", node)),
    }
}

fn render_compare(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Compare { op, left, right } => {
            gen.render_operand(left, out)?;
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            gen.render_operand(right, out)
        }
        _ => Err(delegate_mismatch("compare", node)),
    }
}

fn render_var_ref(_gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::VarRef(variable) => {
            match &variable.name {
                Some(name) => out.push_str(name),
                None => out.push_str(&format!("var{}", variable.slot)),
            }
            Ok(())
        }
        _ => Err(delegate_mismatch("var-ref", node)),
    }
}

fn render_field_ref(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::FieldRef { target, owner, name } => {
            match target {
                Some(target) => gen.render_operand(target, out)?,
                None => out.push_str(simple_class_name(owner)),
            }
            out.push('.');
            out.push_str(name);
            Ok(())
        }
        _ => Err(delegate_mismatch("field-ref", node)),
    }
}

fn render_cast(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Cast { operand } => {
            out.push('(');
            out.push_str(&node.ty.simple_name());
            out.push(')');
            gen.render_operand(operand, out)
        }
        _ => Err(delegate_mismatch("cast", node)),
    }
}

fn render_array_load(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::ArrayLoad { array, index } => {
            gen.render_operand(array, out)?;
            out.push('[');
            gen.render(index, out)?;
            out.push(']');
            Ok(())
        }
        _ => Err(delegate_mismatch("array-load", node)),
    }
}

fn render_new_array(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::NewArray {
            element_type,
            length,
            elements,
        } => {
            out.push_str("new ");
            out.push_str(&element_type.simple_name());
            match elements {
                Some(elements) => {
                    out.push_str("[] { ");
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        gen.render(element, out)?;
                    }
                    out.push_str(" }");
                }
                None => {
                    out.push('[');
                    gen.render(length, out)?;
                    out.push(']');
                }
            }
            Ok(())
        }
        _ => Err(delegate_mismatch("new-array", node)),
    }
}

fn render_lambda(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Lambda {
            backing_method,
            captures,
            ..
        } => {
            gen.render_args(captures, out)?;
            out.push_str(" -> ");
            out.push_str(backing_method);
            Ok(())
        }
        _ => Err(delegate_mismatch("lambda", node)),
    }
}

fn render_method_call(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::MethodCall {
            target,
            owner,
            name,
            args,
            ..
        } => {
            match target {
                Some(target) if name == "<init>" => {
                    // super()/this() chains render as a call on the receiver.
                    gen.render_operand(target, out)?;
                    return gen.render_args(args, out);
                }
                Some(target) => {
                    gen.render_operand(target, out)?;
                    out.push('.');
                }
                None => {
                    out.push_str(simple_class_name(owner));
                    out.push('.');
                }
            }
            out.push_str(name);
            gen.render_args(args, out)
        }
        _ => Err(delegate_mismatch("method-call", node)),
    }
}

fn render_new_instance(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::NewInstance { class_name, args, .. } => {
            out.push_str("new ");
            out.push_str(simple_class_name(class_name));
            gen.render_args(args, out)
        }
        _ => Err(delegate_mismatch("new-instance", node)),
    }
}

fn render_field_assign(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::FieldAssign {
            target,
            owner,
            name,
            value,
        } => {
            match target {
                Some(target) => gen.render_operand(target, out)?,
                None => out.push_str(simple_class_name(owner)),
            }
            out.push('.');
            out.push_str(name);
            out.push_str(" = ");
            gen.render(value, out)
        }
        _ => Err(delegate_mismatch("field-assign", node)),
    }
}

fn render_var_assign(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::VarAssign { variable, value } => {
            match &variable.name {
                Some(name) => out.push_str(name),
                None => out.push_str(&format!("var{}", variable.slot)),
            }
            out.push_str(" = ");
            gen.render(value, out)
        }
        _ => Err(delegate_mismatch("var-assign", node)),
    }
}

fn render_increment(_gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Increment { variable, delta } => {
            let name = variable
                .name
                .clone()
                .unwrap_or_else(|| format!("var{}", variable.slot));
            match delta {
                1 => out.push_str(&format!("{}++", name)),
                -1 => out.push_str(&format!("{}--", name)),
                d if *d < 0 => out.push_str(&format!("{} -= {}", name, -d)),
                d => out.push_str(&format!("{} += {}", name, d)),
            }
            Ok(())
        }
        _ => Err(delegate_mismatch("increment", node)),
    }
}

fn render_array_store(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::ArrayStore {
            array,
            index,
            value,
        } => {
            gen.render_operand(array, out)?;
            out.push('[');
            gen.render(index, out)?;
            out.push_str("] = ");
            gen.render(value, out)
        }
        _ => Err(delegate_mismatch("array-store", node)),
    }
}

fn render_return(_gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::Return => {
            out.push_str("return");
            Ok(())
        }
        _ => Err(delegate_mismatch("return", node)),
    }
}

fn render_return_value(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::ReturnValue(value) => {
            out.push_str("return ");
            gen.render(value, out)
        }
        _ => Err(delegate_mismatch("return-value", node)),
    }
}

// ============================================================
// Specialized delegates
// ============================================================

/// Renders a call whose last argument is a literal-filled array with the
/// elements spread inline, the way the varargs call was written.
fn render_varargs_call(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::MethodCall {
            target,
            owner,
            name,
            args,
            ..
        } => {
            match target {
                Some(target) => {
                    gen.render_operand(target, out)?;
                    out.push('.');
                }
                None => {
                    out.push_str(simple_class_name(owner));
                    out.push('.');
                }
            }
            out.push_str(name);
            out.push('(');
            let mut first = true;
            for arg in &args[..args.len() - 1] {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                gen.render(arg, out)?;
            }
            if let Some(Node {
                kind: NodeKind::NewArray {
                    elements: Some(elements),
                    ..
                },
                ..
            }) = args.last()
            {
                for element in elements {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    gen.render(element, out)?;
                }
            }
            out.push(')');
            Ok(())
        }
        _ => Err(delegate_mismatch("varargs", node)),
    }
}

/// Autoboxing is a compiler artifact; `Integer.valueOf(x)` reads as `x`.
fn render_boxing(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::MethodCall { args, .. } if args.len() == 1 => gen.render(&args[0], out),
        _ => Err(delegate_mismatch("boxing", node)),
    }
}

/// Fluent assertion calls read as prose: the camelCase method name is
/// split into words between the receiver and the arguments.
fn render_natural_language(gen: &Generator<'_>, node: &Node, out: &mut String) -> Result<(), GenerateError> {
    match &node.kind {
        NodeKind::MethodCall {
            target: Some(target),
            name,
            args,
            ..
        } => {
            gen.render_operand(target, out)?;
            out.push(' ');
            out.push_str(&split_camel_case(name));
            for (i, arg) in args.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                gen.render(arg, out)?;
            }
            Ok(())
        }
        _ => Err(delegate_mismatch("natural-language", node)),
    }
}

fn split_camel_case(name: &str) -> String {
    let mut words = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            words.push(' ');
            words.push(c.to_ascii_lowercase());
        } else {
            words.push(c);
        }
    }
    words
}

fn delegate_mismatch(delegate: &'static str, node: &Node) -> GenerateError {
    GenerateError::Delegate(format!(
        "delegate '{}' applied to {} node",
        delegate,
        node.kind_id().name()
    ))
}
