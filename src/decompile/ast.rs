use std::hash::{Hash, Hasher};

use super::descriptor::JvmType;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add, Sub, Mul, Div, Rem,
    Shl, Shr, Ushr,
    And, Or, Xor,
}

impl BinaryOp {
    /// Java source token for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
        }
    }
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq, Ne, Lt, Ge, Gt, Le,
}

impl CompareOp {
    /// The negated comparison.
    pub fn negate(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Ge => CompareOp::Lt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Le => CompareOp::Gt,
        }
    }

    /// Java source token for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
        }
    }
}

/// Method invocation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Literal constant values. Floats compare and hash by bit pattern so nodes
/// can live in hash-based collections.
#[derive(Clone, Debug)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Class(String),
    Null,
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Long(a), Literal::Long(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Double(a), Literal::Double(b)) => a.to_bits() == b.to_bits(),
            (Literal::Str(a), Literal::Str(b)) => a == b,
            (Literal::Class(a), Literal::Class(b)) => a == b,
            (Literal::Null, Literal::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Int(v) => v.hash(state),
            Literal::Long(v) => v.hash(state),
            Literal::Float(v) => v.to_bits().hash(state),
            Literal::Double(v) => v.to_bits().hash(state),
            Literal::Str(v) => v.hash(state),
            Literal::Class(v) => v.hash(state),
            Literal::Null => {}
        }
    }
}

/// Local variable reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    pub slot: u16,
    pub name: Option<String>,
    pub ty: JvmType,
}

/// Where a node came from in the original method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    pub pc: u32,
    pub line: Option<u16>,
}

/// One node of the decompiled tree: what it computes, the type of the value
/// it produces (void for statements) and, once stamped, its origin.
///
/// Equality and hashing are structural over kind and type; origin metadata is
/// excluded so trees compare by shape.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: JvmType,
    pub origin: Option<Origin>,
}

impl Node {
    pub fn new(kind: NodeKind, ty: JvmType) -> Self {
        Self {
            kind,
            ty,
            origin: None,
        }
    }

    pub fn kind_id(&self) -> NodeKindId {
        self.kind.kind_id()
    }

    /// True for nodes that can stand alone as statements.
    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::MethodCall { .. }
                | NodeKind::NewInstance { .. }
                | NodeKind::FieldAssign { .. }
                | NodeKind::VarAssign { .. }
                | NodeKind::ArrayStore { .. }
                | NodeKind::Increment { .. }
                | NodeKind::Return
                | NodeKind::ReturnValue(_)
        )
    }

    /// True if discarding this value would lose an effect.
    pub fn has_side_effects(&self) -> bool {
        match &self.kind {
            NodeKind::MethodCall { .. } | NodeKind::NewInstance { .. } => true,
            NodeKind::Binary { left, right, .. } => {
                left.has_side_effects() || right.has_side_effects()
            }
            NodeKind::Unary { operand, .. } | NodeKind::Cast { operand } => {
                operand.has_side_effects()
            }
            NodeKind::ArrayLoad { array, index } => {
                array.has_side_effects() || index.has_side_effects()
            }
            _ => false,
        }
    }

    /// Direct child nodes, for tree traversal.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Constant(_)
            | NodeKind::VarRef(_)
            | NodeKind::Increment { .. }
            | NodeKind::Goto { .. }
            | NodeKind::Return
            | NodeKind::UninitNew { .. } => Vec::new(),
            NodeKind::Unary { operand, .. } | NodeKind::Cast { operand } => vec![operand],
            NodeKind::Binary { left, right, .. }
            | NodeKind::Compare { left, right, .. }
            | NodeKind::Branch { left, right, .. }
            | NodeKind::Cmp { left, right } => vec![left, right],
            NodeKind::MethodCall { target, args, .. } => {
                let mut children: Vec<&Node> = target.iter().map(|t| t.as_ref()).collect();
                children.extend(args.iter());
                children
            }
            NodeKind::FieldRef { target, .. } => target.iter().map(|t| t.as_ref()).collect(),
            NodeKind::FieldAssign { target, value, .. } => {
                let mut children: Vec<&Node> = target.iter().map(|t| t.as_ref()).collect();
                children.push(value);
                children
            }
            NodeKind::VarAssign { value, .. } => vec![value],
            NodeKind::NewInstance { args, .. } => args.iter().collect(),
            NodeKind::NewArray {
                length, elements, ..
            } => {
                let mut children = vec![length.as_ref()];
                if let Some(elements) = elements {
                    children.extend(elements.iter());
                }
                children
            }
            NodeKind::ArrayLoad { array, index } => vec![array, index],
            NodeKind::ArrayStore {
                array,
                index,
                value,
            } => vec![array, index, value],
            NodeKind::Lambda { captures, .. } => captures.iter().collect(),
            NodeKind::ReturnValue(value) | NodeKind::Dup(value) => vec![value],
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.ty == other.ty
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.ty.hash(state);
    }
}

/// The closed set of node kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // --- Values ---
    Constant(Literal),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Compare {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    VarRef(LocalVariable),
    FieldRef {
        target: Option<Box<Node>>,
        owner: String,
        name: String,
    },
    Cast {
        operand: Box<Node>,
    },
    ArrayLoad {
        array: Box<Node>,
        index: Box<Node>,
    },
    NewArray {
        element_type: JvmType,
        length: Box<Node>,
        /// Filled in when a literal element-store run follows the allocation.
        elements: Option<Vec<Node>>,
    },
    Lambda {
        functional_interface: String,
        backing_method: String,
        descriptor: String,
        captures: Vec<Node>,
    },

    // --- Calls and creation ---
    MethodCall {
        kind: InvokeKind,
        target: Option<Box<Node>>,
        owner: String,
        name: String,
        descriptor: String,
        args: Vec<Node>,
    },
    NewInstance {
        class_name: String,
        descriptor: String,
        args: Vec<Node>,
    },

    // --- Statements ---
    FieldAssign {
        target: Option<Box<Node>>,
        owner: String,
        name: String,
        value: Box<Node>,
    },
    VarAssign {
        variable: LocalVariable,
        value: Box<Node>,
    },
    Increment {
        variable: LocalVariable,
        delta: i16,
    },
    ArrayStore {
        array: Box<Node>,
        index: Box<Node>,
        value: Box<Node>,
    },
    Return,
    ReturnValue(Box<Node>),

    // --- Control transfer (statement position, pre-collapse) ---
    Branch {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
        /// Absolute code offset of the branch target.
        target: u32,
    },
    Goto {
        target: u32,
    },

    // --- Stack bookkeeping (never escapes a successful decompilation) ---
    Dup(Box<Node>),
    UninitNew {
        class_name: String,
    },
    Cmp {
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl NodeKind {
    pub fn kind_id(&self) -> NodeKindId {
        match self {
            NodeKind::Constant(_) => NodeKindId::Constant,
            NodeKind::Unary { .. } => NodeKindId::Unary,
            NodeKind::Binary { .. } => NodeKindId::Binary,
            NodeKind::Compare { .. } => NodeKindId::Compare,
            NodeKind::VarRef(_) => NodeKindId::VarRef,
            NodeKind::FieldRef { .. } => NodeKindId::FieldRef,
            NodeKind::Cast { .. } => NodeKindId::Cast,
            NodeKind::ArrayLoad { .. } => NodeKindId::ArrayLoad,
            NodeKind::NewArray { .. } => NodeKindId::NewArray,
            NodeKind::Lambda { .. } => NodeKindId::Lambda,
            NodeKind::MethodCall { .. } => NodeKindId::MethodCall,
            NodeKind::NewInstance { .. } => NodeKindId::NewInstance,
            NodeKind::FieldAssign { .. } => NodeKindId::FieldAssign,
            NodeKind::VarAssign { .. } => NodeKindId::VarAssign,
            NodeKind::Increment { .. } => NodeKindId::Increment,
            NodeKind::ArrayStore { .. } => NodeKindId::ArrayStore,
            NodeKind::Return => NodeKindId::Return,
            NodeKind::ReturnValue(_) => NodeKindId::ReturnValue,
            NodeKind::Branch { .. } => NodeKindId::Branch,
            NodeKind::Goto { .. } => NodeKindId::Goto,
            NodeKind::Dup(_) => NodeKindId::Dup,
            NodeKind::UninitNew { .. } => NodeKindId::UninitNew,
            NodeKind::Cmp { .. } => NodeKindId::Cmp,
        }
    }
}

/// Discriminant-only view of [`NodeKind`], the key of the generator's
/// delegate table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKindId {
    Constant,
    Unary,
    Binary,
    Compare,
    VarRef,
    FieldRef,
    Cast,
    ArrayLoad,
    NewArray,
    Lambda,
    MethodCall,
    NewInstance,
    FieldAssign,
    VarAssign,
    Increment,
    ArrayStore,
    Return,
    ReturnValue,
    Branch,
    Goto,
    Dup,
    UninitNew,
    Cmp,
}

impl NodeKindId {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKindId::Constant => "Constant",
            NodeKindId::Unary => "Unary",
            NodeKindId::Binary => "Binary",
            NodeKindId::Compare => "Compare",
            NodeKindId::VarRef => "VarRef",
            NodeKindId::FieldRef => "FieldRef",
            NodeKindId::Cast => "Cast",
            NodeKindId::ArrayLoad => "ArrayLoad",
            NodeKindId::NewArray => "NewArray",
            NodeKindId::Lambda => "Lambda",
            NodeKindId::MethodCall => "MethodCall",
            NodeKindId::NewInstance => "NewInstance",
            NodeKindId::FieldAssign => "FieldAssign",
            NodeKindId::VarAssign => "VarAssign",
            NodeKindId::Increment => "Increment",
            NodeKindId::ArrayStore => "ArrayStore",
            NodeKindId::Return => "Return",
            NodeKindId::ReturnValue => "ReturnValue",
            NodeKindId::Branch => "Branch",
            NodeKindId::Goto => "Goto",
            NodeKindId::Dup => "Dup",
            NodeKindId::UninitNew => "UninitNew",
            NodeKindId::Cmp => "Cmp",
        }
    }
}
