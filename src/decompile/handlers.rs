//! The standard opcode extensions and enhancements, and the composition root
//! that registers them.

use log::trace;

use crate::constant_info::ConstantInfo;
use crate::error::DecompileError;

use super::ast::*;
use super::context::DecompilationContext;
use super::descriptor::{
    newarray_type, parse_method_descriptor, parse_type_descriptor, JvmType,
};
use super::engine::{
    decompile_method, DecompilerConfig, Engine, Enhancement, EnhancementKind, Extension,
    OpcodeMatch, Stage,
};
use super::opcodes::*;

impl DecompilerConfig {
    /// The full standard configuration. Specialized pattern extensions are
    /// registered ahead of the generic handlers for the same opcodes; the
    /// engine picks the first registered extension whose guard passes.
    pub fn standard() -> Self {
        let mut config = DecompilerConfig::new();

        // Pattern extensions first.
        config.register_extension(Extension {
            name: "boolean-materialize",
            opcodes: vec![OpcodeMatch::One(ICONST_0), OpcodeMatch::One(ICONST_1)],
            guard: top_is_branch,
            run: handle_boolean_materialize,
        });
        config.register_extension(Extension {
            name: "array-literal-fill",
            opcodes: vec![OpcodeMatch::Range(IASTORE, SASTORE)],
            guard: array_fill_pending,
            run: handle_array_literal_fill,
        });
        config.register_extension(Extension {
            name: "unsupported-construct",
            opcodes: vec![
                OpcodeMatch::One(ATHROW),
                OpcodeMatch::One(INSTANCEOF),
                OpcodeMatch::One(MONITORENTER),
                OpcodeMatch::One(MONITOREXIT),
                OpcodeMatch::One(TABLESWITCH),
                OpcodeMatch::One(LOOKUPSWITCH),
                OpcodeMatch::One(JSR),
                OpcodeMatch::One(JSR_W),
                OpcodeMatch::One(RET),
                OpcodeMatch::One(MULTIANEWARRAY),
            ],
            guard: always,
            run: handle_unsupported,
        });

        // Generic handlers.
        config.register_extension(Extension {
            name: "constants",
            opcodes: vec![OpcodeMatch::Range(NOP, LDC2_W)],
            guard: always,
            run: handle_constants,
        });
        config.register_extension(Extension {
            name: "loads",
            opcodes: vec![OpcodeMatch::Range(ILOAD, ALOAD_3)],
            guard: always,
            run: handle_loads,
        });
        config.register_extension(Extension {
            name: "array-loads",
            opcodes: vec![OpcodeMatch::Range(IALOAD, SALOAD)],
            guard: always,
            run: handle_array_loads,
        });
        config.register_extension(Extension {
            name: "stores",
            opcodes: vec![OpcodeMatch::Range(ISTORE, ASTORE_3)],
            guard: always,
            run: handle_stores,
        });
        config.register_extension(Extension {
            name: "array-stores",
            opcodes: vec![OpcodeMatch::Range(IASTORE, SASTORE)],
            guard: always,
            run: handle_array_stores,
        });
        config.register_extension(Extension {
            name: "stack-ops",
            opcodes: vec![OpcodeMatch::Range(POP, SWAP)],
            guard: always,
            run: handle_stack_ops,
        });
        config.register_extension(Extension {
            name: "arithmetic",
            opcodes: vec![OpcodeMatch::Range(IADD, LXOR)],
            guard: always,
            run: handle_arithmetic,
        });
        config.register_extension(Extension {
            name: "iinc",
            opcodes: vec![OpcodeMatch::One(IINC)],
            guard: always,
            run: handle_iinc,
        });
        config.register_extension(Extension {
            name: "conversions",
            opcodes: vec![OpcodeMatch::Range(I2L, I2S)],
            guard: always,
            run: handle_conversions,
        });
        config.register_extension(Extension {
            name: "cmp-fold",
            opcodes: vec![OpcodeMatch::Range(LCMP, DCMPG)],
            guard: always,
            run: handle_cmp,
        });
        config.register_extension(Extension {
            name: "branches",
            opcodes: vec![
                OpcodeMatch::Range(IFEQ, IF_ACMPNE),
                OpcodeMatch::One(IFNULL),
                OpcodeMatch::One(IFNONNULL),
            ],
            guard: always,
            run: handle_branches,
        });
        config.register_extension(Extension {
            name: "goto",
            opcodes: vec![OpcodeMatch::One(GOTO), OpcodeMatch::One(GOTO_W)],
            guard: always,
            run: handle_goto,
        });
        config.register_extension(Extension {
            name: "returns",
            opcodes: vec![OpcodeMatch::Range(IRETURN, RETURN)],
            guard: always,
            run: handle_returns,
        });
        config.register_extension(Extension {
            name: "field-access",
            opcodes: vec![OpcodeMatch::Range(GETSTATIC, PUTFIELD)],
            guard: always,
            run: handle_field_access,
        });
        config.register_extension(Extension {
            name: "invoke",
            opcodes: vec![OpcodeMatch::Range(INVOKEVIRTUAL, INVOKEINTERFACE)],
            guard: always,
            run: handle_invoke,
        });
        config.register_extension(Extension {
            name: "invokedynamic",
            opcodes: vec![OpcodeMatch::One(INVOKEDYNAMIC)],
            guard: always,
            run: handle_invokedynamic,
        });
        config.register_extension(Extension {
            name: "allocation",
            opcodes: vec![
                OpcodeMatch::One(NEW),
                OpcodeMatch::One(NEWARRAY),
                OpcodeMatch::One(ANEWARRAY),
                OpcodeMatch::One(ARRAYLENGTH),
                OpcodeMatch::One(CHECKCAST),
            ],
            guard: always,
            run: handle_allocation,
        });
        config.register_extension(Extension {
            name: "wide",
            opcodes: vec![OpcodeMatch::One(WIDE)],
            guard: always,
            run: handle_wide,
        });

        // Enhancements.
        config.register_enhancement(Enhancement {
            name: "trace-opcode",
            opcodes: vec![OpcodeMatch::Range(NOP, JSR_W)],
            kind: EnhancementKind::Advisory {
                stage: Stage::Before,
                priority: -10,
            },
            run: enhance_trace_opcode,
        });
        config.register_enhancement(Enhancement {
            name: "origin-stamp",
            opcodes: vec![OpcodeMatch::Range(NOP, JSR_W)],
            kind: EnhancementKind::Advisory {
                stage: Stage::After,
                priority: 0,
            },
            run: enhance_origin_stamp,
        });
        config.register_enhancement(Enhancement {
            name: "unbox-compare",
            opcodes: vec![OpcodeMatch::Range(IF_ICMPEQ, IF_ACMPNE)],
            kind: EnhancementKind::Corrective,
            run: enhance_unbox_compare,
        });
        config.register_enhancement(Enhancement {
            name: "inline-accessor",
            opcodes: vec![OpcodeMatch::One(INVOKESTATIC)],
            kind: EnhancementKind::Corrective,
            run: enhance_inline_accessor,
        });

        config
    }
}

// ============================================================
// Guards
// ============================================================

fn always(_ctx: &DecompilationContext) -> bool {
    true
}

fn top_is_branch(ctx: &DecompilationContext) -> bool {
    matches!(ctx.top(), Some(node) if matches!(node.kind, NodeKind::Branch { .. }))
}

/// Stack shape left by javac when filling a literal array:
/// `[..., NewArray, Dup(NewArray), index constant, value]`, where the index
/// constant equals the number of elements recorded so far.
fn array_fill_pending(ctx: &DecompilationContext) -> bool {
    let stack = ctx.stack();
    let n = stack.len();
    if n < 4 {
        return false;
    }
    let filled = match &stack[n - 4].kind {
        NodeKind::NewArray { elements, .. } => elements.as_ref().map(|e| e.len()).unwrap_or(0),
        _ => return false,
    };
    if !matches!(stack[n - 3].kind, NodeKind::Dup(_)) {
        return false;
    }
    matches!(stack[n - 2].kind, NodeKind::Constant(Literal::Int(i)) if i as usize == filled)
}

// ============================================================
// Pattern extensions
// ============================================================

/// Collapses the boolean materialization diamond
/// `if_xx L; iconst_1; goto E; L: iconst_0; E:` into a Compare node.
///
/// The engine has consumed the first constant and the guard saw a Branch on
/// top of the stack. The goto and the complement constant are consumed via
/// peek/commit; the Branch is converted at the join point by a look-ahead
/// callback, after any other queued work for earlier positions has run.
fn handle_boolean_materialize(
    engine: &mut Engine<'_>,
    opcode: u8,
) -> Result<(), DecompileError> {
    let goto_pc = engine.cursor.pc();
    let branch_target = match engine.ctx.top() {
        Some(Node {
            kind: NodeKind::Branch { target, .. },
            ..
        }) => *target,
        _ => {
            return Err(DecompileError::illegal_state(
                "boolean-materialize guard passed without a Branch on top",
            ))
        }
    };

    // The branch must land exactly on the complement constant behind the
    // goto, or this is not the diamond.
    let is_diamond = matches!(engine.cursor.peek_u8(), Ok(op) if op == GOTO)
        && branch_target == goto_pc + 3;
    if !is_diamond {
        engine.cursor.reset_peek();
        engine
            .ctx
            .abort(format!("conditional branch at pc {}", engine.ctx.pc));
        return Ok(());
    }
    let end_target = goto_pc.wrapping_add(engine.cursor.peek_i16()? as i32 as u32);
    engine.cursor.commit();

    let complement = engine.cursor.next_opcode()?;
    let expected = if opcode == ICONST_1 { ICONST_0 } else { ICONST_1 };
    if complement != expected {
        engine
            .ctx
            .abort(format!("conditional branch at pc {}", engine.ctx.pc));
        return Ok(());
    }

    // Branch taken means the comparison came out false, so when the true
    // constant comes first the materialized operator is the negation of the
    // branch operator.
    let negate = opcode == ICONST_1;
    engine.cursor.look_ahead(
        end_target,
        Box::new(move |ctx: &mut DecompilationContext| {
            let node = ctx.pop()?;
            match node.kind {
                NodeKind::Branch { op, left, right, .. } => {
                    let op = if negate { op.negate() } else { op };
                    ctx.push(Node::new(
                        NodeKind::Compare { op, left, right },
                        JvmType::Boolean,
                    ));
                    Ok(())
                }
                other => Err(DecompileError::illegal_state(format!(
                    "expected Branch at boolean join point, found {}",
                    other.kind_id().name()
                ))),
            }
        }),
    );
    Ok(())
}

/// Folds `dup; <index const>; <value>; xastore` runs into the literal
/// element list of the allocated array.
fn handle_array_literal_fill(
    engine: &mut Engine<'_>,
    _opcode: u8,
) -> Result<(), DecompileError> {
    let value = engine.ctx.pop()?;
    let _index = engine.ctx.pop()?;
    let _dup = engine.ctx.pop()?;
    match engine.ctx.top_mut() {
        Some(Node {
            kind: NodeKind::NewArray { elements, .. },
            ..
        }) => {
            elements.get_or_insert_with(Vec::new).push(value);
            Ok(())
        }
        _ => Err(DecompileError::illegal_state(
            "array-literal-fill guard passed without a NewArray beneath",
        )),
    }
}

fn handle_unsupported(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let what = match opcode {
        ATHROW => "athrow",
        INSTANCEOF => "instanceof",
        MONITORENTER | MONITOREXIT => "monitor instruction",
        TABLESWITCH | LOOKUPSWITCH => "switch instruction",
        JSR | JSR_W | RET => "jsr/ret",
        MULTIANEWARRAY => "multianewarray",
        _ => "instruction",
    };
    engine
        .ctx
        .abort(format!("{} at pc {}", what, engine.ctx.pc));
    Ok(())
}

// ============================================================
// Constants
// ============================================================

fn handle_constants(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let class = engine.class;
    let node = match opcode {
        NOP => return Ok(()),
        ACONST_NULL => Node::new(NodeKind::Constant(Literal::Null), JvmType::Null),
        ICONST_M1..=ICONST_5 => Node::new(
            NodeKind::Constant(Literal::Int(opcode as i32 - ICONST_0 as i32)),
            JvmType::Int,
        ),
        LCONST_0 | LCONST_1 => Node::new(
            NodeKind::Constant(Literal::Long((opcode - LCONST_0) as i64)),
            JvmType::Long,
        ),
        FCONST_0..=FCONST_2 => Node::new(
            NodeKind::Constant(Literal::Float((opcode - FCONST_0) as f32)),
            JvmType::Float,
        ),
        DCONST_0 | DCONST_1 => Node::new(
            NodeKind::Constant(Literal::Double((opcode - DCONST_0) as f64)),
            JvmType::Double,
        ),
        BIPUSH => {
            let value = engine.cursor.next_i8()? as i32;
            Node::new(NodeKind::Constant(Literal::Int(value)), JvmType::Int)
        }
        SIPUSH => {
            let value = engine.cursor.next_i16()? as i32;
            Node::new(NodeKind::Constant(Literal::Int(value)), JvmType::Int)
        }
        LDC | LDC_W | LDC2_W => {
            let index = if opcode == LDC {
                engine.cursor.next_u8()? as u16
            } else {
                engine.cursor.next_u16()?
            };
            loadable_constant(class, index)?
        }
        other => {
            return Err(DecompileError::illegal_state(format!(
                "constants handler dispatched for opcode 0x{:02x}",
                other
            )))
        }
    };
    engine.ctx.push(node);
    Ok(())
}

fn loadable_constant(class: &crate::types::ClassFile, index: u16) -> Result<Node, DecompileError> {
    let pool = &class.const_pool;
    let node = match pool.literal(index)? {
        ConstantInfo::Integer(c) => {
            Node::new(NodeKind::Constant(Literal::Int(c.value)), JvmType::Int)
        }
        ConstantInfo::Float(c) => {
            Node::new(NodeKind::Constant(Literal::Float(c.value)), JvmType::Float)
        }
        ConstantInfo::Long(c) => {
            Node::new(NodeKind::Constant(Literal::Long(c.value)), JvmType::Long)
        }
        ConstantInfo::Double(c) => Node::new(
            NodeKind::Constant(Literal::Double(c.value)),
            JvmType::Double,
        ),
        ConstantInfo::String(c) => Node::new(
            NodeKind::Constant(Literal::Str(pool.utf8(c.string_index)?.to_string())),
            JvmType::Reference("java/lang/String".into()),
        ),
        ConstantInfo::Class(c) => Node::new(
            NodeKind::Constant(Literal::Class(pool.utf8(c.name_index)?.to_string())),
            JvmType::Reference("java/lang/Class".into()),
        ),
        other => {
            return Err(DecompileError::format(format!(
                "constant pool entry {} ({}) is not loadable",
                index,
                other.kind_name()
            )))
        }
    };
    Ok(node)
}

// ============================================================
// Loads and stores
// ============================================================

fn load_kind_type(kind: u8) -> JvmType {
    match kind {
        0 => JvmType::Int,
        1 => JvmType::Long,
        2 => JvmType::Float,
        3 => JvmType::Double,
        _ => JvmType::Reference("java/lang/Object".into()),
    }
}

fn handle_loads(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let (slot, kind) = if opcode <= ALOAD {
        let slot = engine.cursor.next_u8()? as u16;
        (slot, opcode - ILOAD)
    } else {
        let index = opcode - ILOAD_0;
        ((index % 4) as u16, index / 4)
    };
    push_local_load(engine, slot, load_kind_type(kind));
    Ok(())
}

fn push_local_load(engine: &mut Engine<'_>, slot: u16, fallback: JvmType) {
    let node = local_ref(engine, slot, fallback);
    engine.ctx.push(node);
}

fn local_ref(engine: &Engine<'_>, slot: u16, fallback: JvmType) -> Node {
    if slot == 0 && !engine.is_static {
        let this_type = engine
            .class
            .this_class_name()
            .map(|n| JvmType::Reference(n.to_string()))
            .unwrap_or(fallback.clone());
        return Node::new(
            NodeKind::VarRef(LocalVariable {
                slot: 0,
                name: Some("this".into()),
                ty: this_type.clone(),
            }),
            this_type,
        );
    }
    let entry = engine.locals.lookup(slot, engine.ctx.pc);
    let (name, ty) = match entry {
        Some(e) => (Some(e.name.clone()), e.ty.clone()),
        None => (None, fallback),
    };
    Node::new(
        NodeKind::VarRef(LocalVariable {
            slot,
            name,
            ty: ty.clone(),
        }),
        ty,
    )
}

fn handle_stores(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let (slot, kind) = if opcode <= ASTORE {
        let slot = engine.cursor.next_u8()? as u16;
        (slot, opcode - ISTORE)
    } else {
        let index = opcode - ISTORE_0;
        ((index % 4) as u16, index / 4)
    };
    store_local(engine, slot, load_kind_type(kind))
}

fn store_local(engine: &mut Engine<'_>, slot: u16, fallback: JvmType) -> Result<(), DecompileError> {
    let value = engine.ctx.pop()?;
    let entry = engine.locals.lookup(slot, engine.ctx.pc);
    let (name, ty) = match entry {
        Some(e) => (Some(e.name.clone()), e.ty.clone()),
        None => (None, fallback),
    };
    let variable = LocalVariable { slot, name, ty };
    engine.ctx.push(Node::new(
        NodeKind::VarAssign {
            variable,
            value: Box::new(value),
        },
        JvmType::Void,
    ));
    engine.ctx.reduce()?;
    Ok(())
}

fn handle_array_loads(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let element = array_element_type(opcode - IALOAD);
    let index = engine.ctx.pop()?;
    let array = engine.ctx.pop()?;
    engine.ctx.push(Node::new(
        NodeKind::ArrayLoad {
            array: Box::new(array),
            index: Box::new(index),
        },
        element,
    ));
    Ok(())
}

fn handle_array_stores(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let value = engine.ctx.pop()?;
    let index = engine.ctx.pop()?;
    let array = engine.ctx.pop()?;
    engine.ctx.push(Node::new(
        NodeKind::ArrayStore {
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
        },
        JvmType::Void,
    ));
    engine.ctx.reduce()?;
    Ok(())
}

/// Drops a popped value, keeping it as a statement when it has effects.
fn discard(engine: &mut Engine<'_>, value: Node) -> Result<(), DecompileError> {
    if value.has_side_effects() {
        engine.ctx.push(value);
        engine.ctx.reduce()?;
    }
    Ok(())
}

fn array_element_type(kind: u8) -> JvmType {
    match kind {
        0 => JvmType::Int,
        1 => JvmType::Long,
        2 => JvmType::Float,
        3 => JvmType::Double,
        4 => JvmType::Reference("java/lang/Object".into()),
        5 => JvmType::Byte,
        6 => JvmType::Char,
        _ => JvmType::Short,
    }
}

// ============================================================
// Stack manipulation
// ============================================================

fn handle_stack_ops(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    match opcode {
        POP => {
            let value = engine.ctx.pop()?;
            discard(engine, value)?;
        }
        POP2 => {
            // A wide value is one modeled entry; two category-1 values are
            // two. The deeper value was evaluated first, so it reduces first.
            let top = engine.ctx.pop()?;
            if top.ty.is_wide() {
                discard(engine, top)?;
            } else {
                let below = engine.ctx.pop()?;
                discard(engine, below)?;
                discard(engine, top)?;
            }
        }
        DUP => {
            let value = engine.ctx.pop()?;
            let ty = value.ty.clone();
            let dup = Node::new(NodeKind::Dup(Box::new(value.clone())), ty);
            engine.ctx.push(value);
            engine.ctx.push(dup);
        }
        DUP_X1 => {
            let v1 = engine.ctx.pop()?;
            let v2 = engine.ctx.pop()?;
            let ty = v1.ty.clone();
            let dup = Node::new(NodeKind::Dup(Box::new(v1.clone())), ty);
            engine.ctx.push(dup);
            engine.ctx.push(v2);
            engine.ctx.push(v1);
        }
        DUP_X2 => {
            let v1 = engine.ctx.pop()?;
            let v2 = engine.ctx.pop()?;
            let v3 = engine.ctx.pop()?;
            let ty = v1.ty.clone();
            let dup = Node::new(NodeKind::Dup(Box::new(v1.clone())), ty);
            engine.ctx.push(dup);
            engine.ctx.push(v3);
            engine.ctx.push(v2);
            engine.ctx.push(v1);
        }
        DUP2 => {
            // For a wide value the stack models one entry; a second Dup of
            // the top matches both layouts closely enough for expressions.
            let v1 = engine.ctx.pop()?;
            if v1.ty.is_wide() {
                let ty = v1.ty.clone();
                let dup = Node::new(NodeKind::Dup(Box::new(v1.clone())), ty);
                engine.ctx.push(v1);
                engine.ctx.push(dup);
            } else {
                let v2 = engine.ctx.pop()?;
                let dup2 = Node::new(NodeKind::Dup(Box::new(v2.clone())), v2.ty.clone());
                let dup1 = Node::new(NodeKind::Dup(Box::new(v1.clone())), v1.ty.clone());
                engine.ctx.push(v2);
                engine.ctx.push(v1);
                engine.ctx.push(dup2);
                engine.ctx.push(dup1);
            }
        }
        DUP2_X1 | DUP2_X2 => {
            engine
                .ctx
                .abort(format!("dup2_x stack shuffle at pc {}", engine.ctx.pc));
        }
        SWAP => {
            let v1 = engine.ctx.pop()?;
            let v2 = engine.ctx.pop()?;
            engine.ctx.push(v1);
            engine.ctx.push(v2);
        }
        _ => {}
    }
    Ok(())
}

// ============================================================
// Arithmetic, conversions, comparisons
// ============================================================

fn handle_arithmetic(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    if (INEG..=DNEG).contains(&opcode) {
        let operand = engine.ctx.pop()?;
        let ty = operand.ty.clone();
        engine.ctx.push(Node::new(
            NodeKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
            ty,
        ));
        return Ok(());
    }
    let op = match opcode {
        IADD..=DADD => BinaryOp::Add,
        ISUB..=DSUB => BinaryOp::Sub,
        IMUL..=DMUL => BinaryOp::Mul,
        IDIV..=DDIV => BinaryOp::Div,
        IREM..=DREM => BinaryOp::Rem,
        ISHL | LSHL => BinaryOp::Shl,
        ISHR | LSHR => BinaryOp::Shr,
        IUSHR | LUSHR => BinaryOp::Ushr,
        IAND | LAND => BinaryOp::And,
        IOR | LOR => BinaryOp::Or,
        _ => BinaryOp::Xor,
    };
    let right = engine.ctx.pop()?;
    let left = engine.ctx.pop()?;
    let ty = left.ty.clone();
    engine.ctx.push(Node::new(
        NodeKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
    ));
    Ok(())
}

fn handle_iinc(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let slot = engine.cursor.next_u8()? as u16;
    let delta = engine.cursor.next_i8()? as i16;
    emit_increment(engine, slot, delta)
}

fn emit_increment(engine: &mut Engine<'_>, slot: u16, delta: i16) -> Result<(), DecompileError> {
    let entry = engine.locals.lookup(slot, engine.ctx.pc);
    let (name, ty) = match entry {
        Some(e) => (Some(e.name.clone()), e.ty.clone()),
        None => (None, JvmType::Int),
    };
    let variable = LocalVariable { slot, name, ty };
    engine.ctx.push(Node::new(
        NodeKind::Increment { variable, delta },
        JvmType::Void,
    ));
    engine.ctx.reduce()?;
    Ok(())
}

fn conversion_target(opcode: u8) -> JvmType {
    match opcode {
        I2L | F2L | D2L => JvmType::Long,
        I2F | L2F | D2F => JvmType::Float,
        I2D | L2D | F2D => JvmType::Double,
        L2I | F2I | D2I => JvmType::Int,
        I2B => JvmType::Byte,
        I2C => JvmType::Char,
        _ => JvmType::Short,
    }
}

fn handle_conversions(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let operand = engine.ctx.pop()?;
    engine.ctx.push(Node::new(
        NodeKind::Cast {
            operand: Box::new(operand),
        },
        conversion_target(opcode),
    ));
    Ok(())
}

/// lcmp/fcmp/dcmp push a -1/0/1 result that is always consumed by a
/// following if<cond>; the Cmp bookkeeping node carries the operands until
/// the branch folds them into a direct comparison.
fn handle_cmp(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let right = engine.ctx.pop()?;
    let left = engine.ctx.pop()?;
    engine.ctx.push(Node::new(
        NodeKind::Cmp {
            left: Box::new(left),
            right: Box::new(right),
        },
        JvmType::Int,
    ));
    Ok(())
}

// ============================================================
// Branches
// ============================================================

fn branch_op(opcode: u8) -> CompareOp {
    match opcode {
        IFEQ | IF_ICMPEQ | IF_ACMPEQ | IFNULL => CompareOp::Eq,
        IFNE | IF_ICMPNE | IF_ACMPNE | IFNONNULL => CompareOp::Ne,
        IFLT | IF_ICMPLT => CompareOp::Lt,
        IFGE | IF_ICMPGE => CompareOp::Ge,
        IFGT | IF_ICMPGT => CompareOp::Gt,
        _ => CompareOp::Le,
    }
}

fn handle_branches(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let branch_pc = engine.ctx.pc;
    let offset = engine.cursor.next_i16()? as i32;
    let target = branch_pc.wrapping_add(offset as u32);
    let op = branch_op(opcode);

    let (left, right) = match opcode {
        IFEQ..=IFLE => {
            let value = engine.ctx.pop()?;
            // Fold a pending lcmp/fcmp/dcmp into a direct comparison.
            if let NodeKind::Cmp { left, right } = value.kind {
                (*left, *right)
            } else {
                (value, Node::new(NodeKind::Constant(Literal::Int(0)), JvmType::Int))
            }
        }
        IFNULL | IFNONNULL => {
            let value = engine.ctx.pop()?;
            (
                value,
                Node::new(NodeKind::Constant(Literal::Null), JvmType::Null),
            )
        }
        _ => {
            let right = engine.ctx.pop()?;
            let left = engine.ctx.pop()?;
            (left, right)
        }
    };

    engine.ctx.push(Node::new(
        NodeKind::Branch {
            op,
            left: Box::new(left),
            right: Box::new(right),
            target,
        },
        JvmType::Boolean,
    ));
    Ok(())
}

fn handle_goto(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let goto_pc = engine.ctx.pc;
    let offset = if opcode == GOTO {
        engine.cursor.next_i16()? as i32
    } else {
        engine.cursor.next_i32()?
    };
    let target = goto_pc.wrapping_add(offset as u32);
    // A goto surviving to its own handler is unstructured control flow; the
    // statement scan in the flush pass rejects it.
    engine
        .ctx
        .emit(Node::new(NodeKind::Goto { target }, JvmType::Void));
    Ok(())
}

fn handle_returns(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    if opcode == RETURN {
        engine.ctx.push(Node::new(NodeKind::Return, JvmType::Void));
    } else {
        let value = engine.ctx.pop()?;
        engine
            .ctx
            .push(Node::new(NodeKind::ReturnValue(Box::new(value)), JvmType::Void));
    }
    engine.ctx.reduce()?;
    Ok(())
}

// ============================================================
// Field access
// ============================================================

fn handle_field_access(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let class = engine.class;
    let index = engine.cursor.next_u16()?;
    let member = class.const_pool.member_ref(index)?;
    let owner = member.owner.to_string();
    let name = member.name.to_string();
    let field_type = parse_type_descriptor(member.descriptor).ok_or_else(|| {
        DecompileError::format(format!(
            "malformed field descriptor '{}'",
            member.descriptor
        ))
    })?;

    match opcode {
        GETSTATIC => {
            engine.ctx.push(Node::new(
                NodeKind::FieldRef {
                    target: None,
                    owner,
                    name,
                },
                field_type,
            ));
        }
        GETFIELD => {
            let target = engine.ctx.pop()?;
            engine.ctx.push(Node::new(
                NodeKind::FieldRef {
                    target: Some(Box::new(target)),
                    owner,
                    name,
                },
                field_type,
            ));
        }
        PUTSTATIC => {
            let value = engine.ctx.pop()?;
            engine.ctx.push(Node::new(
                NodeKind::FieldAssign {
                    target: None,
                    owner,
                    name,
                    value: Box::new(value),
                },
                JvmType::Void,
            ));
            engine.ctx.reduce()?;
        }
        _ => {
            let value = engine.ctx.pop()?;
            let target = engine.ctx.pop()?;
            engine.ctx.push(Node::new(
                NodeKind::FieldAssign {
                    target: Some(Box::new(target)),
                    owner,
                    name,
                    value: Box::new(value),
                },
                JvmType::Void,
            ));
            engine.ctx.reduce()?;
        }
    }
    Ok(())
}

// ============================================================
// Invocation
// ============================================================

fn pop_args(engine: &mut Engine<'_>, count: usize) -> Result<Vec<Node>, DecompileError> {
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(engine.ctx.pop()?);
    }
    args.reverse();
    Ok(args)
}

fn handle_invoke(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let class = engine.class;
    let index = engine.cursor.next_u16()?;
    if opcode == INVOKEINTERFACE {
        // count and a reserved zero byte
        engine.cursor.next_u8()?;
        engine.cursor.next_u8()?;
    }
    let member = class.const_pool.member_ref(index)?;
    let owner = member.owner.to_string();
    let name = member.name.to_string();
    let descriptor = member.descriptor.to_string();
    let (params, return_type) = parse_method_descriptor(&descriptor).ok_or_else(|| {
        DecompileError::format(format!("malformed method descriptor '{}'", descriptor))
    })?;
    let args = pop_args(engine, params.len())?;

    let kind = match opcode {
        INVOKEVIRTUAL => InvokeKind::Virtual,
        INVOKESPECIAL => InvokeKind::Special,
        INVOKESTATIC => InvokeKind::Static,
        _ => InvokeKind::Interface,
    };

    if kind == InvokeKind::Special && name == "<init>" {
        return handle_constructor(engine, owner, descriptor, args);
    }

    let target = if kind == InvokeKind::Static {
        None
    } else {
        Some(Box::new(engine.ctx.pop()?))
    };

    let call = Node::new(
        NodeKind::MethodCall {
            kind,
            target,
            owner,
            name,
            descriptor,
            args,
        },
        return_type.clone(),
    );
    engine.ctx.push(call);
    if return_type == JvmType::Void {
        engine.ctx.reduce()?;
    }
    Ok(())
}

/// Collapses `new; dup; <args>; invokespecial <init>` into a NewInstance
/// value. Constructor calls on anything else (super()/this() chains) become
/// call statements.
fn handle_constructor(
    engine: &mut Engine<'_>,
    owner: String,
    descriptor: String,
    args: Vec<Node>,
) -> Result<(), DecompileError> {
    let receiver = engine.ctx.pop()?;
    match receiver.kind {
        NodeKind::Dup(inner) => match inner.kind {
            NodeKind::UninitNew { class_name } => {
                let instance = Node::new(
                    NodeKind::NewInstance {
                        class_name: class_name.clone(),
                        descriptor,
                        args,
                    },
                    JvmType::Reference(class_name.clone()),
                );
                // The dup left the original allocation below; it becomes
                // the constructed value in place.
                replace_uninit_new(engine.ctx.stack_mut(), &class_name, &instance)?;
            }
            kind => {
                let receiver = Node {
                    kind,
                    ty: inner.ty,
                    origin: inner.origin,
                };
                constructor_call_statement(engine, receiver, owner, descriptor, args)?;
            }
        },
        NodeKind::UninitNew { class_name } => {
            let instance = Node::new(
                NodeKind::NewInstance {
                    class_name: class_name.clone(),
                    descriptor,
                    args,
                },
                JvmType::Reference(class_name),
            );
            engine.ctx.push(instance);
        }
        kind => {
            let receiver = Node {
                kind,
                ty: receiver.ty,
                origin: receiver.origin,
            };
            constructor_call_statement(engine, receiver, owner, descriptor, args)?;
        }
    }
    Ok(())
}

/// super()/this() chains and already-initialized receivers stay explicit
/// constructor call statements.
fn constructor_call_statement(
    engine: &mut Engine<'_>,
    receiver: Node,
    owner: String,
    descriptor: String,
    args: Vec<Node>,
) -> Result<(), DecompileError> {
    let call = Node::new(
        NodeKind::MethodCall {
            kind: InvokeKind::Special,
            target: Some(Box::new(receiver)),
            owner,
            name: "<init>".into(),
            descriptor,
            args,
        },
        JvmType::Void,
    );
    engine.ctx.push(call);
    engine.ctx.reduce()?;
    Ok(())
}

fn replace_uninit_new(
    stack: &mut [Node],
    class_name: &str,
    replacement: &Node,
) -> Result<(), DecompileError> {
    for item in stack.iter_mut().rev() {
        if matches!(&item.kind, NodeKind::UninitNew { class_name: cn } if cn == class_name) {
            *item = replacement.clone();
            return Ok(());
        }
    }
    Err(DecompileError::illegal_state(format!(
        "no uninitialized allocation of {} on stack",
        class_name
    )))
}

fn handle_invokedynamic(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let class = engine.class;
    let index = engine.cursor.next_u16()?;
    // two reserved zero bytes
    engine.cursor.next_u8()?;
    engine.cursor.next_u8()?;

    let indy = class.const_pool.invoke_dynamic(index)?;
    let (_invoked_name, descriptor) = class.const_pool.name_and_type(indy.name_and_type_index)?;
    let descriptor = descriptor.to_string();
    let (params, return_type) = parse_method_descriptor(&descriptor).ok_or_else(|| {
        DecompileError::format(format!(
            "malformed invokedynamic descriptor '{}'",
            descriptor
        ))
    })?;

    let bootstrap = class
        .bootstrap_methods()
        .and_then(|b| {
            b.bootstrap_methods
                .get(indy.bootstrap_method_attr_index as usize)
        })
        .ok_or_else(|| {
            DecompileError::format(format!(
                "missing bootstrap method {}",
                indy.bootstrap_method_attr_index
            ))
        })?;

    let factory = class.const_pool.method_handle(bootstrap.bootstrap_method_ref)?;
    let factory_ref = class.const_pool.member_ref(factory.reference_index)?;
    if factory_ref.owner != "java/lang/invoke/LambdaMetafactory" {
        engine.ctx.abort(format!(
            "invokedynamic via {} at pc {}",
            factory_ref.owner, engine.ctx.pc
        ));
        return Ok(());
    }

    // Bootstrap argument 1 is the implementation method handle.
    let impl_handle_index = bootstrap.bootstrap_arguments.get(1).copied().ok_or_else(|| {
        DecompileError::format("lambda bootstrap has no implementation argument".to_string())
    })?;
    let impl_handle = class.const_pool.method_handle(impl_handle_index)?;
    let impl_ref = class.const_pool.member_ref(impl_handle.reference_index)?;
    let backing_method = impl_ref.name.to_string();

    let functional_interface = match &return_type {
        JvmType::Reference(name) => name.clone(),
        other => {
            return Err(DecompileError::format(format!(
                "lambda site yields non-reference type {}",
                other.simple_name()
            )))
        }
    };

    let captures = pop_args(engine, params.len())?;
    engine.ctx.push(Node::new(
        NodeKind::Lambda {
            functional_interface,
            backing_method,
            descriptor,
            captures,
        },
        return_type,
    ));
    Ok(())
}

// ============================================================
// Allocation and casts
// ============================================================

fn handle_allocation(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    let class = engine.class;
    match opcode {
        NEW => {
            let index = engine.cursor.next_u16()?;
            let class_name = class.const_pool.class_name(index)?.to_string();
            engine.ctx.push(Node::new(
                NodeKind::UninitNew {
                    class_name: class_name.clone(),
                },
                JvmType::Reference(class_name),
            ));
        }
        NEWARRAY => {
            let atype = engine.cursor.next_u8()?;
            let element_type = newarray_type(atype).ok_or_else(|| {
                DecompileError::format(format!("unknown newarray type code {}", atype))
            })?;
            let length = engine.ctx.pop()?;
            let ty = JvmType::Array(Box::new(element_type.clone()));
            engine.ctx.push(Node::new(
                NodeKind::NewArray {
                    element_type,
                    length: Box::new(length),
                    elements: None,
                },
                ty,
            ));
        }
        ANEWARRAY => {
            let index = engine.cursor.next_u16()?;
            let class_name = class.const_pool.class_name(index)?.to_string();
            let element_type = JvmType::Reference(class_name);
            let length = engine.ctx.pop()?;
            let ty = JvmType::Array(Box::new(element_type.clone()));
            engine.ctx.push(Node::new(
                NodeKind::NewArray {
                    element_type,
                    length: Box::new(length),
                    elements: None,
                },
                ty,
            ));
        }
        ARRAYLENGTH => {
            let array = engine.ctx.pop()?;
            let owner = array.ty.simple_name();
            engine.ctx.push(Node::new(
                NodeKind::FieldRef {
                    target: Some(Box::new(array)),
                    owner,
                    name: "length".into(),
                },
                JvmType::Int,
            ));
        }
        _ => {
            // checkcast
            let index = engine.cursor.next_u16()?;
            let class_name = class.const_pool.class_name(index)?.to_string();
            let operand = engine.ctx.pop()?;
            engine.ctx.push(Node::new(
                NodeKind::Cast {
                    operand: Box::new(operand),
                },
                JvmType::Reference(class_name),
            ));
        }
    }
    Ok(())
}

// ============================================================
// wide
// ============================================================

fn handle_wide(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let widened = engine.cursor.next_u8()?;
    let slot = engine.cursor.next_u16()?;
    match widened {
        ILOAD..=ALOAD => {
            push_local_load(engine, slot, load_kind_type(widened - ILOAD));
            Ok(())
        }
        ISTORE..=ASTORE => store_local(engine, slot, load_kind_type(widened - ISTORE)),
        IINC => {
            let delta = engine.cursor.next_i16()?;
            emit_increment(engine, slot, delta)
        }
        other => Err(DecompileError::format(format!(
            "wide prefix on opcode 0x{:02x}",
            other
        ))),
    }
}

// ============================================================
// Enhancements
// ============================================================

fn enhance_trace_opcode(engine: &mut Engine<'_>, opcode: u8) -> Result<(), DecompileError> {
    trace!(
        "pc {:04}: dispatching opcode 0x{:02x} (stack depth {})",
        engine.ctx.pc,
        opcode,
        engine.ctx.stack().len()
    );
    Ok(())
}

/// Stamps the current origin on whatever the primary handler just produced,
/// so failure reports can tie every node back to a pc and source line.
fn enhance_origin_stamp(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let origin = engine.ctx.origin();
    if let Some(top) = engine.ctx.top_mut() {
        if top.origin.is_none() {
            top.origin = Some(origin);
        }
    }
    if let Some(handle) = engine.ctx.statements.last_handle() {
        if let Some(last) = engine.ctx.statements.get_mut(handle) {
            if last.origin.is_none() {
                last.origin = Some(origin);
            }
        }
    }
    Ok(())
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

fn strip_boxing(node: Node) -> Node {
    match node.kind {
        NodeKind::MethodCall {
            kind: InvokeKind::Static,
            owner,
            name,
            mut args,
            ..
        } if name == "valueOf" && args.len() == 1 && BOX_TYPES.contains(&owner.as_str()) => {
            args.remove(0)
        }
        NodeKind::MethodCall {
            kind: InvokeKind::Virtual,
            target: Some(target),
            owner,
            name,
            args,
            ..
        } if args.is_empty()
            && name.ends_with("Value")
            && BOX_TYPES.contains(&owner.as_str()) =>
        {
            *target
        }
        kind => Node {
            kind,
            ty: node.ty,
            origin: node.origin,
        },
    }
}

/// Rewrites `Integer.valueOf(x) == y` style comparisons back to their
/// unboxed operands.
fn enhance_unbox_compare(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let top = match engine.ctx.top() {
        Some(node) if matches!(node.kind, NodeKind::Branch { .. }) => engine.ctx.pop()?,
        _ => return Ok(()),
    };
    if let NodeKind::Branch {
        op,
        left,
        right,
        target,
    } = top.kind
    {
        engine.ctx.push(Node {
            kind: NodeKind::Branch {
                op,
                left: Box::new(strip_boxing(*left)),
                right: Box::new(strip_boxing(*right)),
                target,
            },
            ty: top.ty,
            origin: top.origin,
        });
    }
    Ok(())
}

/// Inlines same-class synthetic `access$NNN` bridge calls into the field
/// operation they wrap, so inner-class field access reads like source.
fn enhance_inline_accessor(engine: &mut Engine<'_>, _opcode: u8) -> Result<(), DecompileError> {
    let class = engine.class;
    let this_class = match class.this_class_name() {
        Ok(name) => name.to_string(),
        Err(_) => return Ok(()),
    };

    let (site, call) = if matches!(
        engine.ctx.top(),
        Some(node) if is_accessor_call(node, &this_class)
    ) {
        (Site::Stack, engine.ctx.pop()?)
    } else {
        match engine.ctx.statements.last_handle() {
            Some(handle)
                if engine
                    .ctx
                    .statements
                    .get(handle)
                    .map(|n| is_accessor_call(n, &this_class))
                    .unwrap_or(false) =>
            {
                let node = engine.ctx.statements.remove(handle)?;
                (Site::Statement, node)
            }
            _ => return Ok(()),
        }
    };

    let (name, descriptor, args) = match &call.kind {
        NodeKind::MethodCall {
            name,
            descriptor,
            args,
            ..
        } => (name.clone(), descriptor.clone(), args.clone()),
        _ => return Ok(()),
    };

    let bridge = match class.find_method(&name) {
        Some(method) => method,
        None => {
            restore(engine, site, call);
            return Ok(());
        }
    };
    let body = match decompile_method(engine.config, class, bridge) {
        Ok(body) => body,
        Err(_) => {
            restore(engine, site, call);
            return Ok(());
        }
    };

    // A field bridge is a single return (getter) or an assignment followed
    // by a return (setter).
    let inlined = match body.as_slice() {
        [Node {
            kind: NodeKind::ReturnValue(value),
            ..
        }] => (**value).clone(),
        [statement, Node { kind, .. }]
            if statement.is_statement()
                && matches!(kind, NodeKind::Return | NodeKind::ReturnValue(_)) =>
        {
            statement.clone()
        }
        _ => {
            restore(engine, site, call);
            return Ok(());
        }
    };

    let params = match parse_method_descriptor(&descriptor) {
        Some((params, _)) => params,
        None => {
            restore(engine, site, call);
            return Ok(());
        }
    };
    let mut slot_args = Vec::new();
    let mut slot = 0u16;
    for (param, arg) in params.iter().zip(args.into_iter()) {
        slot_args.push((slot, arg));
        slot += if param.is_wide() { 2 } else { 1 };
    }

    let mut inlined = inlined;
    substitute_params(&mut inlined, &slot_args);
    match site {
        Site::Stack => engine.ctx.push(inlined),
        Site::Statement => {
            engine.ctx.emit(inlined);
        }
    }
    Ok(())
}

/// Where the bridge call sits when the corrective runs: on the stack for a
/// value-returning getter, or as the just-reduced last statement for a void
/// setter.
enum Site {
    Stack,
    Statement,
}

fn restore(engine: &mut Engine<'_>, site: Site, call: Node) {
    match site {
        Site::Stack => engine.ctx.push(call),
        Site::Statement => {
            engine.ctx.emit(call);
        }
    }
}

fn is_accessor_call(node: &Node, this_class: &str) -> bool {
    matches!(
        &node.kind,
        NodeKind::MethodCall {
            kind: InvokeKind::Static,
            owner,
            name,
            ..
        } if owner == this_class && name.starts_with("access$")
    )
}

fn substitute_params(node: &mut Node, slot_args: &[(u16, Node)]) {
    if let NodeKind::VarRef(variable) = &node.kind {
        if let Some((_, arg)) = slot_args.iter().find(|(slot, _)| *slot == variable.slot) {
            *node = arg.clone();
            return;
        }
    }
    for_each_child_mut(node, &mut |child| substitute_params(child, slot_args));
}

fn for_each_child_mut(node: &mut Node, f: &mut dyn FnMut(&mut Node)) {
    match &mut node.kind {
        NodeKind::Unary { operand, .. } | NodeKind::Cast { operand } => f(operand),
        NodeKind::Binary { left, right, .. }
        | NodeKind::Compare { left, right, .. }
        | NodeKind::Branch { left, right, .. }
        | NodeKind::Cmp { left, right } => {
            f(left);
            f(right);
        }
        NodeKind::MethodCall { target, args, .. } => {
            if let Some(target) = target {
                f(target);
            }
            args.iter_mut().for_each(f);
        }
        NodeKind::FieldRef { target, .. } => {
            if let Some(target) = target {
                f(target);
            }
        }
        NodeKind::FieldAssign { target, value, .. } => {
            if let Some(target) = target {
                f(target);
            }
            f(value);
        }
        NodeKind::VarAssign { value, .. } => f(value),
        NodeKind::NewInstance { args, .. } => args.iter_mut().for_each(f),
        NodeKind::NewArray {
            length, elements, ..
        } => {
            f(length);
            if let Some(elements) = elements {
                elements.iter_mut().for_each(f);
            }
        }
        NodeKind::ArrayLoad { array, index } => {
            f(array);
            f(index);
        }
        NodeKind::ArrayStore {
            array,
            index,
            value,
        } => {
            f(array);
            f(index);
            f(value);
        }
        NodeKind::Lambda { captures, .. } => captures.iter_mut().for_each(f),
        NodeKind::ReturnValue(value) | NodeKind::Dup(value) => f(value),
        NodeKind::Constant(_)
        | NodeKind::VarRef(_)
        | NodeKind::Increment { .. }
        | NodeKind::Goto { .. }
        | NodeKind::Return
        | NodeKind::UninitNew { .. } => {}
    }
}
