//! Per-node build behavior: what each node type emits into the `BuildContext`.

use super::context::BuildContext;
use crate::bytecode::GlobalKind;
use crate::bytecode::opcode::{Addr, OpCode, Operand, Slot};
use crate::graph::{Node, NodeKind};
use crate::hash;
use crate::runtime::FunctionRegistry;
use tracing::warn;

/// How control leaves a node once its own statements are emitted.
pub(super) enum Flow {
    /// Continue with the successor on output 0.
    Next,
    /// The node opened a two-way branch. Output 0 runs when the condition holds,
    /// output 1 otherwise; `patch` is the jump to point at the else arm.
    Branch {
        patch: Addr,
        else_prelude: Option<String>,
    },
}

/// The global holding a Func node's last call result.
pub(super) fn result_global(ctx: &mut BuildContext, uuid: u64) -> Slot {
    let name = BuildContext::node_var("res", uuid);
    ctx.declare_global("int", &name, GlobalKind::Int, 0, None)
}

/// Emits one node. `inputs` holds the resolved Value inputs in pin order.
pub(super) fn build_node(
    node: &Node,
    inputs: &[Operand],
    ctx: &mut BuildContext,
    functions: Option<&FunctionRegistry>,
) -> Flow {
    match &node.kind {
        NodeKind::Start | NodeKind::Value(_) => Flow::Next,

        NodeKind::Wait(p) => {
            let millis = p.millis().min(i64::MAX as u64) as i64;
            let time = ctx.declare_local_const("uint64_t", "t_time", millis);
            ctx.emit_line("sleep_ms(t_time);");
            ctx.emit(OpCode::Sleep(time));
            Flow::Next
        }

        NodeKind::ObjDel(p) => {
            let object = ctx.declare_local_const("uint16_t", "t_objId", p.object_id as i64);
            ctx.emit_line("object_remove(t_objId == 0 ? inst->object_id : t_objId);");
            ctx.emit(OpCode::DeleteObject(object));
            Flow::Next
        }

        NodeKind::ObjEvent(p) => {
            let object = ctx.declare_local_const("uint16_t", "t_objId", p.object_id as i64);
            let event_type =
                ctx.declare_local_const("uint16_t", "t_eventType", p.event_type as i64);
            let value = ctx.declare_local_const("uint32_t", "t_eventVal", p.event_value as i64);
            ctx.emit_line("send_event(");
            ctx.emit_line("  t_objId == 0 ? inst->object_id : t_objId,");
            ctx.emit_line("  inst->object_id,");
            ctx.emit_line("  t_eventType,");
            ctx.emit_line("  t_eventVal");
            ctx.emit_line(");");
            ctx.emit(OpCode::SendEvent {
                object,
                event_type,
                value,
            });
            Flow::Next
        }

        NodeKind::Compare(p) => {
            let lhs = materialize(ctx, inputs.first().copied(), "t_a");
            let rhs = materialize(ctx, inputs.get(1).copied(), "t_b");
            let header = format!(
                "if ({} {} {}) {{",
                ctx.operand_text(lhs),
                p.comp_type,
                ctx.operand_text(rhs)
            );
            let patch = ctx.emit(OpCode::JumpUnless {
                op: p.comp_type,
                lhs,
                rhs,
                target: 0,
            });
            ctx.open(header);
            Flow::Branch {
                patch,
                else_prelude: None,
            }
        }

        NodeKind::Repeat(p) => {
            let name = BuildContext::node_var("cnt", node.uuid);
            let counter = ctx.declare_global("uint32_t", &name, GlobalKind::Counter, 0, None);
            let patch = ctx.emit(OpCode::Repeat {
                counter,
                bound: p.count,
                exit: 0,
            });
            let text = ctx.global_text(counter).to_string();
            ctx.open(format!("if ({} < {}) {{", text, p.count));
            ctx.emit_line(format!("++{};", text));
            Flow::Branch {
                patch,
                else_prelude: Some(format!("{} = 0;", text)),
            }
        }

        NodeKind::Func(p) => {
            let name_hash = hash::crc32(&p.func_name);
            if let Some(registry) = functions {
                if !registry.contains(name_hash) {
                    warn!(
                        "Function '{}' (#{:08X}) used by node {:016X} is not registered",
                        p.func_name, name_hash, node.uuid
                    );
                }
            }

            let hex = hash::to_hex32(name_hash);
            let func = ctx.declare_global(
                "UserFunc",
                &format!("fn_{}", hex),
                GlobalKind::UserFunc(name_hash),
                0,
                Some(format!("get_function(0x{})", hex)),
            );
            let result = result_global(ctx, node.uuid);
            let arg = ctx.declare_local_const("uint32_t", "t_arg", p.arg0 as i64);
            let line = format!(
                "{} = {}(t_arg);",
                ctx.global_text(result),
                ctx.global_text(func)
            );
            ctx.emit_line(line);
            ctx.emit(OpCode::Call { func, arg, result });
            Flow::Next
        }
    }
}

/// Constants are copied into a local; globals are read in place.
fn materialize(ctx: &mut BuildContext, operand: Option<Operand>, name: &str) -> Operand {
    match operand.unwrap_or(Operand::Const(0)) {
        Operand::Const(v) => ctx.declare_local_const("int32_t", name, v),
        other => other,
    }
}
