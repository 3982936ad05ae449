use super::context::{BuildContext, EmittedUnit};
use super::nodes::{self, Flow};
use crate::bytecode::Trigger;
use crate::bytecode::opcode::{Addr, Operand, Slot};
use crate::catalog::PinKind;
use crate::error::CompileError;
use crate::graph::{Graph, Node, NodeKind};
use crate::runtime::FunctionRegistry;
use ahash::AHashSet;
use tracing::{debug, warn};

/// Walks a graph from its Start node along Logic pins and lowers it into a `BuildContext`.
///
/// Successors are visited in output declaration order. Branching nodes become nested
/// if/else arms; a successor that was already emitted is reached with a jump, which is
/// how loops and merging paths are expressed.
pub(super) struct GraphLowering<'a> {
    graph: &'a Graph,
    asset: &'a str,
    functions: Option<&'a FunctionRegistry>,
    ctx: BuildContext,
    joins: AHashSet<u64>,
}

impl<'a> GraphLowering<'a> {
    pub(super) fn new(
        graph: &'a Graph,
        asset: &'a str,
        functions: Option<&'a FunctionRegistry>,
    ) -> Self {
        let joins = graph
            .nodes()
            .iter()
            .filter(|n| graph.logic_in_degree(n.uuid) > 1)
            .map(|n| n.uuid)
            .collect();

        Self {
            graph,
            asset,
            functions,
            ctx: BuildContext::new(),
            joins,
        }
    }

    /// Lowers every Start output into its own entry.
    pub(super) fn lower(mut self) -> Result<(EmittedUnit, [Option<Addr>; 3]), CompileError> {
        let start = self.graph.start().uuid;
        let mut entries = [None; 3];

        for trigger in Trigger::ALL {
            let Some(first) = self.successor(start, trigger.pin()) else {
                continue;
            };
            debug!("Lowering {} entry of '{}'", trigger, self.asset);
            self.ctx.emit_label(trigger.label());
            entries[trigger.pin() as usize] = Some(self.ctx.here());
            self.lower_chain(first, start)?;
        }

        Ok((self.ctx.finish(), entries))
    }

    fn lower_chain(&mut self, first: u64, source: u64) -> Result<(), CompileError> {
        let (mut uuid, mut from) = (first, source);
        loop {
            if self.ctx.label_of(uuid).is_some() {
                self.ctx.emit_goto(uuid);
                return Ok(());
            }

            let node = self.find_node(uuid, from)?;
            let inputs = self.resolve_value_inputs(node)?;

            self.ctx.bind_label(uuid, self.joins.contains(&uuid));
            self.ctx.begin_block();
            self.ctx.emit_line(format!("// {}", node.kind.title()));
            let flow = nodes::build_node(node, &inputs, &mut self.ctx, self.functions);
            self.check_slots(uuid)?;

            match flow {
                Flow::Next => {
                    self.ctx.end_block();
                    match self.successor(uuid, 0) {
                        Some(next) => {
                            from = uuid;
                            uuid = next;
                        }
                        None => {
                            self.ctx.emit_end();
                            return Ok(());
                        }
                    }
                }
                Flow::Branch {
                    patch,
                    else_prelude,
                } => {
                    self.lower_arm(uuid, 0)?;
                    self.ctx.close_open("} else {");
                    let else_addr = self.ctx.here();
                    self.ctx.patch_jump(patch, else_addr);
                    if let Some(line) = else_prelude {
                        self.ctx.emit_line(line);
                    }
                    self.lower_arm(uuid, 1)?;
                    self.ctx.close("}");
                    self.ctx.end_block();
                    return Ok(());
                }
            }
        }
    }

    fn lower_arm(&mut self, uuid: u64, pin: u16) -> Result<(), CompileError> {
        match self.successor(uuid, pin) {
            Some(next) => self.lower_chain(next, uuid),
            None => {
                self.ctx.emit_end();
                Ok(())
            }
        }
    }

    /// The node driven by a Logic output. Hand-edited assets may carry several links on
    /// one output; only the first one is followed.
    fn successor(&self, uuid: u64, pin: u16) -> Option<u64> {
        let mut links = self.graph.links_from(uuid, pin);
        let first = links.next()?;
        if links.next().is_some() {
            warn!(
                "Asset '{}': output {} of node {:016X} has several links, following the first",
                self.asset, pin, uuid
            );
        }
        Some(first.to_node)
    }

    /// Resolves each Value input of a node into an operand, in pin order.
    fn resolve_value_inputs(&mut self, node: &Node) -> Result<Vec<Operand>, CompileError> {
        let signature = node.node_type().signature();
        let mut operands = Vec::new();

        for (pin, def) in signature.inputs.iter().enumerate() {
            if def.kind != PinKind::Value {
                continue;
            }
            let Some(link) = self.graph.link_into(node.uuid, pin as u16) else {
                operands.push(Operand::Const(0));
                continue;
            };

            let source = self.find_node(link.from_node, node.uuid)?;
            let operand = match &source.kind {
                NodeKind::Value(p) => Operand::Const(p.value as i64),
                NodeKind::Func(_) if link.from_pin == 1 => {
                    Operand::Global(nodes::result_global(&mut self.ctx, source.uuid))
                }
                other => {
                    warn!(
                        "Asset '{}': input {} of node {:016X} reads from a {} node, using 0",
                        self.asset,
                        pin,
                        node.uuid,
                        other.node_type().name()
                    );
                    Operand::Const(0)
                }
            };
            operands.push(operand);
        }
        Ok(operands)
    }

    fn find_node(&self, uuid: u64, source: u64) -> Result<&'a Node, CompileError> {
        self.graph
            .node(uuid)
            .ok_or_else(|| CompileError::NodeNotFound {
                asset: self.asset.to_string(),
                missing_uuid: uuid,
                source_uuid: source,
            })
    }

    fn check_slots(&self, uuid: u64) -> Result<(), CompileError> {
        let limit = Slot::MAX as usize;
        let (what, count) = if self.ctx.global_count() > limit {
            ("global", self.ctx.global_count())
        } else {
            ("local", self.ctx.local_count())
        };
        if count > limit {
            return Err(CompileError::TooManySlots {
                asset: self.asset.to_string(),
                node_uuid: uuid,
                what,
                limit,
            });
        }
        Ok(())
    }
}
