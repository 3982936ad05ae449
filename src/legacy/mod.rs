//! Packed variable-length node records.
//!
//! This is the older compiled form of a graph: a header followed by one record per
//! reachable node, each pointing at its successors through byte offsets relative to
//! its own start. It is kept readable and writable for compatibility; the runtime
//! executes `Program`s, not these blobs.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! header: u64 uuid, u16 stack_size, u16 record_count
//! record: u8 type, u8 out_count, i16 offsets[out_count], payload, pad to even length
//! ```

use crate::artifact::CompiledUnit;
use crate::catalog::{NodeType, PinKind};
use crate::error::{CompileError, DecodeError};
use crate::graph::{CompareOp, Graph, Node, NodeKind};
use crate::hash;
use ahash::{AHashMap, AHashSet};
use tracing::debug;

pub const HEADER_LEN: usize = 12;

/// Offset stored for an output with no linked successor.
pub const UNLINKED: i16 = i16::MIN;

/// Type-specific record data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Start,
    Wait { millis: u16 },
    ObjDel { object: u16 },
    ObjEvent { object: u16, event_type: u16, value: u32 },
    Compare { op: CompareOp, a: i32, b: i32 },
    Value(u16),
    Repeat { counter_slot: u8, count: u8 },
    Func { hash: u32, arg: u32 },
}

impl Payload {
    fn len(&self) -> usize {
        match self {
            Payload::Start => 0,
            Payload::Wait { .. } | Payload::ObjDel { .. } | Payload::Value(_) => 2,
            Payload::Repeat { .. } => 2,
            Payload::ObjEvent { .. } | Payload::Func { .. } => 8,
            Payload::Compare { .. } => 10,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Payload::Start => {}
            Payload::Wait { millis } => out.extend_from_slice(&millis.to_be_bytes()),
            Payload::ObjDel { object } => out.extend_from_slice(&object.to_be_bytes()),
            Payload::ObjEvent {
                object,
                event_type,
                value,
            } => {
                out.extend_from_slice(&object.to_be_bytes());
                out.extend_from_slice(&event_type.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
            Payload::Compare { op, a, b } => {
                out.push(u8::from(*op));
                out.push(0);
                out.extend_from_slice(&a.to_be_bytes());
                out.extend_from_slice(&b.to_be_bytes());
            }
            Payload::Value(v) => out.extend_from_slice(&v.to_be_bytes()),
            Payload::Repeat {
                counter_slot,
                count,
            } => {
                out.push(*counter_slot);
                out.push(*count);
            }
            Payload::Func { hash, arg } => {
                out.extend_from_slice(&hash.to_be_bytes());
                out.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }
}

/// One decoded record. Successors are indices into `LegacyBlob::nodes`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    /// Byte position of the record in the blob.
    pub offset: usize,
    pub node_type: NodeType,
    pub successors: Vec<Option<usize>>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyBlob {
    pub uuid: u64,
    pub stack_size: u16,
    /// Records in blob order; the first one is the Start node.
    pub nodes: Vec<DecodedNode>,
}

impl LegacyBlob {
    /// The record reached from output `pin` of record `index`.
    pub fn successor(&self, index: usize, pin: usize) -> Option<&DecodedNode> {
        let next = self.nodes.get(index)?.successors.get(pin).copied().flatten()?;
        self.nodes.get(next)
    }
}

struct Record<'g> {
    node: &'g Node,
    successors: Vec<Option<u64>>,
    payload: Payload,
}

/// Packs every node reachable from Start, in depth-first order with successors taken
/// in output order. Header fields come from the compiled unit of the same graph.
pub fn encode(graph: &Graph, unit: &CompiledUnit) -> Result<Vec<u8>, CompileError> {
    let asset = unit.name.as_str();
    let order = reachable_in_order(graph, asset)?;

    let mut records = Vec::with_capacity(order.len());
    let mut counter_slots = 0usize;
    for node in order {
        let successors = logic_pins(node.node_type())
            .into_iter()
            .map(|pin| graph.links_from(node.uuid, pin).next().map(|l| l.to_node))
            .collect();
        let payload = payload_of(graph, node, &mut counter_slots, asset)?;
        records.push(Record {
            node,
            successors,
            payload,
        });
    }

    let mut positions = AHashMap::with_capacity(records.len());
    let mut pos = HEADER_LEN;
    for record in &records {
        positions.insert(record.node.uuid, pos);
        pos += padded(2 + 2 * record.successors.len() + record.payload.len());
    }

    let record_count =
        u16::try_from(records.len()).map_err(|_| CompileError::LegacyOverflow {
            asset: asset.to_string(),
            node_uuid: graph.start().uuid,
            what: "record count",
        })?;

    let mut out = Vec::with_capacity(pos);
    out.extend_from_slice(&unit.uuid.to_be_bytes());
    out.extend_from_slice(&unit.stack_size.to_be_bytes());
    out.extend_from_slice(&record_count.to_be_bytes());

    for record in &records {
        let start = out.len();
        out.push(record.node.node_type().id());
        out.push(record.successors.len() as u8);
        for successor in &record.successors {
            let offset = match successor.and_then(|uuid| positions.get(&uuid)) {
                Some(&target) => {
                    let rel = target as i64 - start as i64;
                    i16::try_from(rel)
                        .ok()
                        .filter(|&r| r != UNLINKED)
                        .ok_or_else(|| CompileError::LegacyOverflow {
                            asset: asset.to_string(),
                            node_uuid: record.node.uuid,
                            what: "successor offset",
                        })?
                }
                None => UNLINKED,
            };
            out.extend_from_slice(&offset.to_be_bytes());
        }
        record.payload.write(&mut out);
        if (out.len() - start) % 2 != 0 {
            out.push(0);
        }
    }

    debug!("Packed '{}' into {} records, {} bytes", asset, records.len(), out.len());
    Ok(out)
}

/// Reads a blob back into an arena of records.
pub fn decode(bytes: &[u8]) -> Result<LegacyBlob, DecodeError> {
    let mut reader = Reader { bytes, pos: 0 };
    let uuid = reader.u64("header uuid")?;
    let stack_size = reader.u16("header stack size")?;
    let record_count = reader.u16("header record count")?;

    let mut nodes = Vec::with_capacity(record_count as usize);
    let mut raw_offsets = Vec::with_capacity(record_count as usize);
    for _ in 0..record_count {
        let offset = reader.pos;
        let tag = reader.u8("record type")?;
        let node_type = NodeType::from_id(tag as u32)
            .ok_or(DecodeError::UnknownTypeTag { offset, tag })?;
        let out_count = reader.u8("output count")?;
        let mut rel = Vec::with_capacity(out_count as usize);
        for _ in 0..out_count {
            rel.push(reader.i16("output offset")?);
        }
        let payload = read_payload(&mut reader, node_type, offset)?;
        if (reader.pos - offset) % 2 != 0 {
            reader.u8("padding")?;
        }
        raw_offsets.push(rel);
        nodes.push(DecodedNode {
            offset,
            node_type,
            successors: Vec::new(),
            payload,
        });
    }

    let index_of: AHashMap<usize, usize> =
        nodes.iter().enumerate().map(|(i, n)| (n.offset, i)).collect();
    for (node, rel) in nodes.iter_mut().zip(raw_offsets) {
        for r in rel {
            if r == UNLINKED {
                node.successors.push(None);
                continue;
            }
            let target = node.offset as i64 + r as i64;
            let index = usize::try_from(target)
                .ok()
                .and_then(|t| index_of.get(&t).copied())
                .ok_or(DecodeError::BadOffset {
                    offset: node.offset,
                    target,
                })?;
            node.successors.push(Some(index));
        }
    }

    Ok(LegacyBlob {
        uuid,
        stack_size,
        nodes,
    })
}

fn padded(len: usize) -> usize {
    len + len % 2
}

/// Output pin indices that carry Logic, in declaration order.
fn logic_pins(node_type: NodeType) -> Vec<u16> {
    node_type
        .signature()
        .outputs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind == PinKind::Logic)
        .map(|(i, _)| i as u16)
        .collect()
}

fn reachable_in_order<'g>(graph: &'g Graph, asset: &str) -> Result<Vec<&'g Node>, CompileError> {
    let start = graph.start();
    let mut order = Vec::new();
    let mut seen = AHashSet::new();
    let mut stack = vec![(start.uuid, start.uuid)];

    while let Some((uuid, from)) = stack.pop() {
        if !seen.insert(uuid) {
            continue;
        }
        let node = graph.node(uuid).ok_or_else(|| CompileError::NodeNotFound {
            asset: asset.to_string(),
            missing_uuid: uuid,
            source_uuid: from,
        })?;
        order.push(node);
        for pin in logic_pins(node.node_type()).into_iter().rev() {
            if let Some(link) = graph.links_from(uuid, pin).next() {
                stack.push((link.to_node, uuid));
            }
        }
    }
    Ok(order)
}

/// Constant fed into a Value input. Only Value nodes can be packed; anything else reads 0.
fn constant_input(graph: &Graph, node: &Node, pin: u16) -> i32 {
    graph
        .link_into(node.uuid, pin)
        .and_then(|l| graph.node(l.from_node))
        .map(|source| match &source.kind {
            NodeKind::Value(p) => p.value as i32,
            _ => 0,
        })
        .unwrap_or(0)
}

fn payload_of(
    graph: &Graph,
    node: &Node,
    counter_slots: &mut usize,
    asset: &str,
) -> Result<Payload, CompileError> {
    Ok(match &node.kind {
        NodeKind::Start => Payload::Start,
        NodeKind::Wait(p) => Payload::Wait {
            millis: p.millis().min(u16::MAX as u64) as u16,
        },
        NodeKind::ObjDel(p) => Payload::ObjDel {
            object: p.object_id,
        },
        NodeKind::ObjEvent(p) => Payload::ObjEvent {
            object: p.object_id,
            event_type: p.event_type,
            value: p.event_value,
        },
        NodeKind::Compare(p) => Payload::Compare {
            op: p.comp_type,
            a: constant_input(graph, node, 1),
            b: constant_input(graph, node, 2),
        },
        NodeKind::Value(p) => Payload::Value(p.value),
        NodeKind::Repeat(p) => {
            let counter_slot =
                u8::try_from(*counter_slots).map_err(|_| CompileError::LegacyOverflow {
                    asset: asset.to_string(),
                    node_uuid: node.uuid,
                    what: "counter slot",
                })?;
            *counter_slots += 1;
            Payload::Repeat {
                counter_slot,
                count: p.count.min(u8::MAX as u32) as u8,
            }
        }
        NodeKind::Func(p) => Payload::Func {
            hash: hash::crc32(&p.func_name),
            arg: p.arg0,
        },
    })
}

fn read_payload(
    reader: &mut Reader<'_>,
    node_type: NodeType,
    offset: usize,
) -> Result<Payload, DecodeError> {
    Ok(match node_type {
        NodeType::Start => Payload::Start,
        NodeType::Wait => Payload::Wait {
            millis: reader.u16("wait duration")?,
        },
        NodeType::ObjDel => Payload::ObjDel {
            object: reader.u16("object id")?,
        },
        NodeType::ObjEvent => Payload::ObjEvent {
            object: reader.u16("object id")?,
            event_type: reader.u16("event type")?,
            value: reader.u32("event value")?,
        },
        NodeType::Compare => {
            let op = CompareOp::try_from(reader.u8("compare type")?).map_err(|_| {
                DecodeError::BadField {
                    offset,
                    what: "compare type",
                }
            })?;
            reader.u8("padding")?;
            Payload::Compare {
                op,
                a: reader.i32("compare operand")?,
                b: reader.i32("compare operand")?,
            }
        }
        NodeType::Value => Payload::Value(reader.u16("value")?),
        NodeType::Repeat => Payload::Repeat {
            counter_slot: reader.u8("counter slot")?,
            count: reader.u8("repeat count")?,
        },
        NodeType::Func => Payload::Func {
            hash: reader.u32("function hash")?,
            arg: reader.u32("function argument")?,
        },
    })
}

struct Reader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> Reader<'b> {
    fn take<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + N)
            .ok_or(DecodeError::Truncated {
                offset: self.pos,
                what,
            })?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos += N;
        Ok(buf)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take::<1>(what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, DecodeError> {
        self.take(what).map(u16::from_be_bytes)
    }

    fn i16(&mut self, what: &'static str) -> Result<i16, DecodeError> {
        self.take(what).map(i16::from_be_bytes)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        self.take(what).map(u32::from_be_bytes)
    }

    fn i32(&mut self, what: &'static str) -> Result<i32, DecodeError> {
        self.take(what).map(i32::from_be_bytes)
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, DecodeError> {
        self.take(what).map(u64::from_be_bytes)
    }
}
