//! Tests for the packed binary record format.
mod common;
use common::*;
use kairo::error::DecodeError;
use kairo::graph::CompareOp;
use kairo::legacy::{self, HEADER_LEN, Payload};
use kairo::prelude::*;

#[test]
fn test_pack_linear_graph() {
    let graph = wait_then_delete(0.5);
    let unit = compile(graph.clone(), 0xFEED, &FunctionRegistry::new());
    let bytes = legacy::encode(&graph, &unit).unwrap();

    // Start: 2 + 3 offsets, Wait: 2 + 1 offset + u16, ObjDel: same as Wait
    assert_eq!(bytes.len(), HEADER_LEN + 8 + 6 + 6);
    assert_eq!(&bytes[..8], &0xFEEDu64.to_be_bytes());

    let blob = legacy::decode(&bytes).unwrap();
    assert_eq!(blob.uuid, 0xFEED);
    assert_eq!(blob.stack_size, unit.stack_size);

    let types: Vec<NodeType> = blob.nodes.iter().map(|n| n.node_type).collect();
    assert_eq!(types, vec![NodeType::Start, NodeType::Wait, NodeType::ObjDel]);
    assert_eq!(blob.nodes[0].successors, vec![Some(1), None, None]);
    assert_eq!(blob.nodes[1].payload, Payload::Wait { millis: 500 });
    assert_eq!(blob.nodes[2].successors, vec![None]);
}

#[test]
fn test_pack_loop_uses_backward_offset() {
    let graph = repeat_calls(300);
    let unit = compile(graph.clone(), 1, &FunctionRegistry::new());
    let bytes = legacy::encode(&graph, &unit).unwrap();
    let blob = legacy::decode(&bytes).unwrap();

    let types: Vec<NodeType> = blob.nodes.iter().map(|n| n.node_type).collect();
    assert_eq!(
        types,
        vec![NodeType::Start, NodeType::Repeat, NodeType::Func, NodeType::ObjDel]
    );
    assert_eq!(blob.nodes[1].successors, vec![Some(2), Some(3)]);
    assert_eq!(blob.nodes[2].successors, vec![Some(1)]);
    // The count saturates to the record's byte.
    assert_eq!(
        blob.nodes[1].payload,
        Payload::Repeat {
            counter_slot: 0,
            count: 255
        }
    );
    assert_eq!(
        blob.nodes[2].payload,
        Payload::Func {
            hash: kairo::hash::crc32("tick"),
            arg: 7
        }
    );

    // Func record at byte 28 points back to the Repeat record at byte 20.
    assert_eq!(blob.nodes[2].offset, 28);
    assert_eq!(&bytes[30..32], &(-8i16).to_be_bytes());
}

#[test]
fn test_pack_compare_embeds_constants() {
    let graph = compare_values(5, CompareOp::LessEqual, 9);
    let unit = compile(graph.clone(), 2, &FunctionRegistry::new());
    let blob = legacy::decode(&legacy::encode(&graph, &unit).unwrap()).unwrap();

    assert_eq!(
        blob.nodes[1].payload,
        Payload::Compare {
            op: CompareOp::LessEqual,
            a: 5,
            b: 9
        }
    );
    let true_arm = blob.successor(1, 0).map(|n| n.payload.clone());
    assert_eq!(
        true_arm,
        Some(Payload::ObjEvent {
            object: 0,
            event_type: 1,
            value: 0
        })
    );
    assert!(blob.successor(1, 1).is_some());
    assert!(blob.successor(1, 2).is_none());
}

#[test]
fn test_decode_truncated_blob() {
    let graph = wait_then_delete(0.5);
    let unit = compile(graph.clone(), 3, &FunctionRegistry::new());
    let bytes = legacy::encode(&graph, &unit).unwrap();
    let err = legacy::decode(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }));
}
