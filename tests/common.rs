//! Common test utilities for building graphs with fixed UUIDs.
use kairo::graph::*;
use kairo::prelude::*;

pub const START: u64 = 0x1;

#[allow(dead_code)]
pub fn node(uuid: u64, kind: NodeKind) -> Node {
    Node::new(uuid, kind, [0.0, 0.0])
}

#[allow(dead_code)]
pub fn link(from_node: u64, from_pin: u16, to_node: u64, to_pin: u16) -> Link {
    Link {
        from_node,
        from_pin,
        to_node,
        to_pin,
    }
}

/// `Start -> Wait(seconds) -> ObjDel(self)`
#[allow(dead_code)]
pub fn wait_then_delete(seconds: f32) -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x2, NodeKind::Wait(WaitProps { time: seconds })),
            node(0x3, NodeKind::ObjDel(ObjDelProps { object_id: 0 })),
        ],
        vec![link(START, 0, 0x2, 0), link(0x2, 0, 0x3, 0)],
    )
    .unwrap()
}

/// `Start -> Compare(a op b)`; True sends event type 1 to self, False sends type 2.
#[allow(dead_code)]
pub fn compare_values(a: u16, op: CompareOp, b: u16) -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x10, NodeKind::Compare(CompareProps { comp_type: op })),
            node(0x11, NodeKind::Value(ValueProps { value: a })),
            node(0x12, NodeKind::Value(ValueProps { value: b })),
            node(0x13, send_event(0, 1, 0)),
            node(0x14, send_event(0, 2, 0)),
        ],
        vec![
            link(START, 0, 0x10, 0),
            link(0x11, 0, 0x10, 1),
            link(0x12, 0, 0x10, 2),
            link(0x10, 0, 0x13, 0),
            link(0x10, 1, 0x14, 0),
        ],
    )
    .unwrap()
}

/// `Start -> Repeat(count)`, Loop calls `tick(7)` and returns to the Repeat, Exit deletes self.
#[allow(dead_code)]
pub fn repeat_calls(count: u32) -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x20, NodeKind::Repeat(RepeatProps { count })),
            node(
                0x21,
                NodeKind::Func(FuncProps {
                    func_name: "tick".to_string(),
                    arg0: 7,
                }),
            ),
            node(0x22, NodeKind::ObjDel(ObjDelProps { object_id: 0 })),
        ],
        vec![
            link(START, 0, 0x20, 0),
            link(0x20, 0, 0x21, 0),
            link(0x21, 0, 0x20, 0),
            link(0x20, 1, 0x22, 0),
        ],
    )
    .unwrap()
}

/// `Start -> Repeat(count)`, Loop waits `secs` then sends event 3 to self before
/// returning to the Repeat, Exit deletes self.
#[allow(dead_code)]
pub fn repeat_with_wait(count: u32, secs: f32) -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x70, NodeKind::Repeat(RepeatProps { count })),
            node(0x71, NodeKind::Wait(WaitProps { time: secs })),
            node(0x72, send_event(0, 3, 0)),
            node(0x73, NodeKind::ObjDel(ObjDelProps { object_id: 0 })),
        ],
        vec![
            link(START, 0, 0x70, 0),
            link(0x70, 0, 0x71, 0),
            link(0x71, 0, 0x72, 0),
            link(0x72, 0, 0x70, 0),
            link(0x70, 1, 0x73, 0),
        ],
    )
    .unwrap()
}

/// `Start -> double(21) -> Compare(result >= 42)`; True sends event 1, False event 2.
#[allow(dead_code)]
pub fn function_result_compare() -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(
                0x30,
                NodeKind::Func(FuncProps {
                    func_name: "double".to_string(),
                    arg0: 21,
                }),
            ),
            node(
                0x31,
                NodeKind::Compare(CompareProps {
                    comp_type: CompareOp::GreaterEqual,
                }),
            ),
            node(0x32, NodeKind::Value(ValueProps { value: 42 })),
            node(0x33, send_event(0, 1, 0)),
            node(0x34, send_event(0, 2, 0)),
        ],
        vec![
            link(START, 0, 0x30, 0),
            link(0x30, 0, 0x31, 0),
            link(0x30, 1, 0x31, 1),
            link(0x32, 0, 0x31, 2),
            link(0x31, 0, 0x33, 0),
            link(0x31, 1, 0x34, 0),
        ],
    )
    .unwrap()
}

/// Init waits `seconds`; Event sends event type 5 with value 9 to self.
#[allow(dead_code)]
pub fn wait_and_echo(seconds: f32) -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x40, NodeKind::Wait(WaitProps { time: seconds })),
            node(0x41, send_event(0, 5, 9)),
        ],
        vec![link(START, 0, 0x40, 0), link(START, 1, 0x41, 0)],
    )
    .unwrap()
}

/// Init sends event type 1 to `target`.
#[allow(dead_code)]
pub fn ping(target: u16) -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x50, send_event(target, 1, 0)),
        ],
        vec![link(START, 0, 0x50, 0)],
    )
    .unwrap()
}

/// Nothing on Init; Event deletes self.
#[allow(dead_code)]
pub fn delete_on_event() -> Graph {
    Graph::from_parts(
        vec![
            node(START, NodeKind::Start),
            node(0x60, NodeKind::ObjDel(ObjDelProps { object_id: 0 })),
        ],
        vec![link(START, 1, 0x60, 0)],
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn send_event(object_id: u16, event_type: u16, event_value: u32) -> NodeKind {
    NodeKind::ObjEvent(ObjEventProps {
        object_id,
        event_type,
        event_value,
    })
}

#[allow(dead_code)]
pub fn compile(graph: Graph, uuid: u64, functions: &FunctionRegistry) -> CompiledUnit {
    Compiler::builder(graph)
        .with_asset_uuid(uuid)
        .with_asset_name(&format!("asset_{:X}", uuid))
        .with_functions(functions)
        .build()
        .compile()
        .unwrap()
}

/// A table holding one unit per graph, with UUIDs 100, 200, ... so indices follow input order.
#[allow(dead_code)]
pub fn table_of(graphs: Vec<Graph>, functions: &FunctionRegistry) -> ScriptTable {
    let mut table = ScriptTable::new();
    for (i, graph) in graphs.into_iter().enumerate() {
        table.add(compile(graph, 100 * (i as u64 + 1), functions));
    }
    table
}

/// The editor's JSON form of `wait_then_delete(0.5)`.
#[allow(dead_code)]
pub const WAIT_THEN_DELETE_JSON: &str = r#"{
  "nodes": [
    { "type": 0, "uuid": 1, "position": [0.0, 0.0] },
    { "type": 1, "uuid": 2, "position": [0.0, 0.0], "time": 0.5 },
    { "type": 2, "uuid": 3, "position": [0.0, 0.0], "objectId": 0 }
  ],
  "links": [
    { "fromNode": 1, "fromPin": 0, "toNode": 2, "toPin": 0 },
    { "fromNode": 2, "fromPin": 0, "toNode": 3, "toPin": 0 }
  ]
}"#;
