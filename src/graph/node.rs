use crate::catalog::NodeType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Comparison performed by a Compare node. The discriminant is the persisted `compType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum CompareOp {
    #[default]
    Equal = 0,
    NotEqual = 1,
    Less = 2,
    LessEqual = 3,
    Greater = 4,
    GreaterEqual = 5,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Equal,
        CompareOp::NotEqual,
        CompareOp::Less,
        CompareOp::LessEqual,
        CompareOp::Greater,
        CompareOp::GreaterEqual,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        }
    }

    pub fn eval(self, a: i64, b: i64) -> bool {
        match self {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Less => a < b,
            CompareOp::LessEqual => a <= b,
            CompareOp::Greater => a > b,
            CompareOp::GreaterEqual => a >= b,
        }
    }
}

impl TryFrom<u8> for CompareOp {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        CompareOp::ALL
            .get(v as usize)
            .copied()
            .ok_or_else(|| format!("invalid compare type {}", v))
    }
}

impl From<CompareOp> for u8 {
    fn from(op: CompareOp) -> u8 {
        op as u8
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.symbol())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitProps {
    /// Duration in seconds.
    pub time: f32,
}

impl WaitProps {
    pub fn millis(&self) -> u64 {
        if self.time.is_finite() && self.time > 0.0 {
            (self.time * 1000.0) as u64
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjDelProps {
    /// Target object, `0` meaning the owning object.
    pub object_id: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjEventProps {
    pub object_id: u16,
    pub event_type: u16,
    pub event_value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompareProps {
    pub comp_type: CompareOp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueProps {
    pub value: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatProps {
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FuncProps {
    pub func_name: String,
    pub arg0: u32,
}

/// A node's type together with its type-specific properties.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    Wait(WaitProps),
    ObjDel(ObjDelProps),
    ObjEvent(ObjEventProps),
    Compare(CompareProps),
    Value(ValueProps),
    Repeat(RepeatProps),
    Func(FuncProps),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Start => NodeType::Start,
            NodeKind::Wait(_) => NodeType::Wait,
            NodeKind::ObjDel(_) => NodeType::ObjDel,
            NodeKind::ObjEvent(_) => NodeType::ObjEvent,
            NodeKind::Compare(_) => NodeType::Compare,
            NodeKind::Value(_) => NodeType::Value,
            NodeKind::Repeat(_) => NodeType::Repeat,
            NodeKind::Func(_) => NodeType::Func,
        }
    }

    pub fn with_defaults(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Start => NodeKind::Start,
            NodeType::Wait => NodeKind::Wait(WaitProps::default()),
            NodeType::ObjDel => NodeKind::ObjDel(ObjDelProps::default()),
            NodeType::ObjEvent => NodeKind::ObjEvent(ObjEventProps::default()),
            NodeType::Compare => NodeKind::Compare(CompareProps::default()),
            NodeType::Value => NodeKind::Value(ValueProps::default()),
            NodeType::Repeat => NodeKind::Repeat(RepeatProps::default()),
            NodeType::Func => NodeKind::Func(FuncProps::default()),
        }
    }

    /// Writes the persisted properties of this node into a JSON object.
    pub fn serialize_props(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let value = match self {
            NodeKind::Start => return Ok(Map::new()),
            NodeKind::Wait(p) => serde_json::to_value(p)?,
            NodeKind::ObjDel(p) => serde_json::to_value(p)?,
            NodeKind::ObjEvent(p) => serde_json::to_value(p)?,
            NodeKind::Compare(p) => serde_json::to_value(p)?,
            NodeKind::Value(p) => serde_json::to_value(p)?,
            NodeKind::Repeat(p) => serde_json::to_value(p)?,
            NodeKind::Func(p) => serde_json::to_value(p)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Reads properties for `node_type` from a JSON object. Missing keys take their defaults.
    pub fn deserialize_props(
        node_type: NodeType,
        props: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        let value = Value::Object(props);
        Ok(match node_type {
            NodeType::Start => NodeKind::Start,
            NodeType::Wait => NodeKind::Wait(serde_json::from_value(value)?),
            NodeType::ObjDel => NodeKind::ObjDel(serde_json::from_value(value)?),
            NodeType::ObjEvent => NodeKind::ObjEvent(serde_json::from_value(value)?),
            NodeType::Compare => NodeKind::Compare(serde_json::from_value(value)?),
            NodeType::Value => NodeKind::Value(serde_json::from_value(value)?),
            NodeType::Repeat => NodeKind::Repeat(serde_json::from_value(value)?),
            NodeType::Func => NodeKind::Func(serde_json::from_value(value)?),
        })
    }

    /// Editor title, reflecting the current properties where useful.
    pub fn title(&self) -> String {
        match self {
            NodeKind::Compare(p) => format!("{} Compare", p.comp_type),
            NodeKind::Func(p) if !p.func_name.is_empty() => {
                format!("{}({})", p.func_name, p.arg0)
            }
            other => other.node_type().name().to_string(),
        }
    }
}

/// A node placed in a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable identity; derived identifiers in generated code are built from it.
    pub uuid: u64,
    pub kind: NodeKind,
    pub position: [f32; 2],
}

impl Node {
    pub fn new(uuid: u64, kind: NodeKind, position: [f32; 2]) -> Self {
        Self {
            uuid,
            kind,
            position,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}
