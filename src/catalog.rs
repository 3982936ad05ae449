//! The node catalog: every node type the editor can place, with its pin layout.
//!
//! The set is closed. A node's stable integer id is what gets persisted in graph
//! JSON and in legacy binary records, so ids must never be reordered.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The kind of a pin. Links may only join pins of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinKind {
    /// Control flow: decides what runs next.
    Logic,
    /// Data: carries a number between nodes.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinDef {
    pub name: &'static str,
    pub kind: PinKind,
}

/// Pin layout of a node type, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSignature {
    pub inputs: &'static [PinDef],
    pub outputs: &'static [PinDef],
}

impl NodeSignature {
    pub fn input(&self, idx: u16) -> Option<&'static PinDef> {
        self.inputs.get(idx as usize)
    }

    pub fn output(&self, idx: u16) -> Option<&'static PinDef> {
        self.outputs.get(idx as usize)
    }

    pub fn count(pins: &[PinDef], kind: PinKind) -> usize {
        pins.iter().filter(|p| p.kind == kind).count()
    }

    pub fn logic_outputs(&self) -> usize {
        Self::count(self.outputs, PinKind::Logic)
    }

    pub fn value_inputs(&self) -> usize {
        Self::count(self.inputs, PinKind::Value)
    }
}

/// Static description of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub node_type: NodeType,
    pub name: &'static str,
    /// Header color in the editor, RGBA.
    pub color: [u8; 4],
    pub signature: NodeSignature,
}

macro_rules! pins {
    ( $( ($name:expr, $kind:ident) ),* $(,)? ) => {
        &[ $( PinDef { name: $name, kind: PinKind::$kind } ),* ]
    };
}

/// Defines `NodeType`, its id conversions and the backing catalog table in one place.
macro_rules! define_node_catalog {
    ( $( ($variant:ident = $id:expr, $name:expr, $color:expr, in: [$($ins:tt)*], out: [$($outs:tt)*]) ),* $(,)? ) => {
        /// Identifier of a node type. The discriminant is the persisted type id.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum NodeType {
            $( $variant = $id, )*
        }

        static CATALOG: &[CatalogEntry] = &[
            $(
                CatalogEntry {
                    node_type: NodeType::$variant,
                    name: $name,
                    color: $color,
                    signature: NodeSignature {
                        inputs: pins!($($ins)*),
                        outputs: pins!($($outs)*),
                    },
                },
            )*
        ];

        impl NodeType {
            pub const ALL: &'static [NodeType] = &[ $( NodeType::$variant, )* ];

            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $( $id => Some(NodeType::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

define_node_catalog! {
    (Start = 0, "Start", [0xEE, 0xEE, 0xEE, 0xFF],
        in: [],
        out: [("Init", Logic), ("Event", Logic), ("Collision", Logic)]),
    (Wait = 1, "Wait", [90, 191, 93, 255],
        in: [("", Logic)],
        out: [("", Logic)]),
    (ObjDel = 2, "Delete Object", [191, 90, 93, 255],
        in: [("", Logic)],
        out: [("", Logic)]),
    (ObjEvent = 3, "Send Event", [90, 191, 93, 255],
        in: [("", Logic)],
        out: [("", Logic)]),
    (Compare = 4, "Compare", [0xFF, 0x99, 0x55, 0xFF],
        in: [("", Logic), ("A", Value), ("B", Value)],
        out: [("True", Logic), ("False", Logic)]),
    (Value = 5, "Value", [0xFF, 0x99, 0x55, 0xFF],
        in: [],
        out: [("", Value)]),
    (Repeat = 6, "Repeat", [90, 191, 93, 255],
        in: [("", Logic)],
        out: [("Loop", Logic), ("Exit", Logic)]),
    (Func = 7, "Function", [90, 191, 93, 255],
        in: [("", Logic)],
        out: [("", Logic), ("", Value)]),
}

impl NodeType {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn signature(self) -> &'static NodeSignature {
        &self.entry().signature
    }
}

/// All node types sorted by display name, as presented in the editor's "add node" menu.
pub fn sorted_by_name() -> Vec<NodeType> {
    NodeType::ALL
        .iter()
        .copied()
        .sorted_by_key(|t| t.name())
        .collect()
}
