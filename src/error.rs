use crate::catalog::{NodeType, PinKind};
use thiserror::Error;

/// Errors raised while editing or loading a graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Failed to parse graph JSON: {0}")]
    Json(String),

    #[error("Node {node_uuid:016X} has an unknown type id {type_id}")]
    UnknownNodeType { node_uuid: u64, type_id: u32 },

    #[error("Node {0:016X} does not exist in the graph")]
    NodeNotFound(u64),

    #[error("Node {node_uuid:016X} has no {direction} pin {pin}")]
    PinOutOfRange {
        node_uuid: u64,
        direction: &'static str,
        pin: u16,
    },

    #[error("Cannot link a {from:?} pin to a {to:?} pin")]
    PinKindMismatch { from: PinKind, to: PinKind },

    #[error("Node UUID {0:016X} is used more than once")]
    DuplicateUuid(u64),

    #[error("Graph must contain exactly one Start node, found {0}")]
    StartNodeCount(usize),

    #[error("The Start node cannot be removed")]
    CannotRemoveStart,

    #[error("Node {node_uuid:016X} is a {from:?} node and cannot become a {to:?} node")]
    NodeTypeChange {
        node_uuid: u64,
        from: NodeType,
        to: NodeType,
    },
}

/// Errors that abort the build of one graph asset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Asset '{asset}': {source}")]
    Graph {
        asset: String,
        #[source]
        source: GraphError,
    },

    #[error(
        "Asset '{asset}': node {missing_uuid:016X} not found, required by a link from node {source_uuid:016X}"
    )]
    NodeNotFound {
        asset: String,
        missing_uuid: u64,
        source_uuid: u64,
    },

    #[error("Asset '{asset}': node {node_uuid:016X} needs more than {limit} {what} slots")]
    TooManySlots {
        asset: String,
        node_uuid: u64,
        what: &'static str,
        limit: usize,
    },

    #[error("Asset '{asset}': {what} of node {node_uuid:016X} does not fit a packed record")]
    LegacyOverflow {
        asset: String,
        node_uuid: u64,
        what: &'static str,
    },
}

/// Errors raised while decoding a legacy packed node blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Blob ended at byte {offset} while reading {what}")]
    Truncated { offset: usize, what: &'static str },

    #[error("Record at byte {offset} has unknown type tag {tag}")]
    UnknownTypeTag { offset: usize, tag: u8 },

    #[error("Record at byte {offset} points to byte {target}, which is not a record start")]
    BadOffset { offset: usize, target: i64 },

    #[error("Record at byte {offset} has an invalid {what}")]
    BadField { offset: usize, what: &'static str },
}

/// Errors raised while saving or loading a compiled script table.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Could not access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Encode(String),

    #[error("Deserialization failed: {0}")]
    Decode(String),
}
