//! The graph asset format written by the editor:
//! `{ nodes: [{type, uuid, position, ...properties}], links: [{fromNode, fromPin, toNode, toPin}] }`.

use super::definition::{Graph, Link};
use super::node::{Node, NodeKind};
use crate::catalog::NodeType;
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    type_id: u32,
    uuid: u64,
    #[serde(default)]
    position: [f32; 2],
    #[serde(flatten)]
    properties: Map<String, Value>,
}

impl Graph {
    /// Parses a graph asset. Unknown node types are an error.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let raw: RawGraph =
            serde_json::from_str(json).map_err(|e| GraphError::Json(e.to_string()))?;

        let nodes = raw
            .nodes
            .into_iter()
            .map(|raw_node| {
                let node_type =
                    NodeType::from_id(raw_node.type_id).ok_or(GraphError::UnknownNodeType {
                        node_uuid: raw_node.uuid,
                        type_id: raw_node.type_id,
                    })?;
                let kind = NodeKind::deserialize_props(node_type, raw_node.properties).map_err(
                    |e| GraphError::Json(format!("node {:016X}: {}", raw_node.uuid, e)),
                )?;
                Ok(Node::new(raw_node.uuid, kind, raw_node.position))
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        Graph::from_parts(nodes, raw.links)
    }

    /// Writes the graph asset as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        let nodes = self
            .nodes()
            .iter()
            .map(|node| {
                let properties = node
                    .kind
                    .serialize_props()
                    .map_err(|e| GraphError::Json(e.to_string()))?;
                Ok(RawNode {
                    type_id: node.node_type().id() as u32,
                    uuid: node.uuid,
                    position: node.position,
                    properties,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        let raw = RawGraph {
            nodes,
            links: self.links().to_vec(),
        };
        serde_json::to_string_pretty(&raw).map_err(|e| GraphError::Json(e.to_string()))
    }
}
