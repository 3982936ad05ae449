use super::node::{Node, NodeKind};
use crate::catalog::{NodeType, PinKind};
use crate::error::GraphError;
use crate::hash;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Returned by `start` if a graph ever lacks its Start node.
static DETACHED_START: LazyLock<Node> = LazyLock::new(|| Node::new(0, NodeKind::Start, [0.0, 0.0]));

/// A directed connection from an output pin to an input pin.
///
/// Pin indices are positions in the node type's output/input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub from_node: u64,
    pub from_pin: u16,
    pub to_node: u64,
    pub to_pin: u16,
}

/// An artist-authored node graph.
///
/// Always holds exactly one Start node, the sole execution entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// An empty graph holding only a Start node.
    pub fn new() -> Self {
        let start = Node::new(hash::random_u64(), NodeKind::Start, [0.0, 0.0]);
        Self {
            nodes: vec![start],
            links: Vec::new(),
        }
    }

    /// Assembles a graph from loaded parts, checking identity and link endpoints.
    ///
    /// Pin kinds are not checked here; the editor enforces them when links are made.
    pub fn from_parts(nodes: Vec<Node>, links: Vec<Link>) -> Result<Self, GraphError> {
        let mut seen = AHashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.uuid) {
                return Err(GraphError::DuplicateUuid(node.uuid));
            }
        }

        let starts = nodes
            .iter()
            .filter(|n| n.node_type() == NodeType::Start)
            .count();
        if starts != 1 {
            return Err(GraphError::StartNodeCount(starts));
        }

        let graph = Self { nodes, links };
        for link in &graph.links {
            graph.check_pin(link.from_node, link.from_pin, true)?;
            graph.check_pin(link.to_node, link.to_pin, false)?;
        }
        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, uuid: u64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.uuid == uuid)
    }

    /// Replaces the properties of a node. The node type is fixed once placed, so its
    /// pins and links stay valid and the Start node stays unique.
    pub fn set_kind(&mut self, uuid: u64, kind: NodeKind) -> Result<(), GraphError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.uuid == uuid)
            .ok_or(GraphError::NodeNotFound(uuid))?;
        if node.node_type() != kind.node_type() {
            return Err(GraphError::NodeTypeChange {
                node_uuid: uuid,
                from: node.node_type(),
                to: kind.node_type(),
            });
        }
        node.kind = kind;
        Ok(())
    }

    pub fn set_position(&mut self, uuid: u64, position: [f32; 2]) -> Result<(), GraphError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.uuid == uuid)
            .ok_or(GraphError::NodeNotFound(uuid))?;
        node.position = position;
        Ok(())
    }

    pub fn start(&self) -> &Node {
        // Nodes are private and no operation adds, removes or retypes a Start node.
        self.nodes
            .iter()
            .find(|n| n.node_type() == NodeType::Start)
            .unwrap_or(&DETACHED_START)
    }

    /// Places a new node with default properties and a fresh UUID.
    pub fn add_node(&mut self, node_type: NodeType, position: [f32; 2]) -> u64 {
        self.add_kind(NodeKind::with_defaults(node_type), position)
    }

    /// Places a new node with the given properties and a fresh UUID.
    ///
    /// Adding a second Start node is not possible; the existing one is returned instead.
    pub fn add_kind(&mut self, kind: NodeKind, position: [f32; 2]) -> u64 {
        if kind == NodeKind::Start {
            return self.start().uuid;
        }
        let mut uuid = hash::random_u64();
        while self.node(uuid).is_some() {
            uuid = hash::random_u64();
        }
        self.nodes.push(Node::new(uuid, kind, position));
        uuid
    }

    /// Removes a node and every link touching it.
    pub fn remove_node(&mut self, uuid: u64) -> Result<Node, GraphError> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.uuid == uuid)
            .ok_or(GraphError::NodeNotFound(uuid))?;
        if self.nodes[idx].node_type() == NodeType::Start {
            return Err(GraphError::CannotRemoveStart);
        }
        self.links.retain(|l| l.from_node != uuid && l.to_node != uuid);
        Ok(self.nodes.remove(idx))
    }

    /// Connects two pins of the same kind.
    ///
    /// A Logic output drives a single successor and a Value input reads a single source,
    /// so linking either again replaces the previous link.
    pub fn link(
        &mut self,
        from_node: u64,
        from_pin: u16,
        to_node: u64,
        to_pin: u16,
    ) -> Result<(), GraphError> {
        let from = self.check_pin(from_node, from_pin, true)?;
        let to = self.check_pin(to_node, to_pin, false)?;
        if from != to {
            return Err(GraphError::PinKindMismatch { from, to });
        }

        match from {
            PinKind::Logic => self
                .links
                .retain(|l| !(l.from_node == from_node && l.from_pin == from_pin)),
            PinKind::Value => self
                .links
                .retain(|l| !(l.to_node == to_node && l.to_pin == to_pin)),
        }

        self.links.push(Link {
            from_node,
            from_pin,
            to_node,
            to_pin,
        });
        Ok(())
    }

    /// Removes a specific link. Returns whether it existed.
    pub fn unlink(&mut self, link: &Link) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l != link);
        self.links.len() != before
    }

    /// All links leaving the given output pin, in link order.
    pub fn links_from(&self, uuid: u64, pin: u16) -> impl Iterator<Item = &Link> {
        self.links
            .iter()
            .filter(move |l| l.from_node == uuid && l.from_pin == pin)
    }

    /// The first link arriving at the given input pin.
    pub fn link_into(&self, uuid: u64, pin: u16) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.to_node == uuid && l.to_pin == pin)
    }

    /// Number of Logic links arriving at a node.
    pub fn logic_in_degree(&self, uuid: u64) -> usize {
        self.links
            .iter()
            .filter(|l| {
                l.to_node == uuid
                    && self.pin_kind(l.to_node, l.to_pin, false) == Some(PinKind::Logic)
            })
            .count()
    }

    pub fn pin_kind(&self, uuid: u64, pin: u16, output: bool) -> Option<PinKind> {
        let sig = self.node(uuid)?.node_type().signature();
        let def = if output {
            sig.output(pin)
        } else {
            sig.input(pin)
        };
        def.map(|p| p.kind)
    }

    fn check_pin(&self, uuid: u64, pin: u16, output: bool) -> Result<PinKind, GraphError> {
        if self.node(uuid).is_none() {
            return Err(GraphError::NodeNotFound(uuid));
        }
        self.pin_kind(uuid, pin, output)
            .ok_or(GraphError::PinOutOfRange {
                node_uuid: uuid,
                direction: if output { "output" } else { "input" },
                pin,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{RepeatProps, ValueProps};

    #[test]
    fn new_graph_has_one_start() {
        let graph = Graph::new();
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.start().node_type(), NodeType::Start);
    }

    #[test]
    fn link_rejects_kind_mismatch() {
        let mut graph = Graph::new();
        let start = graph.start().uuid;
        let cmp = graph.add_node(NodeType::Compare, [0.0, 0.0]);
        let err = graph.link(start, 0, cmp, 1).unwrap_err();
        assert_eq!(
            err,
            GraphError::PinKindMismatch {
                from: PinKind::Logic,
                to: PinKind::Value
            }
        );
        assert!(graph.link(start, 0, cmp, 0).is_ok());
    }

    #[test]
    fn logic_output_keeps_single_link() {
        let mut graph = Graph::new();
        let start = graph.start().uuid;
        let a = graph.add_node(NodeType::Wait, [0.0, 0.0]);
        let b = graph.add_node(NodeType::ObjDel, [0.0, 0.0]);
        graph.link(start, 0, a, 0).unwrap();
        graph.link(start, 0, b, 0).unwrap();
        let targets: Vec<_> = graph.links_from(start, 0).map(|l| l.to_node).collect();
        assert_eq!(targets, vec![b]);
    }

    #[test]
    fn value_output_fans_out() {
        let mut graph = Graph::new();
        let val = graph.add_kind(NodeKind::Value(ValueProps { value: 3 }), [0.0, 0.0]);
        let cmp = graph.add_node(NodeType::Compare, [0.0, 0.0]);
        graph.link(val, 0, cmp, 1).unwrap();
        graph.link(val, 0, cmp, 2).unwrap();
        assert_eq!(graph.links().len(), 2);
    }

    #[test]
    fn remove_node_drops_links() {
        let mut graph = Graph::new();
        let start = graph.start().uuid;
        let rep = graph.add_kind(NodeKind::Repeat(RepeatProps { count: 2 }), [0.0, 0.0]);
        graph.link(start, 0, rep, 0).unwrap();
        graph.link(rep, 0, rep, 0).unwrap();
        graph.remove_node(rep).unwrap();
        assert!(graph.links().is_empty());
        assert_eq!(graph.remove_node(start), Err(GraphError::CannotRemoveStart));
    }

    #[test]
    fn node_type_is_fixed_after_placement() {
        let mut graph = Graph::new();
        let start = graph.start().uuid;
        let err = graph
            .set_kind(start, NodeKind::Value(ValueProps { value: 1 }))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::NodeTypeChange {
                node_uuid: start,
                from: NodeType::Start,
                to: NodeType::Value
            }
        );
        assert_eq!(graph.remove_node(start), Err(GraphError::CannotRemoveStart));
        assert_eq!(graph.start().uuid, start);

        let rep = graph.add_node(NodeType::Repeat, [0.0, 0.0]);
        graph
            .set_kind(rep, NodeKind::Repeat(RepeatProps { count: 4 }))
            .unwrap();
        graph.set_position(rep, [10.0, 20.0]).unwrap();
        let node = graph.node(rep).unwrap();
        assert_eq!(node.kind, NodeKind::Repeat(RepeatProps { count: 4 }));
        assert_eq!(node.position, [10.0, 20.0]);
        assert_eq!(
            graph.set_position(99, [0.0, 0.0]),
            Err(GraphError::NodeNotFound(99))
        );
    }

    #[test]
    fn from_parts_requires_single_start() {
        let err = Graph::from_parts(Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, GraphError::StartNodeCount(0));
    }
}
