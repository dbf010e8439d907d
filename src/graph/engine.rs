//! The syntax graph store.
//!
//! Uses petgraph to hold retained nodes and their parent edges, with an
//! id index for lookups by node identifier.

use petgraph::algo::is_isomorphic_matching;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::types::{EdgeKind, GraphEdge, GraphNode};
use crate::syntax::NodeKind;

/// A directed tree of retained syntax nodes.
#[derive(Debug)]
pub struct SyntaxGraph {
    graph: DiGraph<GraphNode, EdgeKind>,
    /// Index: node id -> node index.
    id_index: HashMap<Uuid, NodeIndex>,
}

impl SyntaxGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
        }
    }

    /// Access the underlying petgraph, for renderers.
    pub fn inner_graph(&self) -> &DiGraph<GraphNode, EdgeKind> {
        &self.graph
    }

    // ─── Construction ───────────────────────────────────────────

    pub(crate) fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    pub(crate) fn add_parent_edge(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.graph.add_edge(parent, child, EdgeKind::Parent);
    }

    // ─── Queries ────────────────────────────────────────────────

    /// The first node added, normally the `Module`.
    pub fn root(&self) -> Option<&GraphNode> {
        self.graph.node_weight(NodeIndex::new(0))
    }

    pub fn node(&self, id: Uuid) -> Option<&GraphNode> {
        self.id_index.get(&id).and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Nodes in pre-order, the order they were retained.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in the order they were added.
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.graph.edge_references().map(|edge| GraphEdge {
            parent: self.graph[edge.source()].id,
            child: self.graph[edge.target()].id,
            kind: *edge.weight(),
        })
    }

    /// Direct children of a node, in source order.
    pub fn children(&self, id: Uuid) -> Vec<&GraphNode> {
        let Some(&idx) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort();
        children.into_iter().map(|child| &self.graph[child]).collect()
    }

    pub fn parent(&self, id: Uuid) -> Option<&GraphNode> {
        let &idx = self.id_index.get(&id)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|parent| &self.graph[parent])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Summary counts for the graph.
    pub fn stats(&self) -> GraphStats {
        let mut kinds = BTreeMap::new();
        for node in self.graph.node_weights() {
            *kinds.entry(node.kind).or_insert(0) += 1;
        }

        let mut max_depth = 0;
        if !self.is_empty() {
            let mut stack = vec![(NodeIndex::new(0), 0usize)];
            while let Some((idx, depth)) = stack.pop() {
                max_depth = max_depth.max(depth);
                for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                    stack.push((child, depth + 1));
                }
            }
        }

        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            max_depth,
            kinds,
        }
    }

    /// Same shape and node content, ignoring the generated ids.
    pub fn is_isomorphic_to(&self, other: &SyntaxGraph) -> bool {
        self.node_count() == other.node_count()
            && self.edge_count() == other.edge_count()
            && is_isomorphic_matching(
                &self.graph,
                &other.graph,
                |a: &GraphNode, b: &GraphNode| a.same_content(b),
                |a: &EdgeKind, b: &EdgeKind| a == b,
            )
    }
}

impl Default for SyntaxGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for SyntaxGraph {
    /// `{"nodes": [...], "edges": [...]}`, the hand-off format for renderers.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nodes: Vec<&GraphNode> = self.nodes().collect();
        let edges: Vec<GraphEdge> = self.edges().collect();
        let mut state = serializer.serialize_struct("SyntaxGraph", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }
}

/// Statistics about a syntax graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Edges on the longest root-to-leaf path.
    pub max_depth: usize,
    pub kinds: BTreeMap<NodeKind, usize>,
}
