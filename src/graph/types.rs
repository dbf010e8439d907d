//! Core types for the syntax graph.
//!
//! Defines graph nodes, the parent edge kind, and the attribute mapping
//! pulled out of interesting syntax fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::syntax::{Literal, NodeKind};

/// The kind of an edge in the syntax graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Structural parent → child relation.
    Parent,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Parent => write!(f, "parent"),
        }
    }
}

/// Interesting fields of a syntax node, present only when the node has them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeAttributes {
    /// Identifier name (`Name.id`, or the name of a definition).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Literal value of a `Constant`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    /// Operator kind, e.g. `Add` for a `BinOp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<NodeKind>,
    /// Callee name when a `Call` invokes a plain name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl NodeAttributes {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.value.is_none() && self.operator.is_none() && self.function.is_none()
    }
}

impl fmt::Display for NodeAttributes {
    /// Formats like a Python dict: `{'id': 'f', 'value': 1}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<(&str, String)> = Vec::new();
        if let Some(id) = &self.id {
            entries.push(("id", Literal::Str(id.clone()).to_string()));
        }
        if let Some(value) = &self.value {
            entries.push(("value", value.to_string()));
        }
        if let Some(operator) = &self.operator {
            entries.push(("operator", Literal::Str(operator.to_string()).to_string()));
        }
        if let Some(function) = &self.function {
            entries.push(("function", Literal::Str(function.clone()).to_string()));
        }

        f.write_str("{")?;
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': {}", key, value)?;
        }
        f.write_str("}")
    }
}

/// A retained syntax node, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Fresh random identifier, unrelated to tree position.
    pub id: Uuid,
    pub kind: NodeKind,
    pub attributes: NodeAttributes,
    /// `kind`, or `kind` and the attributes on a second line.
    pub label: String,
    /// Hex color picked from the kind.
    pub color: &'static str,
}

impl GraphNode {
    /// Display size hint for renderers.
    pub const SIZE: u32 = 15;

    /// Hover text for renderers.
    pub fn title(&self) -> String {
        format!("type: {}\nattribute: {}", self.kind, self.attributes)
    }

    /// Equal in everything except the generated id.
    pub fn same_content(&self, other: &GraphNode) -> bool {
        self.kind == other.kind
            && self.attributes == other.attributes
            && self.label == other.label
            && self.color == other.color
    }
}

/// A directed `parent → child` relation between two graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub parent: Uuid,
    pub child: Uuid,
    pub kind: EdgeKind,
}
