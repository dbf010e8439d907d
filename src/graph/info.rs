//! Node-info extraction: kind, attributes, label and color for one syntax node.

use uuid::Uuid;

use super::color::node_color;
use super::types::{GraphNode, NodeAttributes};
use crate::syntax::{FieldValue, NodeKind, SyntaxNode};

/// Build the graph node for `node` with a fresh id.
pub fn node_info(node: &SyntaxNode) -> GraphNode {
    let attributes = extract_attributes(node);
    let label = if attributes.is_empty() {
        node.kind.to_string()
    } else {
        format!("{}\n{}", node.kind, attributes)
    };
    GraphNode {
        id: Uuid::new_v4(),
        kind: node.kind,
        attributes,
        label,
        color: node_color(node.kind),
    }
}

/// Pull out the fields worth showing. Fields the node lacks are skipped.
pub fn extract_attributes(node: &SyntaxNode) -> NodeAttributes {
    let id = match node.kind {
        NodeKind::FunctionDef | NodeKind::AsyncFunctionDef | NodeKind::ClassDef => {
            node.str_field("name")
        }
        _ => node.str_field("id"),
    };

    let value = match node.kind {
        NodeKind::Constant => node.field("value").and_then(FieldValue::as_literal).cloned(),
        _ => None,
    };

    let function = match node.kind {
        NodeKind::Call => node
            .child("func")
            .filter(|func| func.kind == NodeKind::Name)
            .and_then(|func| func.str_field("id")),
        _ => None,
    };

    NodeAttributes {
        id: id.map(str::to_string),
        value,
        operator: node.child("op").map(|op| op.kind),
        function: function.map(str::to_string),
    }
}
