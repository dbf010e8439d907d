//! Python syntax tree in the shape of the standard `ast` module.
//!
//! Every node carries its kind and its fields in declaration order. A field
//! holds a child node, a list of values, a primitive leaf, or nothing.

pub mod kind;
pub mod node;

pub use kind::NodeKind;
pub use node::{FieldValue, Literal, Span, SyntaxNode};
