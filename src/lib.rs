//! # astgraph
//!
//! Turns a Python source file into a directed graph of its syntax tree,
//! ready for an interactive renderer.
//!
//! Each retained syntax node becomes a [`GraphNode`] with a fresh id, a
//! label, a color and the interesting attributes of the node (identifier,
//! literal value, operator, callee). Edges run parent → child. With filtering
//! enabled only kinds in the allow-list are kept, and a node outside the
//! list is pruned together with its whole subtree.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use astgraph::{BuilderConfig, Preset, SyntaxGraphBuilder};
//! use std::path::Path;
//!
//! let builder = SyntaxGraphBuilder::new(BuilderConfig::preset(Preset::Definitions));
//! let graph = builder.build_file(Path::new("app.py"))?;
//! for node in graph.nodes() {
//!     println!("{}", node.label);
//! }
//! # Ok::<(), astgraph::AstGraphError>(())
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod syntax;

// Re-exports for convenience
pub use config::{AstGraphConfig, BuilderConfig};
pub use error::{AstGraphError, Result, SyntaxDiagnostic};

// Graph re-exports
pub use graph::{
    scan_directory, AllowList, EdgeKind, FileGraph, GraphEdge, GraphNode, GraphStats,
    NodeAttributes, Preset, SyntaxGraph, SyntaxGraphBuilder,
};
pub use parser::{parse_file, parse_source};
pub use syntax::{FieldValue, Literal, NodeKind, Span, SyntaxNode};
