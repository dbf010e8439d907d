//! Syntax graph module: the graph data model, node-info extraction,
//! color and retention policy, the builder, and directory scanning.

pub mod builder;
pub mod color;
pub mod engine;
pub mod filter;
pub mod info;
pub mod scan;
pub mod types;

pub use builder::SyntaxGraphBuilder;
pub use color::{node_color, COLOR_TABLE, DEFAULT_COLOR};
pub use engine::{GraphStats, SyntaxGraph};
pub use filter::{AllowList, Preset, DEFINITION_KINDS, FULL_STRUCTURE_KINDS};
pub use info::{extract_attributes, node_info};
pub use scan::{python_files, scan_directory, FileGraph};
pub use types::{EdgeKind, GraphEdge, GraphNode, NodeAttributes};
