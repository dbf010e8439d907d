//! Kind → color rendering hints.

use crate::syntax::NodeKind;

/// Color for kinds outside [`COLOR_TABLE`].
pub const DEFAULT_COLOR: &str = "#000000";

/// Fixed colors for the kinds worth telling apart at a glance.
pub const COLOR_TABLE: &[(NodeKind, &str)] = &[
    (NodeKind::Module, "#1f77b4"),
    (NodeKind::Name, "#ff7f0e"),
    (NodeKind::Constant, "#2ca02c"),
    (NodeKind::Assign, "#d62728"),
    (NodeKind::If, "#9467bd"),
    (NodeKind::For, "#8c564b"),
    (NodeKind::FunctionDef, "#e377c2"),
    (NodeKind::BinOp, "#7f7f7f"),
    (NodeKind::Call, "#bcbd22"),
    (NodeKind::Compare, "#17becf"),
    (NodeKind::ClassDef, "#4CAF50"),
    (NodeKind::AsyncFunctionDef, "#FF9800"),
];

pub fn node_color(kind: NodeKind) -> &'static str {
    COLOR_TABLE
        .iter()
        .find(|(known, _)| *known == kind)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}
