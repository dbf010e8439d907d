//! Graph builder: turns a parsed syntax tree into a [`SyntaxGraph`].
//!
//! Walks the tree pre-order with an explicit work stack. A node whose kind
//! the config does not retain is pruned together with its whole subtree.

use petgraph::graph::NodeIndex;
use std::path::Path;
use tracing::{debug, info};

use super::engine::SyntaxGraph;
use super::info::node_info;
use crate::config::BuilderConfig;
use crate::error::Result;
use crate::parser::{parse_file, parse_source};
use crate::syntax::{FieldValue, SyntaxNode};

/// Pending work: a field value and the retained ancestor it attaches to.
enum Visit<'a> {
    Node(&'a SyntaxNode),
    Value(&'a FieldValue),
}

/// Builds syntax graphs under a fixed [`BuilderConfig`].
#[derive(Debug, Clone, Default)]
pub struct SyntaxGraphBuilder {
    config: BuilderConfig,
}

impl SyntaxGraphBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Read, parse and build the graph for one source file.
    pub fn build_file(&self, path: &Path) -> Result<SyntaxGraph> {
        let tree = parse_file(path)?;
        let graph = self.build_tree(&tree);
        info!(
            path = %path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built syntax graph"
        );
        Ok(graph)
    }

    pub fn build_source(&self, source: &str) -> Result<SyntaxGraph> {
        let tree = parse_source(source)?;
        Ok(self.build_tree(&tree))
    }

    /// Build from an already parsed tree. Never fails.
    pub fn build_tree(&self, root: &SyntaxNode) -> SyntaxGraph {
        let mut graph = SyntaxGraph::new();
        let mut stack: Vec<(Visit<'_>, Option<NodeIndex>)> = vec![(Visit::Node(root), None)];
        let mut pruned = 0usize;

        while let Some((visit, parent)) = stack.pop() {
            let node = match visit {
                Visit::Node(node) => node,
                Visit::Value(FieldValue::Node(node)) => node.as_ref(),
                Visit::Value(FieldValue::List(items)) => {
                    // Siblings share the parent; push reversed to pop in order.
                    for item in items.iter().rev() {
                        stack.push((Visit::Value(item), parent));
                    }
                    continue;
                }
                Visit::Value(FieldValue::Leaf(_) | FieldValue::Absent) => continue,
            };

            if !self.config.retains(node.kind) {
                pruned += 1;
                continue;
            }

            let idx = graph.add_node(node_info(node));
            if let Some(parent) = parent {
                graph.add_parent_edge(parent, idx);
            }
            for (_, value) in node.fields.iter().rev() {
                stack.push((Visit::Value(value), Some(idx)));
            }
        }

        debug!(
            nodes = graph.node_count(),
            pruned_subtrees = pruned,
            filtered = self.config.filtering_enabled,
            "graph assembled"
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AstGraphError;
    use crate::graph::filter::{AllowList, Preset, DEFINITION_KINDS};
    use crate::syntax::NodeKind;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    const SAMPLE: &str = r#"import os

class Store:
    def __init__(self, root):
        self.root = root

    def load(self, name):
        if name:
            for part in name.split('.'):
                print(part)
        return os.path.join(self.root, name)

async def fetch(client):
    async for chunk in client.stream():
        await client.ack(chunk)
    with open('log') as fh:
        fh.write('done')

def outer():
    def inner():
        return 1
    try:
        inner()
    except ValueError:
        pass
    while False:
        x = 1
"#;

    /// Count nodes the builder should keep, pruning at non-retained ancestors.
    fn expected_count(node: &SyntaxNode, config: &BuilderConfig) -> usize {
        fn count_value(value: &FieldValue, config: &BuilderConfig) -> usize {
            match value {
                FieldValue::Node(node) => expected_count(node, config),
                FieldValue::List(items) => items.iter().map(|v| count_value(v, config)).sum(),
                FieldValue::Leaf(_) | FieldValue::Absent => 0,
            }
        }
        if !config.retains(node.kind) {
            return 0;
        }
        1 + node
            .fields
            .iter()
            .map(|(_, value)| count_value(value, config))
            .sum::<usize>()
    }

    fn assert_well_formed(graph: &SyntaxGraph) {
        let ids: HashSet<Uuid> = graph.nodes().map(|n| n.id).collect();
        assert_eq!(ids.len(), graph.node_count(), "node ids must be distinct");
        for edge in graph.edges() {
            assert!(ids.contains(&edge.parent));
            assert!(ids.contains(&edge.child));
        }
        if !graph.is_empty() {
            assert_eq!(graph.edge_count(), graph.node_count() - 1);
        }
    }

    #[test]
    fn test_function_scenario_unfiltered() {
        let builder = SyntaxGraphBuilder::new(BuilderConfig::unfiltered());
        let graph = builder.build_source("def f():\n    return 1\n").unwrap();
        assert_well_formed(&graph);

        let module = graph.root().unwrap();
        assert_eq!(module.kind, NodeKind::Module);

        let function = graph
            .nodes()
            .find(|n| n.kind == NodeKind::FunctionDef)
            .unwrap();
        assert_eq!(function.label, "FunctionDef\n{'id': 'f'}");
        assert_eq!(graph.parent(function.id).map(|n| n.id), Some(module.id));

        let ret = graph.nodes().find(|n| n.kind == NodeKind::Return).unwrap();
        assert_eq!(graph.parent(ret.id).map(|n| n.id), Some(function.id));

        let constant = graph.nodes().find(|n| n.kind == NodeKind::Constant).unwrap();
        assert_eq!(constant.label, "Constant\n{'value': 1}");
        assert_eq!(graph.parent(constant.id).map(|n| n.id), Some(ret.id));
    }

    #[test]
    fn test_definitions_preset_prunes_assignment() {
        let builder = SyntaxGraphBuilder::new(BuilderConfig::preset(Preset::Definitions));
        let graph = builder.build_source("x = 1\n").unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.root().map(|n| n.kind), Some(NodeKind::Module));
    }

    #[test]
    fn test_empty_source_is_lone_module() {
        for source in ["", "   \n\n", "# nothing\n"] {
            for config in [BuilderConfig::unfiltered(), BuilderConfig::default()] {
                let graph = SyntaxGraphBuilder::new(config).build_source(source).unwrap();
                assert_eq!(graph.node_count(), 1, "source {:?}", source);
                assert_eq!(graph.edge_count(), 0);
            }
        }
    }

    #[test]
    fn test_syntax_error_yields_no_graph() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"print((1)\n").unwrap();
        let builder = SyntaxGraphBuilder::default();
        let err = builder.build_file(file.path()).unwrap_err();
        assert!(matches!(err, AstGraphError::Syntax(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyntaxGraphBuilder::default()
            .build_file(&dir.path().join("absent.py"))
            .unwrap_err();
        assert!(matches!(err, AstGraphError::NotFound(_)));
    }

    #[test]
    fn test_node_count_matches_retained_nodes() {
        let tree = parse_source(SAMPLE).unwrap();
        let configs = [
            BuilderConfig::unfiltered(),
            BuilderConfig::preset(Preset::Full),
            BuilderConfig::preset(Preset::Definitions),
            BuilderConfig::with_allow_list(AllowList::from_kinds([
                NodeKind::Module,
                NodeKind::Expr,
                NodeKind::Call,
            ])),
        ];
        for config in configs {
            let graph = SyntaxGraphBuilder::new(config.clone()).build_tree(&tree);
            assert_eq!(graph.node_count(), expected_count(&tree, &config));
            assert_well_formed(&graph);
            if config.filtering_enabled {
                assert!(graph.nodes().all(|n| config.allow_list.contains(n.kind)));
            }
        }
        assert_eq!(
            SyntaxGraphBuilder::new(BuilderConfig::unfiltered())
                .build_tree(&tree)
                .node_count(),
            tree.subtree_size()
        );
    }

    #[test]
    fn test_pruned_ancestor_hides_descendants() {
        // Methods never survive when their class is filtered out.
        let config = BuilderConfig::with_allow_list(AllowList::from_kinds([
            NodeKind::Module,
            NodeKind::FunctionDef,
        ]));
        let graph = SyntaxGraphBuilder::new(config)
            .build_source("class A:\n    def m(self):\n        pass\n\ndef top():\n    pass\n")
            .unwrap();
        let names: Vec<&str> = graph
            .nodes()
            .filter_map(|n| n.attributes.id.as_deref())
            .collect();
        assert_eq!(names, vec!["top"]);
    }

    #[test]
    fn test_definitions_skeleton() {
        let builder = SyntaxGraphBuilder::new(BuilderConfig::preset(Preset::Definitions));
        let graph = builder.build_source(SAMPLE).unwrap();
        assert!(graph.nodes().all(|n| DEFINITION_KINDS.contains(&n.kind)));

        let module = graph.root().unwrap();
        let top: Vec<String> = graph
            .children(module.id)
            .iter()
            .map(|n| n.label.clone())
            .collect();
        assert_eq!(
            top,
            vec![
                "ClassDef\n{'id': 'Store'}",
                "AsyncFunctionDef\n{'id': 'fetch'}",
                "FunctionDef\n{'id': 'outer'}",
            ]
        );

        let outer = graph
            .nodes()
            .find(|n| n.attributes.id.as_deref() == Some("outer"))
            .unwrap();
        let nested: Vec<Option<String>> = graph
            .children(outer.id)
            .iter()
            .map(|n| n.attributes.id.clone())
            .collect();
        assert_eq!(nested, vec![Some("inner".to_string())]);
    }

    #[test]
    fn test_full_preset_keeps_structure() {
        let builder = SyntaxGraphBuilder::default();
        let graph = builder.build_source(SAMPLE).unwrap();
        let kinds: HashSet<NodeKind> = graph.nodes().map(|n| n.kind).collect();
        for kind in [
            NodeKind::Module,
            NodeKind::ClassDef,
            NodeKind::FunctionDef,
            NodeKind::AsyncFunctionDef,
            NodeKind::AsyncFor,
            NodeKind::With,
            NodeKind::Try,
            NodeKind::ExceptHandler,
            NodeKind::While,
            NodeKind::Return,
        ] {
            assert!(kinds.contains(&kind), "{} missing", kind);
        }
        // Under `Expr`, which the preset does not keep.
        assert!(!kinds.contains(&NodeKind::Await));
        assert!(!kinds.contains(&NodeKind::Name));
    }

    #[test]
    fn test_rebuild_is_isomorphic() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let builder = SyntaxGraphBuilder::default();
        let first = builder.build_file(file.path()).unwrap();
        let second = builder.build_file(file.path()).unwrap();

        assert!(first.is_isomorphic_to(&second));
        let first_ids: HashSet<Uuid> = first.nodes().map(|n| n.id).collect();
        assert!(second.nodes().all(|n| !first_ids.contains(&n.id)));
    }

    #[test]
    fn test_identical_subtrees_get_distinct_ids() {
        let graph = SyntaxGraphBuilder::new(BuilderConfig::unfiltered())
            .build_source("x = 1\nx = 1\nx = 1\n")
            .unwrap();
        assert_well_formed(&graph);
        assert_eq!(graph.stats().kinds.get(&NodeKind::Assign), Some(&3));
    }

    #[test]
    fn test_module_excluded_gives_empty_graph() {
        let config = BuilderConfig::with_allow_list(AllowList::from_kinds([NodeKind::Assign]));
        let graph = SyntaxGraphBuilder::new(config).build_source("x = 1\n").unwrap();
        assert!(graph.is_empty());
        assert!(graph.root().is_none());
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let mut tree = SyntaxNode::new(NodeKind::Pass, Default::default());
        for _ in 0..100_000 {
            tree = SyntaxNode::new(NodeKind::If, Default::default())
                .with("body", FieldValue::nodes([tree]));
        }
        let graph = SyntaxGraphBuilder::new(BuilderConfig::unfiltered()).build_tree(&tree);
        assert_eq!(graph.node_count(), 100_001);
        drop(tree);
        drop(graph);
    }
}
