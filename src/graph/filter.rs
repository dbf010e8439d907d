//! Retention allow-lists and their named presets.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{AstGraphError, Result};
use crate::syntax::NodeKind;

/// Control flow, definitions, calls, and assignments.
pub const FULL_STRUCTURE_KINDS: &[NodeKind] = &[
    NodeKind::Module,
    NodeKind::FunctionDef,
    NodeKind::ClassDef,
    NodeKind::If,
    NodeKind::For,
    NodeKind::While,
    NodeKind::With,
    NodeKind::Try,
    NodeKind::ExceptHandler,
    NodeKind::Assign,
    NodeKind::Return,
    NodeKind::Call,
    NodeKind::AsyncFunctionDef,
    NodeKind::Await,
    NodeKind::AsyncFor,
];

/// Containment skeleton: modules, classes, functions.
pub const DEFINITION_KINDS: &[NodeKind] = &[
    NodeKind::Module,
    NodeKind::ClassDef,
    NodeKind::FunctionDef,
    NodeKind::AsyncFunctionDef,
];

/// A named allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Full structural view.
    #[default]
    Full,
    /// Definition-only view.
    Definitions,
}

impl Preset {
    pub fn kinds(&self) -> &'static [NodeKind] {
        match self {
            Preset::Full => FULL_STRUCTURE_KINDS,
            Preset::Definitions => DEFINITION_KINDS,
        }
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::from_kinds(self.kinds().iter().copied())
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Full => write!(f, "full"),
            Preset::Definitions => write!(f, "definitions"),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "full" => Ok(Preset::Full),
            "definitions" => Ok(Preset::Definitions),
            other => Err(format!("unknown preset `{}` (expected full or definitions)", other)),
        }
    }
}

/// The set of kinds a filtered graph keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList(BTreeSet<NodeKind>);

impl AllowList {
    pub fn from_kinds(kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        AllowList(kinds.into_iter().collect())
    }

    /// Parse Python class names such as `"FunctionDef"`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names
            .iter()
            .map(|name| {
                name.as_ref()
                    .parse::<NodeKind>()
                    .map_err(|err| AstGraphError::Config(err.to_string()))
            })
            .collect::<Result<BTreeSet<_>>>()
            .map(AllowList)
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Preset::Full.allow_list()
    }
}
