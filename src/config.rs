//! Builder configuration and the `astgraph.toml` loader.
//!
//! ```toml
//! [filter]
//! enabled = true
//! preset = "definitions"
//! allow_list = ["Module", "If"]
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{AstGraphError, Result};
use crate::graph::filter::{AllowList, Preset};
use crate::syntax::NodeKind;

/// How a builder decides which syntax nodes become graph nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// When false every node is retained and `allow_list` is ignored.
    pub filtering_enabled: bool,
    pub allow_list: AllowList,
}

impl BuilderConfig {
    /// Keep every syntax node.
    pub fn unfiltered() -> Self {
        Self {
            filtering_enabled: false,
            allow_list: AllowList::default(),
        }
    }

    pub fn preset(preset: Preset) -> Self {
        Self::with_allow_list(preset.allow_list())
    }

    pub fn with_allow_list(allow_list: AllowList) -> Self {
        Self {
            filtering_enabled: true,
            allow_list,
        }
    }

    /// Whether a node of `kind` is kept (and its fields visited).
    pub fn retains(&self, kind: NodeKind) -> bool {
        !self.filtering_enabled || self.allow_list.contains(kind)
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::preset(Preset::Full)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AstGraphConfig {
    pub filter: FilterConfig,
}

/// The `[filter]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub preset: Preset,
    /// Explicit kind names; overrides `preset` when present.
    pub allow_list: Option<Vec<String>>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preset: Preset::Full,
            allow_list: None,
        }
    }
}

impl AstGraphConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            AstGraphError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text)
            .map_err(|e| AstGraphError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| AstGraphError::Config(e.to_string()))?;
        // Surface unknown kind names at load time.
        config.builder_config()?;
        Ok(config)
    }

    pub fn builder_config(&self) -> Result<BuilderConfig> {
        let allow_list = match &self.filter.allow_list {
            Some(names) => AllowList::from_names(names)?,
            None => self.filter.preset.allow_list(),
        };
        Ok(BuilderConfig {
            filtering_enabled: self.filter.enabled,
            allow_list,
        })
    }
}
