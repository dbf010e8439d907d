//! Batch mode: build a graph for every Python file under a directory.
//!
//! Walks source files respecting .gitignore and builds them in parallel,
//! each with its own builder.

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::builder::SyntaxGraphBuilder;
use super::engine::SyntaxGraph;
use crate::config::BuilderConfig;
use crate::error::Result;
use crate::parser::is_python_path;

/// The outcome for one scanned file.
#[derive(Debug)]
pub struct FileGraph {
    pub path: PathBuf,
    pub result: Result<SyntaxGraph>,
}

/// Python files under `root`, honouring ignore files, sorted by path.
pub fn python_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| is_python_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Build every Python file under `root`. Failures are returned per file.
pub fn scan_directory(root: &Path, config: &BuilderConfig) -> Vec<FileGraph> {
    let files = python_files(root);

    let graphs: Vec<FileGraph> = files
        .into_par_iter()
        .map(|path| {
            let builder = SyntaxGraphBuilder::new(config.clone());
            let result = builder.build_file(&path);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "failed to build graph");
            }
            FileGraph { path, result }
        })
        .collect();

    let failed = graphs.iter().filter(|g| g.result.is_err()).count();
    info!(
        root = %root.display(),
        files = graphs.len(),
        failed,
        "scan complete"
    );
    graphs
}
