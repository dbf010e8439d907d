//! Python detection and tree-sitter grammar loading.

use std::path::Path;
use tree_sitter::{Language, Parser};

use crate::error::Result;

/// File extensions treated as Python source.
pub const PYTHON_EXTENSIONS: &[&str] = &["py", "pyw"];

/// Whether the path looks like a Python source file.
pub fn is_python_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PYTHON_EXTENSIONS.contains(&ext))
}

/// Get the tree-sitter Language for Python.
pub fn python_language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// A parser loaded with the Python grammar.
pub fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser.set_language(&python_language())?;
    Ok(parser)
}
