//! Error types for astgraph.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where and why a source file failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    /// 1-indexed line of the offending token.
    pub line: usize,
    /// 0-indexed column of the offending token.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

#[derive(Debug, Error)]
pub enum AstGraphError {
    /// The source path does not exist.
    #[error("source file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists but could not be opened or decoded as UTF-8 text.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid Python.
    #[error("syntax error at {0}")]
    Syntax(SyntaxDiagnostic),

    /// The tree-sitter grammar could not be loaded into the parser.
    #[error("failed to load Python grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    /// Invalid configuration file or kind name.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AstGraphError {
    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        AstGraphError::Syntax(SyntaxDiagnostic {
            line,
            column,
            message: message.into(),
        })
    }
}

pub type Result<T> = std::result::Result<T, AstGraphError>;
