use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors raised while building or reporting an import graph.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The entry file is missing or lies outside the project directory.
    #[error("File {file} is not contained within directory {dir}")]
    InvalidInput { dir: PathBuf, file: PathBuf },

    #[error("Cannot resolve import {name} in file {file}")]
    UnresolvedImport { name: String, file: String },

    /// Strict mode summary returned once the whole graph has been built.
    #[error("{0} import(s) could not be resolved")]
    UnresolvedImports(usize),

    #[error("Identifier spans multiple lines at {file}:{line}")]
    MalformedIdentifier { file: String, line: usize },

    #[error("Unknown node type {0} within import statement")]
    UnknownSyntaxNode(String),

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{0}'")]
    Parse(String),

    #[error("Failed to load the Python grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AnalyzerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
