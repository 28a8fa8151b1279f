//! Static import-dependency graphs for Python projects.
//!
//! Starting from one entry file, every top-level import is resolved to a
//! local module, a package, a library module or an unresolved name, and the
//! result is exposed as a [`DependencyGraph`] with dependency chains and
//! unused-import labels.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod graph;
pub mod libraries;
pub mod paths;
pub mod pyproject;
pub mod render;
pub mod resolver;
pub mod source;
pub mod syntax;
pub mod usage;

pub use analyzer::DependencyAnalyzer;
pub use config::{Config, LogLevel};
pub use error::{AnalyzerError, Result};
pub use graph::{DepNode, DependencyGraph, Label};
pub use libraries::{LibraryIndex, LibraryKind, LibraryProvider, PythonHost, StaticLibraries};
