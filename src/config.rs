use std::path::PathBuf;

use clap::ValueEnum;
use log::LevelFilter;
use serde::Deserialize;

use crate::pyproject::PyProject;

/// Logging verbosity, named after Python's logging levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Notset,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Notset => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error | LogLevel::Critical => LevelFilter::Error,
        }
    }
}

/// Options for one analysis run.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` leaves the level to `RUST_LOG`
    pub log_level: Option<LogLevel>,
    /// Fail on imports that resolve to nothing instead of recording a placeholder
    pub strict: bool,
    pub find_unused: bool,
    pub render_graph: bool,
    pub print_graph: bool,
    pub graph_output: PathBuf,
    /// Extra directories searched for absolute imports, relative to the project root
    pub extra_source_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            strict: false,
            find_unused: false,
            render_graph: false,
            print_graph: false,
            graph_output: PathBuf::from("dependency_graph.dot"),
            extra_source_roots: Vec::new(),
        }
    }
}

impl Config {
    /// Takes defaults from a project's `pyproject.toml`.
    pub fn with_pyproject(mut self, project: &PyProject) -> Self {
        let settings = &project.settings;
        if let Some(strict) = settings.strict {
            self.strict = strict;
        }
        if let Some(find_unused) = settings.find_unused {
            self.find_unused = find_unused;
        }
        if let Some(render_graph) = settings.render_graph {
            self.render_graph = render_graph;
        }
        if settings.log_level.is_some() {
            self.log_level = settings.log_level;
        }
        if let Some(output) = &settings.graph_output {
            self.graph_output = output.clone();
        }
        self.extra_source_roots
            .extend(project.source_roots.iter().cloned());
        self
    }
}
