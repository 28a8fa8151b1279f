use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::LogLevel;
use crate::error::{AnalyzerError, Result};

/// Table name under `[tool]` holding analyzer settings.
pub const TOOL_TABLE: &str = "pydep-graph";

/// `[tool.pydep-graph]` settings. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ToolSettings {
    pub strict: Option<bool>,
    pub find_unused: Option<bool>,
    pub render_graph: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub graph_output: Option<PathBuf>,
}

/// What the analyzer takes from a project's `pyproject.toml`.
#[derive(Debug, Clone, Default)]
pub struct PyProject {
    pub settings: ToolSettings,
    /// Directories, relative to the project root, that hold top-level packages
    pub source_roots: Vec<PathBuf>,
}

/// Loads `pyproject.toml` from `project_root`. A missing file yields defaults.
pub fn load(project_root: &Path) -> Result<PyProject> {
    let pyproject_path = project_root.join("pyproject.toml");
    if !pyproject_path.exists() {
        return Ok(PyProject::default());
    }

    let content = std::fs::read_to_string(&pyproject_path)
        .map_err(|e| AnalyzerError::io(&pyproject_path, e))?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<PyProject> {
    let toml: toml::Value = toml::from_str(content)
        .map_err(|e| AnalyzerError::Config(format!("pyproject.toml: {}", e)))?;

    let settings: ToolSettings = match toml.get("tool").and_then(|t| t.get(TOOL_TABLE)) {
        Some(table) => table
            .clone()
            .try_into()
            .map_err(|e| AnalyzerError::Config(format!("[tool.{}]: {}", TOOL_TABLE, e)))?,
        None => ToolSettings::default(),
    };

    let mut source_roots: Vec<PathBuf> = Vec::new();
    for directory in poetry_source_dirs(&toml) {
        let root = PathBuf::from(directory.trim_end_matches('/'));
        if root.as_os_str().is_empty() || source_roots.contains(&root) {
            continue;
        }
        source_roots.push(root);
    }

    Ok(PyProject {
        settings,
        source_roots,
    })
}

/// `from` directories of `[tool.poetry] packages` entries that declare one.
fn poetry_source_dirs(toml: &toml::Value) -> Vec<&str> {
    let mut directories = Vec::new();

    if let Some(packages_array) = toml
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("packages"))
        .and_then(|p| p.as_array())
    {
        for package in packages_array {
            if package.get("include").is_some()
                && let Some(directory) = package.get("from").and_then(|f| f.as_str())
            {
                directories.push(directory);
            }
        }
    }

    directories
}
