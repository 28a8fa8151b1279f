//! Index of importable library modules available on the host interpreter.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::source::PACKAGE_MARKER;

/// Where a library module comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LibraryKind {
    Stdlib,
    SitePackage,
}

/// Dotted module names known to be importable from outside the project.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    modules: HashMap<String, LibraryKind>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from explicit stdlib and site-package module names.
    pub fn from_modules<S, P>(stdlib: S, site_packages: P) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut index = Self::new();
        for name in site_packages {
            index.insert(name.into(), LibraryKind::SitePackage);
        }
        for name in stdlib {
            index.insert(name.into(), LibraryKind::Stdlib);
        }
        index
    }

    /// Stdlib entries take precedence over a site package of the same name.
    pub fn insert(&mut self, name: String, kind: LibraryKind) {
        let entry = self.modules.entry(name).or_insert(kind);
        if kind == LibraryKind::Stdlib {
            *entry = LibraryKind::Stdlib;
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Kind of `name` when it is itself an indexed module.
    pub fn lookup(&self, name: &str) -> Option<LibraryKind> {
        self.modules.get(name).copied()
    }

    pub fn is_stdlib(&self, name: &str) -> bool {
        self.lookup(name) == Some(LibraryKind::Stdlib)
    }

    pub fn is_site_package(&self, name: &str) -> bool {
        self.lookup(name) == Some(LibraryKind::SitePackage)
    }

    pub fn is_library(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Kind of `name` or of its closest indexed dotted ancestor
    /// (`os.path` -> `os`). Library internals are opaque, so anything under a
    /// known module belongs to it.
    pub fn lookup_within(&self, name: &str) -> Option<LibraryKind> {
        let mut candidate = name;
        loop {
            if let Some(kind) = self.lookup(candidate) {
                return Some(kind);
            }
            let (parent, _) = candidate.rsplit_once('.')?;
            candidate = parent;
        }
    }
}

/// Source of the library index, queried once per analysis run.
pub trait LibraryProvider {
    fn discover(&self) -> Result<LibraryIndex>;
}

/// A fixed index, handy for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticLibraries(pub LibraryIndex);

impl LibraryProvider for StaticLibraries {
    fn discover(&self) -> Result<LibraryIndex> {
        Ok(self.0.clone())
    }
}

/// Asks the host Python interpreter where its libraries live and walks them.
#[derive(Debug, Clone)]
pub struct PythonHost {
    interpreters: Vec<String>,
}

impl Default for PythonHost {
    fn default() -> Self {
        Self {
            interpreters: vec!["python3".to_string(), "python".to_string()],
        }
    }
}

const PROBE_SCRIPT: &str = r#"
import json, site, sys, sysconfig
paths = sysconfig.get_paths()
sites = []
try:
    sites.extend(site.getsitepackages())
except AttributeError:
    pass
for key in ("purelib", "platlib"):
    if paths.get(key) and paths[key] not in sites:
        sites.append(paths[key])
names = getattr(sys, "stdlib_module_names", sys.builtin_module_names)
print(json.dumps({
    "stdlib": paths["stdlib"],
    "site_packages": sites,
    "builtins": sorted(set(names) | set(sys.builtin_module_names)),
}))
"#;

/// Layout reported by the probe script.
#[derive(Debug, Deserialize)]
struct HostLayout {
    stdlib: PathBuf,
    site_packages: Vec<PathBuf>,
    builtins: Vec<String>,
}

impl PythonHost {
    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreters: vec![interpreter.into()],
        }
    }

    fn probe(&self) -> Result<HostLayout> {
        let mut last_error = anyhow!("no Python interpreter configured");
        for interpreter in &self.interpreters {
            match Command::new(interpreter).args(["-c", PROBE_SCRIPT]).output() {
                Ok(output) if output.status.success() => {
                    return serde_json::from_slice(&output.stdout)
                        .with_context(|| format!("Unexpected output from {}", interpreter));
                }
                Ok(output) => {
                    last_error = anyhow!("{} exited with {}", interpreter, output.status);
                }
                Err(e) => {
                    last_error = anyhow!(e).context(format!("Failed to run {}", interpreter));
                }
            }
        }
        Err(last_error)
    }
}

impl LibraryProvider for PythonHost {
    fn discover(&self) -> Result<LibraryIndex> {
        let layout = self.probe()?;
        let mut index = LibraryIndex::new();

        for site_dir in &layout.site_packages {
            for name in collect_module_names(site_dir) {
                index.insert(name, LibraryKind::SitePackage);
            }
        }
        for name in collect_module_names(&layout.stdlib) {
            index.insert(name, LibraryKind::Stdlib);
        }
        for name in layout.builtins {
            index.insert(name, LibraryKind::Stdlib);
        }

        log::debug!(
            "Indexed {} library modules from {}",
            index.len(),
            layout.stdlib.display()
        );
        Ok(index)
    }
}

/// Collects dotted module names below a library root.
///
/// Top-level `.py` files and extension modules are modules; a directory is
/// only descended into when it is a package, so vendored trees and data
/// directories are skipped.
pub fn collect_module_names(root: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || entry.path().join(PACKAGE_MARKER).is_file()
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let mut parts: Vec<String> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect();
        let Some(last) = parts.pop() else {
            continue;
        };

        let stem = if entry.file_type().is_dir() {
            last
        } else if let Some(stem) = last.strip_suffix(".py") {
            if stem == "__init__" {
                continue;
            }
            stem.to_string()
        } else if parts.is_empty() && (last.ends_with(".so") || last.ends_with(".pyd")) {
            // `_ssl.cpython-312-x86_64-linux-gnu.so` -> `_ssl`
            match last.split('.').next() {
                Some(stem) => stem.to_string(),
                None => continue,
            }
        } else {
            continue;
        };

        parts.push(stem);
        names.push(parts.join("."));
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lookup_and_precedence() {
        let mut index = LibraryIndex::from_modules(["os", "json"], ["numpy", "json"]);
        assert!(index.is_stdlib("os"));
        assert!(index.is_stdlib("json"));
        assert!(index.is_site_package("numpy"));
        assert!(!index.is_library("requests"));

        index.insert("os".to_string(), LibraryKind::SitePackage);
        assert!(index.is_stdlib("os"));
    }

    #[test]
    fn test_lookup_within_ancestors() {
        let index = LibraryIndex::from_modules(["os", "collections.abc"], ["numpy"]);
        assert_eq!(index.lookup_within("os.path"), Some(LibraryKind::Stdlib));
        assert_eq!(index.lookup_within("numpy.linalg.norm"), Some(LibraryKind::SitePackage));
        assert_eq!(index.lookup_within("collections"), None);
        assert_eq!(index.lookup_within("missing.thing"), None);
        assert_eq!(index.lookup("os.path"), None);
    }

    #[test]
    fn test_collect_module_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("json")).unwrap();
        fs::write(root.join("json/__init__.py"), "").unwrap();
        fs::write(root.join("json/decoder.py"), "").unwrap();
        fs::write(root.join("os.py"), "").unwrap();
        fs::write(root.join("_ssl.cpython-312-x86_64-linux-gnu.so"), "").unwrap();
        fs::create_dir_all(root.join("test_data")).unwrap();
        fs::write(root.join("test_data/skip.py"), "").unwrap();
        fs::write(root.join("README.txt"), "").unwrap();

        let mut names = collect_module_names(root);
        names.sort();
        assert_eq!(names, vec!["_ssl", "json", "json.decoder", "os"]);
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticLibraries(LibraryIndex::from_modules(["sys"], Vec::<String>::new()));
        let index = provider.discover().unwrap();
        assert!(index.is_stdlib("sys"));
    }
}
