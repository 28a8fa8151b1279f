//! Builds the import graph by walking files from an entry point.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use tree_sitter::Node;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{AnalyzerError, Result};
use crate::graph::{DepNode, DependencyGraph};
use crate::libraries::{LibraryIndex, LibraryProvider, PythonHost};
use crate::paths;
use crate::render;
use crate::source::{
    SourceFile, is_valid_module, is_valid_package, normalize, path_id, relative_to,
};
use crate::syntax::{SyntaxExtractor, is_import};
use crate::usage::{binding_name, collect_used_names};

/// Owns the graph and library index for one analysis run at a time.
pub struct DependencyAnalyzer {
    pub(crate) config: Config,
    extractor: SyntaxExtractor,
    provider: Box<dyn LibraryProvider>,
    pub(crate) libraries: LibraryIndex,
    pub(crate) graph: DependencyGraph,
    pub(crate) project_root: Option<PathBuf>,
    /// Imports that failed under strict resolution in the current run
    pub(crate) unresolved: usize,
}

impl DependencyAnalyzer {
    /// An analyzer that discovers libraries through the host Python.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_provider(config, Box::new(PythonHost::default()))
    }

    pub fn with_provider(config: Config, provider: Box<dyn LibraryProvider>) -> Result<Self> {
        Ok(Self {
            config,
            extractor: SyntaxExtractor::new()?,
            provider,
            libraries: LibraryIndex::new(),
            graph: DependencyGraph::new(),
            project_root: None,
            unresolved: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn libraries(&self) -> &LibraryIndex {
        &self.libraries
    }

    /// Re-reads the library index. An unavailable interpreter leaves it empty.
    pub fn refresh_packages(&mut self) {
        self.libraries = match self.provider.discover() {
            Ok(index) => index,
            Err(e) => {
                warn!("Library discovery failed, treating every non-local import as unresolved: {:#}", e);
                LibraryIndex::new()
            }
        };
    }

    /// Clears the graph and refreshes the library index.
    pub fn reset(&mut self) {
        self.refresh_packages();
        self.graph.clear();
        self.project_root = None;
        self.unresolved = 0;
    }

    /// Builds the graph reachable from `filepath`, which must be a file
    /// inside `dirpath`.
    pub fn process(&mut self, dirpath: &Path, filepath: &Path) -> Result<()> {
        self.reset();

        if !directory_contains_file(dirpath, filepath) {
            error!(
                "File {} is not contained within directory {}.",
                filepath.display(),
                dirpath.display()
            );
            return Err(AnalyzerError::InvalidInput {
                dir: dirpath.to_path_buf(),
                file: filepath.to_path_buf(),
            });
        }

        self.project_root = Some(align_root(dirpath, filepath));
        self.process_file(filepath)?;

        if self.config.strict && self.unresolved > 0 {
            return Err(AnalyzerError::UnresolvedImports(self.unresolved));
        }
        Ok(())
    }

    /// Expands one file: resolves its top-level imports, recursing into local
    /// targets, then records which bindings are never used.
    pub fn process_file(&mut self, filepath: &Path) -> Result<()> {
        let id = path_id(filepath);
        if !self.graph.begin(&id) {
            return Ok(());
        }
        info!("Processing file {}", id);

        let file = SourceFile::read(filepath)?;
        let tree = self.extractor.parse(&file)?;
        let root = tree.root_node();
        let mut cursor = root.walk();
        let top_level: Vec<Node> = root.children(&mut cursor).collect();

        // alias -> id of the target it was last bound to
        let mut bindings: HashMap<String, String> = HashMap::new();
        for statement in top_level.iter().filter(|node| is_import(node)) {
            for node in self.handle_import(&file, statement) {
                if let Some(alias) = node.alias {
                    bindings.insert(alias, node.id);
                }
            }
        }

        if self.config.find_unused && !bindings.is_empty() {
            let body = top_level.iter().filter(|node| !is_import(node)).copied();
            self.label_unused(&file, body, &bindings);
        }
        Ok(())
    }

    /// Processes a file reached through an import; failures only cost that file.
    pub(crate) fn process_nested(&mut self, filepath: &Path) {
        if let Err(e) = self.process_file(&normalize(filepath)) {
            warn!("Skipping {}: {}", filepath.display(), e);
        }
    }

    /// Adds every module of the package at `dirpath` (subpackages included)
    /// as a dependency of `source_id` and processes each of them.
    pub fn process_dir(&mut self, source_id: &str, context_name: &str, dirpath: &Path) {
        let walker = WalkDir::new(dirpath)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_type().is_dir() || is_valid_package(entry.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read package {}: {}", dirpath.display(), e);
                    continue;
                }
            };
            if !is_valid_module(entry.path()) {
                continue;
            }
            let Some(module_name) = package_member_name(dirpath, entry.path()) else {
                continue;
            };

            let name = if context_name.ends_with('.') {
                format!("{}{}", context_name, module_name)
            } else {
                format!("{}.{}", context_name, module_name)
            };
            let node = DepNode::unbound(name, path_id(entry.path()));
            debug!("{} pulls in {}", source_id, node.id);
            self.graph.add_edge(source_id, node);
            self.process_nested(entry.path());
        }
    }

    fn label_unused<'tree>(
        &mut self,
        file: &SourceFile,
        body: impl IntoIterator<Item = Node<'tree>>,
        bindings: &HashMap<String, String>,
    ) {
        let bound: HashSet<&str> = bindings.keys().map(|alias| binding_name(alias)).collect();
        let used = collect_used_names(body, file, &bound);

        let stale: Vec<(String, String)> = self
            .graph
            .dependencies(&file.id)
            .filter_map(|dep| {
                let alias = dep.alias.as_ref()?;
                let target = bindings.get(alias)?;
                let unused = !used.contains(binding_name(alias)) && *target == dep.id;
                unused.then(|| (alias.clone(), dep.id.clone()))
            })
            .collect();

        for (alias, target) in stale {
            debug!("Unused import {} in {}", alias, file.id);
            self.graph.mark_unused(&file.id, &alias, &target);
        }
    }

    /// All dependency chains starting at `filepath`.
    pub fn dependency_paths(&self, filepath: &Path) -> BTreeSet<Vec<DepNode>> {
        paths::dependency_paths(&self.graph, filepath)
    }

    pub fn format_dependency_paths(&self, filepath: &Path) -> String {
        paths::format_dependency_paths(&self.graph, filepath)
    }

    /// Builds the graph, prints the dependency chains (and the flat listing
    /// when configured) and renders the graph when configured and the build
    /// succeeded.
    pub fn run(&mut self, dirpath: &Path, filepath: &Path) -> Result<()> {
        let outcome = self.process(dirpath, filepath);
        if matches!(outcome, Err(AnalyzerError::InvalidInput { .. })) {
            return outcome;
        }

        print!("{}", self.format_dependency_paths(filepath));
        if self.config.print_graph {
            println!();
            print!("{}", self.graph);
        }

        if outcome.is_ok() && self.config.render_graph {
            match render::render_graph(&self.graph, &self.config.graph_output) {
                Ok(path) => info!("Rendered dependency graph to {}", path.display()),
                Err(e) => warn!("Could not render dependency graph: {:#}", e),
            }
        }
        outcome
    }
}

/// Whether `filepath` is an existing file located under `dirpath`.
pub fn directory_contains_file(dirpath: &Path, filepath: &Path) -> bool {
    if !dirpath.is_dir() || !filepath.is_file() {
        return false;
    }
    match (dirpath.canonicalize(), filepath.canonicalize()) {
        (Ok(dir), Ok(file)) => file.starts_with(dir),
        _ => false,
    }
}

/// The project root spelled the way the entry path is, absolute or relative,
/// so files reached through the root and through the entry share one id.
fn align_root(dirpath: &Path, filepath: &Path) -> PathBuf {
    let root = normalize(dirpath);
    match (filepath.is_absolute(), root.is_absolute()) {
        (true, false) => std::path::absolute(&root)
            .map(|absolute| normalize(&absolute))
            .unwrap_or(root),
        (false, true) => std::env::current_dir()
            .ok()
            .and_then(|cwd| relative_to(&root, &normalize(&cwd)))
            .unwrap_or(root),
        _ => root,
    }
}

/// Dotted name of a module below a package directory
/// (`pkg/sub/mod.py` under `pkg` -> `sub.mod`).
fn package_member_name(dirpath: &Path, module: &Path) -> Option<String> {
    let relative = module.strip_prefix(dirpath).ok()?.with_extension("");
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("."))
}
