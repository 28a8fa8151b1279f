use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::libraries::LibraryKind;

/// Classification tag attached to an edge when it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Stdlib,
    SitePackage,
    Unused,
}

impl From<LibraryKind> for Label {
    fn from(kind: LibraryKind) -> Self {
        match kind {
            LibraryKind::Stdlib => Label::Stdlib,
            LibraryKind::SitePackage => Label::SitePackage,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Label::Stdlib => "stdlib",
            Label::SitePackage => "site_package",
            Label::Unused => "unused",
        };
        f.write_str(text)
    }
}

/// A resolved import target as seen from one importing file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepNode {
    /// Name used at the import site, e.g. `helper` or `.utils`
    pub name: String,
    /// Normalized file path for local targets, dotted name for libraries
    pub id: String,
    pub labels: BTreeSet<Label>,
    /// Binding introduced in the importing file, if any
    pub alias: Option<String>,
}

impl DepNode {
    /// A node whose binding defaults to its own name.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: Some(name.clone()),
            name,
            id: id.into(),
            labels: BTreeSet::new(),
        }
    }

    /// A node that binds nothing in the importing file.
    pub fn unbound(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            labels: BTreeSet::new(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.insert(label);
        self
    }

    /// Name shown to users: a single leading relative dot is dropped.
    pub fn display_name(&self) -> &str {
        if self.name.len() >= 2 && self.name.starts_with('.') && !self.name.starts_with("..") {
            &self.name[1..]
        } else {
            &self.name
        }
    }
}

impl fmt::Display for DepNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_labeled(self.display_name(), &self.labels))
    }
}

pub(crate) fn format_labeled(name: &str, labels: &BTreeSet<Label>) -> String {
    if labels.is_empty() {
        return name.to_string();
    }
    let joined: Vec<String> = labels.iter().map(Label::to_string).collect();
    format!("{} ({})", name, joined.join(", "))
}

/// Adjacency structure of the import graph.
///
/// `processed` records every id whose expansion has started; an id is marked
/// before its edges are computed, which is what stops import cycles.
/// Unused bindings live in a separate overlay so nodes stay immutable.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    processed: HashSet<String>,
    edges: BTreeMap<String, BTreeSet<DepNode>>,
    unused: HashSet<(String, String, String)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.processed.clear();
        self.edges.clear();
        self.unused.clear();
    }

    /// Marks `id` as processed and gives it an empty edge set.
    ///
    /// Returns `false` when the id was already processed.
    pub fn begin(&mut self, id: &str) -> bool {
        if !self.processed.insert(id.to_string()) {
            return false;
        }
        self.edges.entry(id.to_string()).or_default();
        true
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Registers a terminal target (library or unresolved placeholder).
    pub fn add_terminal(&mut self, id: &str) {
        self.begin(id);
    }

    /// Records `node` under `source`. An identical node (same name, id, alias
    /// and labels) is kept once, so repeating an import adds nothing.
    pub fn add_edge(&mut self, source: &str, node: DepNode) {
        self.edges.entry(source.to_string()).or_default().insert(node);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Direct dependencies of `id`, empty when unknown.
    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &DepNode> {
        self.edges.get(id).into_iter().flatten()
    }

    pub fn has_dependencies(&self, id: &str) -> bool {
        self.edges.get(id).is_some_and(|deps| !deps.is_empty())
    }

    /// All keys with their edges, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<DepNode>)> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn mark_unused(&mut self, source: &str, alias: &str, target: &str) {
        self.unused
            .insert((source.to_string(), alias.to_string(), target.to_string()));
    }

    pub fn is_unused(&self, source: &str, node: &DepNode) -> bool {
        node.alias.as_ref().is_some_and(|alias| {
            self.unused
                .contains(&(source.to_string(), alias.clone(), node.id.clone()))
        })
    }

    /// Labels of the edge `source -> node`, unused overlay included.
    pub fn labels_for(&self, source: &str, node: &DepNode) -> BTreeSet<Label> {
        let mut labels = node.labels.clone();
        if self.is_unused(source, node) {
            labels.insert(Label::Unused);
        }
        labels
    }

    /// `name (label, ...)` for the edge `source -> node`.
    pub fn describe_edge(&self, source: &str, node: &DepNode) -> String {
        format_labeled(node.display_name(), &self.labels_for(source, node))
    }

    /// Unused edges of `source`, in edge order.
    pub fn unused_imports(&self, source: &str) -> Vec<&DepNode> {
        self.dependencies(source)
            .filter(|node| self.is_unused(source, node))
            .collect()
    }
}

impl fmt::Display for DependencyGraph {
    /// Flat listing: each id followed by its indented dependencies.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, deps) in &self.edges {
            writeln!(f, "{}", id)?;
            for dep in deps {
                writeln!(f, "    {}", self.describe_edge(id, dep))?;
            }
        }
        Ok(())
    }
}
