//! Maps import clauses onto graph nodes.
//!
//! A clause is tried against local files first (submodule, module attribute,
//! package, package attribute), then against the library index, and finally
//! falls back to the unresolved policy from [`Config`](crate::config::Config).

use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use tree_sitter::Node;

use crate::analyzer::DependencyAnalyzer;
use crate::error::{AnalyzerError, Result};
use crate::graph::{DepNode, Label};
use crate::source::{
    PACKAGE_MARKER, SourceFile, dotted_to_path, is_valid_module, is_valid_package, normalize,
    path_id, with_py_suffix,
};
use crate::syntax::{IMPORT_FROM_STATEMENT, extract_dotted_name, extract_text};

/// One child of an import statement.
#[derive(Debug, Clone, Copy)]
pub enum ImportClause<'tree> {
    DottedName(Node<'tree>),
    AliasedImport { name: Node<'tree>, alias: Node<'tree> },
    WildcardImport,
    /// Keywords, separators, parentheses and comments
    Punctuation,
    Unknown(&'static str),
}

impl<'tree> ImportClause<'tree> {
    pub fn classify(node: Node<'tree>) -> Self {
        match node.kind() {
            "dotted_name" => ImportClause::DottedName(node),
            "aliased_import" => match (
                node.child_by_field_name("name"),
                node.child_by_field_name("alias"),
            ) {
                (Some(name), Some(alias)) => ImportClause::AliasedImport { name, alias },
                _ => ImportClause::Unknown(node.kind()),
            },
            "wildcard_import" => ImportClause::WildcardImport,
            "import" | "from" | "," | "(" | ")" | "comment" | "line_continuation" => {
                ImportClause::Punctuation
            }
            other => ImportClause::Unknown(other),
        }
    }
}

/// What a resolved clause binds in the importing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// `import a.b` / `from x import a`: bound under its own name
    Default,
    Alias(String),
    /// `from x import *`: nothing is bound
    Wildcard,
}

/// A single import to resolve, in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub name: String,
    /// Module of a `from` clause, empty for plain imports
    pub context: String,
    pub alias: Option<String>,
}

impl ImportRequest {
    pub fn new(name: impl Into<String>, context: impl Into<String>, binding: Binding) -> Self {
        let name = name.into();
        let alias = match binding {
            Binding::Default => Some(name.clone()),
            Binding::Alias(alias) => Some(alias),
            Binding::Wildcard => None,
        };
        Self {
            name,
            context: context.into(),
            alias,
        }
    }

    /// `context.name`, or just `name` for plain imports. An all-dots context
    /// is joined without a separator (`from . import x` -> `.x`).
    pub fn qualified_name(&self) -> String {
        if self.context.is_empty() {
            self.name.clone()
        } else if self.context.ends_with('.') {
            format!("{}{}", self.context, self.name)
        } else {
            format!("{}.{}", self.context, self.name)
        }
    }

    pub fn is_relative(&self) -> bool {
        if self.context.is_empty() {
            self.name.starts_with('.')
        } else {
            self.context.starts_with('.')
        }
    }

    /// Module whose attribute this import may name. For plain `import a.b`
    /// that is the parent `a`.
    fn library_context(&self) -> Option<&str> {
        if self.context.is_empty() {
            self.name.rsplit_once('.').map(|(parent, _)| parent)
        } else {
            Some(self.context.as_str())
        }
    }

    /// Name recorded for an import that could not be resolved.
    fn placeholder_name(&self) -> &str {
        if self.context.is_empty() {
            &self.name
        } else {
            &self.context
        }
    }
}

/// A match on the local filesystem, in resolution priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalTarget {
    /// `base/context/name.py`
    Submodule(PathBuf),
    /// `base/context.py`, the import names something inside it
    ModuleAttribute(PathBuf),
    /// `base/context/name/` with a package marker
    Package(PathBuf),
    /// `base/context/__init__.py`, the import names something inside it
    PackageAttribute(PathBuf),
}

/// Looks for `request` under one search base.
pub fn find_local(base: &Path, request: &ImportRequest) -> Option<LocalTarget> {
    let has_context = !request.context.is_empty();
    let context_path = if has_context {
        base.join(dotted_to_path(&request.context))
    } else {
        base.to_path_buf()
    };
    let package_path = context_path.join(dotted_to_path(&request.name));

    let module_path = with_py_suffix(&package_path);
    if is_valid_module(&module_path) {
        return Some(LocalTarget::Submodule(module_path));
    }

    if has_context {
        let context_module = with_py_suffix(&context_path);
        if is_valid_module(&context_module) {
            return Some(LocalTarget::ModuleAttribute(context_module));
        }
    }

    if is_valid_package(&package_path) {
        return Some(LocalTarget::Package(package_path));
    }

    if has_context {
        let context_init = context_path.join(PACKAGE_MARKER);
        if is_valid_module(&context_init) {
            return Some(LocalTarget::PackageAttribute(context_init));
        }
    }

    None
}

impl DependencyAnalyzer {
    /// Resolves every clause of one import statement and returns the nodes
    /// that bind a name in `file`.
    pub(crate) fn handle_import(&mut self, file: &SourceFile, statement: &Node) -> Vec<DepNode> {
        let context = if statement.kind() == IMPORT_FROM_STATEMENT {
            statement.child_by_field_name("module_name")
        } else {
            None
        };

        let mut cursor = statement.walk();
        let clauses: Vec<Node> = statement
            .children(&mut cursor)
            .filter(|child| context.is_none_or(|ctx| ctx.id() != child.id()))
            .collect();

        let mut nodes = Vec::new();
        for clause in clauses {
            let outcome = match ImportClause::classify(clause) {
                ImportClause::DottedName(name) => {
                    self.resolve_import(file, &name, context.as_ref(), Binding::Default)
                }
                ImportClause::AliasedImport { name, alias } => {
                    match extract_text(&alias, &file.lines) {
                        Some(alias) => {
                            self.resolve_import(file, &name, context.as_ref(), Binding::Alias(alias))
                        }
                        None => Err(AnalyzerError::MalformedIdentifier {
                            file: file.id.clone(),
                            line: alias.start_position().row + 1,
                        }),
                    }
                }
                ImportClause::WildcardImport => match context {
                    Some(module) => self
                        .resolve_import(file, &module, None, Binding::Wildcard)
                        .map(|_| None),
                    None => Ok(None),
                },
                ImportClause::Punctuation => Ok(None),
                ImportClause::Unknown(kind) => {
                    Err(AnalyzerError::UnknownSyntaxNode(kind.to_string()))
                }
            };

            match outcome {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => {}
                Err(e) => self.record_failure(e),
            }
        }
        nodes
    }

    fn record_failure(&mut self, e: AnalyzerError) {
        if matches!(e, AnalyzerError::UnresolvedImport { .. }) {
            self.unresolved += 1;
        }
        error!("{}", e);
    }

    /// Resolves one dotted name, optionally inside a `from` context.
    pub(crate) fn resolve_import(
        &mut self,
        file: &SourceFile,
        target: &Node,
        context: Option<&Node>,
        binding: Binding,
    ) -> Result<Option<DepNode>> {
        let name = extract_dotted_name(target, file)?;
        let context = match context {
            Some(node) => extract_dotted_name(node, file)?,
            None => String::new(),
        };
        self.resolve_request(file, &ImportRequest::new(name, context, binding))
    }

    /// Applies the resolution order to `request`, recording edges from
    /// `file` and recursing into local targets.
    pub fn resolve_request(
        &mut self,
        file: &SourceFile,
        request: &ImportRequest,
    ) -> Result<Option<DepNode>> {
        let qualified = request.qualified_name();

        for base in self.search_bases(file, request.is_relative()) {
            let Some(target) = find_local(&base, request) else {
                continue;
            };
            debug!("{} in {} resolved to {:?}", qualified, file.id, target);

            return Ok(match target {
                LocalTarget::Submodule(path)
                | LocalTarget::ModuleAttribute(path)
                | LocalTarget::PackageAttribute(path) => {
                    let node = DepNode::new(request.name.clone(), path_id(&path))
                        .with_alias(request.alias.clone());
                    self.graph.add_edge(&file.id, node.clone());
                    self.process_nested(&path);
                    Some(node)
                }
                LocalTarget::Package(dir) => {
                    self.process_dir(&file.id, &qualified, &normalize(&dir));
                    None
                }
            });
        }

        if let Some(kind) = self.libraries.lookup(&qualified) {
            return Ok(Some(self.bind_terminal(file, &qualified, Some(kind.into()), request)));
        }

        if let Some(context) = request.library_context()
            && let Some(kind) = self.libraries.lookup_within(context)
        {
            return Ok(Some(self.bind_terminal(file, context, Some(kind.into()), request)));
        }

        if self.config.strict {
            return Err(AnalyzerError::UnresolvedImport {
                name: qualified,
                file: file.id.clone(),
            });
        }

        warn!("Cannot resolve import {} in file {}.", qualified, file.id);
        let placeholder = request.placeholder_name().to_string();
        Ok(Some(self.bind_terminal(file, &placeholder, None, request)))
    }

    fn bind_terminal(
        &mut self,
        file: &SourceFile,
        id: &str,
        label: Option<Label>,
        request: &ImportRequest,
    ) -> DepNode {
        let mut node = DepNode::new(id, id).with_alias(request.alias.clone());
        if let Some(label) = label {
            node = node.with_label(label);
        }
        self.graph.add_terminal(id);
        self.graph.add_edge(&file.id, node.clone());
        node
    }

    /// Directories an import is looked up in, nearest first.
    ///
    /// Relative imports only see the importing file's directory. Absolute
    /// imports also see the extra source roots, the project root and the
    /// directory holding the project root.
    pub(crate) fn search_bases(&self, file: &SourceFile, relative: bool) -> Vec<PathBuf> {
        let mut candidates = vec![file.parent_dir()];
        if !relative {
            if let Some(root) = &self.project_root {
                candidates.extend(
                    self.config
                        .extra_source_roots
                        .iter()
                        .map(|extra| root.join(extra)),
                );
                candidates.push(root.clone());
                candidates.push(root.join(".."));
            } else {
                candidates.extend(self.config.extra_source_roots.iter().cloned());
            }
        }

        let mut bases: Vec<PathBuf> = Vec::new();
        for candidate in candidates {
            let candidate = normalize(&candidate);
            if !bases.contains(&candidate) {
                bases.push(candidate);
            }
        }
        bases
    }
}
