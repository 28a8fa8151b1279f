use std::collections::HashSet;

use tree_sitter::Node;

use crate::source::SourceFile;
use crate::syntax::extract_text;

/// Identifier a binding is referenced by. `import os.path` binds `os`.
pub fn binding_name(alias: &str) -> &str {
    alias.split('.').next().unwrap_or(alias)
}

/// Walks every subtree in `roots` and returns the bound names that appear as
/// plain identifiers. No scoping: any identifier anywhere counts as a use.
pub fn collect_used_names<'tree>(
    roots: impl IntoIterator<Item = Node<'tree>>,
    file: &SourceFile,
    bound: &HashSet<&str>,
) -> HashSet<String> {
    let mut used = HashSet::new();
    let mut stack: Vec<Node<'tree>> = roots.into_iter().collect();

    while let Some(node) = stack.pop() {
        if node.kind() == "identifier" {
            if let Some(text) = extract_text(&node, &file.lines)
                && bound.contains(text.as_str())
            {
                used.insert(text);
            }
            continue;
        }

        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    used
}
