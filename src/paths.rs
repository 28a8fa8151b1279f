use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::graph::{DepNode, DependencyGraph, format_labeled};
use crate::source::{file_stem, path_id};

/// All root-to-leaf dependency chains starting at `filepath`.
///
/// Each id is expanded at most once per traversal, so cycles terminate and a
/// shared dependency reached through a second parent ends that chain there.
/// Returns an empty set when `filepath` is not in the graph.
pub fn dependency_paths(graph: &DependencyGraph, filepath: &Path) -> BTreeSet<Vec<DepNode>> {
    let mut paths = BTreeSet::new();
    let root_id = path_id(filepath);
    if !graph.contains(&root_id) {
        return paths;
    }

    let root = DepNode::unbound(file_stem(filepath), root_id);
    let mut visited: HashSet<String> = HashSet::new();
    let mut path: Vec<DepNode> = vec![root.clone()];
    let mut frames: Vec<std::vec::IntoIter<DepNode>> = Vec::new();

    if !expand(graph, &root, &mut visited, &mut frames) {
        paths.insert(path);
        return paths;
    }

    while let Some(frame) = frames.last_mut() {
        match frame.next() {
            Some(child) => {
                path.push(child.clone());
                if !expand(graph, &child, &mut visited, &mut frames) {
                    paths.insert(path.clone());
                    path.pop();
                }
            }
            None => {
                frames.pop();
                path.pop();
            }
        }
    }

    paths
}

/// Pushes the children of `node` when it has edges and was not expanded yet.
fn expand(
    graph: &DependencyGraph,
    node: &DepNode,
    visited: &mut HashSet<String>,
    frames: &mut Vec<std::vec::IntoIter<DepNode>>,
) -> bool {
    if !graph.has_dependencies(&node.id) || !visited.insert(node.id.clone()) {
        return false;
    }
    let children: Vec<DepNode> = graph.dependencies(&node.id).cloned().collect();
    frames.push(children.into_iter());
    true
}

/// `root <- dep (label) <- leaf`, labels taken from each edge's parent.
pub fn format_path(graph: &DependencyGraph, path: &[DepNode]) -> String {
    let mut parts = Vec::with_capacity(path.len());
    for (i, node) in path.iter().enumerate() {
        let part = match i.checked_sub(1).and_then(|p| path.get(p)) {
            Some(parent) => graph.describe_edge(&parent.id, node),
            None => format_labeled(node.display_name(), &node.labels),
        };
        parts.push(part);
    }
    parts.join(" <- ")
}

/// Text block listing every dependency chain of `filepath`.
pub fn format_dependency_paths(graph: &DependencyGraph, filepath: &Path) -> String {
    let mut output = format!("Dependency paths for {}:\n", path_id(filepath));
    let paths = dependency_paths(graph, filepath);
    if paths.is_empty() {
        output.push_str("    (no dependencies found)\n");
        return output;
    }
    for path in &paths {
        output.push_str(&format!("    {}\n", format_path(graph, path)));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Label;

    fn names(paths: &BTreeSet<Vec<DepNode>>) -> Vec<Vec<String>> {
        paths
            .iter()
            .map(|p| p.iter().map(|n| n.name.clone()).collect())
            .collect()
    }

    #[test]
    fn test_missing_file_has_no_paths() {
        let graph = DependencyGraph::new();
        assert!(dependency_paths(&graph, Path::new("nope.py")).is_empty());
    }

    #[test]
    fn test_file_without_imports_is_single_path() {
        let mut graph = DependencyGraph::new();
        graph.begin("a.py");
        let paths = dependency_paths(&graph, Path::new("a.py"));
        assert_eq!(names(&paths), vec![vec!["a".to_string()]]);
    }

    #[test]
    fn test_chain_and_labels() {
        let mut graph = DependencyGraph::new();
        graph.begin("proj/a.py");
        graph.begin("proj/b.py");
        graph.add_edge("proj/a.py", DepNode::new("helper", "proj/b.py"));
        graph.add_edge("proj/b.py", DepNode::new("os", "os").with_label(Label::Stdlib));
        graph.add_terminal("os");
        graph.mark_unused("proj/b.py", "os", "os");

        let paths = dependency_paths(&graph, Path::new("proj/a.py"));
        assert_eq!(paths.len(), 1);
        let path = paths.iter().next().unwrap();
        assert_eq!(format_path(&graph, path), "a <- helper <- os (stdlib, unused)");
    }

    #[test]
    fn test_cycle_terminates() {
        let mut graph = DependencyGraph::new();
        graph.begin("a.py");
        graph.begin("b.py");
        graph.add_edge("a.py", DepNode::new("b", "b.py"));
        graph.add_edge("b.py", DepNode::new("a", "a.py"));

        let paths = dependency_paths(&graph, Path::new("a.py"));
        assert_eq!(names(&paths), vec![vec!["a", "b", "a"]]);
    }

    #[test]
    fn test_diamond_explores_shared_child_once() {
        let mut graph = DependencyGraph::new();
        for id in ["a.py", "b.py", "c.py", "d.py"] {
            graph.begin(id);
        }
        graph.add_edge("a.py", DepNode::new("b", "b.py"));
        graph.add_edge("a.py", DepNode::new("c", "c.py"));
        graph.add_edge("b.py", DepNode::new("d", "d.py"));
        graph.add_edge("c.py", DepNode::new("d", "d.py"));

        let paths = dependency_paths(&graph, Path::new("a.py"));
        assert_eq!(
            names(&paths),
            vec![vec!["a", "b", "d"], vec!["a", "c", "d"]]
        );
    }

    #[test]
    fn test_format_dependency_paths_block() {
        let mut graph = DependencyGraph::new();
        graph.begin("main.py");
        graph.add_edge("main.py", DepNode::new("json", "json").with_label(Label::Stdlib));
        graph.add_terminal("json");

        assert_eq!(
            format_dependency_paths(&graph, Path::new("main.py")),
            "Dependency paths for main.py:\n    main <- json (stdlib)\n"
        );
    }
}
