//! Graphviz output for a finished [`DependencyGraph`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use petgraph::dot::Dot;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};

use crate::graph::DependencyGraph;

/// DOT source with one node per graph key and one edge per distinct target.
/// Edge labels carry the dependency labels (`stdlib`, `unused`, ...).
pub fn to_dot(graph: &DependencyGraph) -> String {
    let mut dot_graph: Graph<String, String, Directed> = Graph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();

    let mut node_for = |dot_graph: &mut Graph<String, String, Directed>, id: &str| {
        *index
            .entry(id.to_string())
            .or_insert_with(|| dot_graph.add_node(id.to_string()))
    };

    for (id, _) in graph.iter() {
        node_for(&mut dot_graph, id);
    }

    for (id, deps) in graph.iter() {
        let source = node_for(&mut dot_graph, id);
        let mut seen: HashSet<&str> = HashSet::new();
        for dep in deps {
            if !seen.insert(dep.id.as_str()) {
                continue;
            }
            let target = node_for(&mut dot_graph, &dep.id);
            let labels: Vec<String> = graph
                .labels_for(id, dep)
                .iter()
                .map(ToString::to_string)
                .collect();
            dot_graph.add_edge(source, target, labels.join(", "));
        }
    }

    format!("{}", Dot::with_config(&dot_graph, &[]))
}

/// Writes the DOT file to `output` and converts it to SVG with Graphviz.
///
/// Returns the path of the SVG. The DOT file is kept even when `dot` is
/// missing or fails.
pub fn render_graph(graph: &DependencyGraph, output: &Path) -> Result<PathBuf> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(output, to_dot(graph))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let svg = output.with_extension("svg");
    let status = Command::new("dot")
        .arg("-Tsvg")
        .arg(output)
        .arg("-o")
        .arg(&svg)
        .status()
        .context("Failed to run Graphviz `dot`")?;
    if !status.success() {
        bail!("Graphviz `dot` exited with {}", status);
    }
    Ok(svg)
}
