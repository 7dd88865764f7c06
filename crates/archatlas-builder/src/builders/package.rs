//! Package dependency graph builder

use std::collections::HashMap;

use archatlas_core::{
    CycleSeverity, Package, PackageCycle, PackageEdge, PackageGraph, PackageKind, PackageNode,
    PackageStats, RawModel,
};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};

use super::LayerBuilder;
use crate::module::{ImportClassifier, ImportKind};

pub struct PackageGraphBuilder {
    classifier: ImportClassifier,
    include_external: bool,
}

impl PackageGraphBuilder {
    pub fn new(classifier: ImportClassifier) -> Self {
        PackageGraphBuilder {
            classifier,
            include_external: false,
        }
    }

    pub fn with_external(mut self, include_external: bool) -> Self {
        self.include_external = include_external;
        self
    }

    /// `{module}/{package}` when the module path is known.
    fn node_id(&self, pkg: &Package) -> String {
        let relative = if pkg.id.is_empty() { &pkg.name } else { &pkg.id };
        match self.classifier.module_path() {
            "" => relative.clone(),
            module => format!("{}/{}", module, relative),
        }
    }

    /// Target node id for an import, or `None` when the import is skipped.
    fn import_target(
        &self,
        import_path: &str,
        known: &HashMap<&str, String>,
        externals: &mut Vec<PackageNode>,
    ) -> Option<String> {
        match self.classifier.classify(import_path) {
            ImportKind::Std => None,
            ImportKind::Internal => {
                let relative = self.classifier.relative_id(import_path).unwrap_or(import_path);
                let target = known.get(relative).or_else(|| known.get(import_path)).cloned();
                if target.is_none() {
                    tracing::debug!(import = import_path, "internal import without a package, skipping");
                }
                target
            }
            kind @ (ImportKind::External | ImportKind::Vendor) => {
                if !self.include_external {
                    return None;
                }
                if !externals.iter().any(|n| n.id == import_path) {
                    externals.push(PackageNode {
                        id: import_path.to_string(),
                        name: import_path.to_string(),
                        kind: if kind == ImportKind::Vendor {
                            PackageKind::Vendor
                        } else {
                            PackageKind::External
                        },
                        file_count: 0,
                        stats: None,
                    });
                }
                Some(import_path.to_string())
            }
        }
    }
}

impl LayerBuilder for PackageGraphBuilder {
    type Output = PackageGraph;

    fn build(&self, model: &RawModel) -> PackageGraph {
        let mut nodes: Vec<PackageNode> = model
            .packages
            .iter()
            .map(|pkg| PackageNode {
                id: self.node_id(pkg),
                name: if pkg.id.is_empty() { pkg.name.clone() } else { pkg.id.clone() },
                kind: classify_package(pkg),
                file_count: pkg.source_files.len(),
                stats: Some(PackageStats {
                    structs: pkg.structs.len(),
                    interfaces: pkg.interfaces.len(),
                    functions: pkg.functions.len(),
                }),
            })
            .collect();

        // module-relative id -> node id
        let known: HashMap<&str, String> = model
            .packages
            .iter()
            .zip(&nodes)
            .map(|(pkg, node)| (pkg.id.as_str(), node.id.clone()))
            .collect();

        let mut externals = Vec::new();
        let mut edges: Vec<PackageEdge> = Vec::new();
        let mut edge_index: HashMap<(String, String), usize> = HashMap::new();

        for (pkg, from) in model.packages.iter().zip(nodes.iter().map(|n| n.id.clone())) {
            for import in &pkg.imports {
                let Some(to) = self.import_target(&import.path, &known, &mut externals) else {
                    continue;
                };
                match edge_index.get(&(from.clone(), to.clone())) {
                    Some(&i) => edges[i].strength += 1,
                    None => {
                        edge_index.insert((from.clone(), to.clone()), edges.len());
                        edges.push(PackageEdge {
                            from: from.clone(),
                            to,
                            strength: 1,
                            import_path: import.path.clone(),
                        });
                    }
                }
            }
        }

        nodes.extend(externals);
        let cycles = detect_cycles(&nodes, &edges);

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            cycles = cycles.len(),
            "built package graph"
        );

        PackageGraph {
            nodes,
            edges,
            cycles,
        }
    }
}

/// Package kind from its name and path shape.
pub fn classify_package(pkg: &Package) -> PackageKind {
    let path = if pkg.id.is_empty() { &pkg.name } else { &pkg.id };
    let has_segment = |wanted: &[&str]| path.split('/').any(|seg| wanted.contains(&seg));

    if pkg.name == "main" || has_segment(&["cmd"]) {
        PackageKind::Cmd
    } else if has_segment(&["vendor"]) {
        PackageKind::Vendor
    } else if has_segment(&["examples", "example"]) {
        PackageKind::Examples
    } else if has_segment(&["testutil", "testutils", "testing"]) {
        PackageKind::Testutil
    } else if has_segment(&["test", "tests"]) || pkg.name.ends_with("_test") {
        PackageKind::Tests
    } else {
        PackageKind::Internal
    }
}

/// Report every back edge found by a depth-first traversal as a cycle.
/// The edge list is only read.
fn detect_cycles(nodes: &[PackageNode], edges: &[PackageEdge]) -> Vec<PackageCycle> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in nodes {
        index
            .entry(node.id.as_str())
            .or_insert_with(|| graph.add_node(node.id.as_str()));
    }
    for edge in edges {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
            graph.add_edge(from, to, ());
        }
    }

    let is_cmd: HashMap<&str, bool> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.kind == PackageKind::Cmd))
        .collect();

    let mut stack: Vec<NodeIndex> = Vec::new();
    let mut cycles = Vec::new();
    depth_first_search(&graph, graph.node_indices(), |event| match event {
        DfsEvent::Discover(n, _) => stack.push(n),
        DfsEvent::Finish(_, _) => {
            stack.pop();
        }
        DfsEvent::BackEdge(_, target) => {
            if let Some(start) = stack.iter().position(|&n| n == target) {
                let packages: Vec<String> = stack[start..]
                    .iter()
                    .map(|&n| graph[n].to_string())
                    .collect();
                let severity = if packages.iter().any(|p| is_cmd.get(p.as_str()) == Some(&true)) {
                    CycleSeverity::Error
                } else {
                    CycleSeverity::Warning
                };
                cycles.push(PackageCycle { packages, severity });
            }
        }
        _ => {}
    });

    cycles
}
