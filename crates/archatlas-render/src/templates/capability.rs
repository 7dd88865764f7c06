//! Capability graph as a left-to-right flowchart with one subgraph per package

use std::collections::{BTreeMap, HashMap, HashSet};

use archatlas_core::{CapabilityEdgeKind, CapabilityGraph, CapabilityNode, CapabilityNodeKind};

use super::Lines;
use crate::sanitize::sanitize_id;

struct PackageTree<'g> {
    nodes: BTreeMap<&'g str, Vec<&'g CapabilityNode>>,
    children: HashMap<&'g str, Vec<&'g str>>,
}

impl<'g> PackageTree<'g> {
    fn render(&self, out: &mut Lines, package: &str, indent: &str) {
        out.push(format!(
            "{}subgraph grp_{}[\"{}\"]",
            indent,
            sanitize_id(package),
            package
        ));
        for node in self.nodes.get(package).into_iter().flatten() {
            let id = sanitize_id(&node.id);
            match node.kind {
                CapabilityNodeKind::Interface => {
                    out.push(format!("{}  {}{{{{\"{}\"}}}}", indent, id, node.name))
                }
                CapabilityNodeKind::Struct => out.push(format!("{}  {}[\"{}\"]", indent, id, node.name)),
            }
        }
        for child in self.children.get(package).into_iter().flatten() {
            self.render(out, child, &format!("{}  ", indent));
        }
        out.push(format!("{}end", indent));
    }
}

pub fn render(graph: &CapabilityGraph) -> String {
    if graph.nodes.is_empty() {
        return "flowchart LR".to_string();
    }
    let mut out = Lines::new("flowchart LR");

    let mut nodes: BTreeMap<&str, Vec<&CapabilityNode>> = BTreeMap::new();
    for node in &graph.nodes {
        nodes.entry(node.package.as_str()).or_default().push(node);
    }

    // nest each package under the longest other package that prefixes it
    let packages: Vec<&str> = nodes.keys().copied().collect();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut nested: HashSet<&str> = HashSet::new();
    for &package in &packages {
        let parent = packages
            .iter()
            .copied()
            .filter(|candidate| {
                *candidate != package
                    && package
                        .strip_prefix(*candidate)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|candidate| candidate.len());
        if let Some(parent) = parent {
            children.entry(parent).or_default().push(package);
            nested.insert(package);
        }
    }

    let tree = PackageTree { nodes, children };
    for root in packages.iter().filter(|p| !nested.contains(*p)) {
        tree.render(&mut out, root, "");
    }

    for edge in &graph.edges {
        let source = sanitize_id(&edge.source);
        let target = sanitize_id(&edge.target);
        match edge.kind {
            CapabilityEdgeKind::Implements => out.push(format!("  {} -.->|impl| {}", source, target)),
            CapabilityEdgeKind::Uses => out.push(format!("  {} -->|uses| {}", source, target)),
        }
    }

    out.finish()
}
