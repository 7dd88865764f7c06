//! Package graph as a top-to-bottom flowchart
//!
//! Package names are grouped into nested subgraphs by path prefix. A prefix
//! becomes a group once at least two packages live under it, and every
//! package is drawn inside its deepest group.

use std::collections::{HashMap, HashSet};

use archatlas_core::{PackageGraph, PackageNode};

use super::Lines;
use crate::sanitize::sanitize_id;

const CLASS_DEFS: &[&str] = &[
    "  classDef cmd      fill:#ff6b6b,stroke:#c0392b,color:#000",
    "  classDef tests    fill:#b2bec3,stroke:#636e72,color:#000",
    "  classDef examples fill:#74b9ff,stroke:#0984e3,color:#000",
    "  classDef testutil fill:#dfe6e9,stroke:#b2bec3,color:#000",
    "  classDef internal fill:#55efc4,stroke:#00b894,color:#000",
    "  classDef vendor   fill:#f0e6ff,stroke:#9b59b6,color:#000",
    "  classDef external fill:#ffeaa7,stroke:#fdcb6e,color:#000",
    "  classDef cycle    fill:#fd79a8,stroke:#e84393,stroke-width:3px",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub prefix: String,
    /// Indices into `GroupTree::groups`.
    pub children: Vec<usize>,
    pub node_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    pub groups: Vec<Group>,
    pub roots: Vec<usize>,
    pub grouped: HashSet<String>,
}

fn prefix_of(segments: &[&str], depth: usize) -> String {
    segments[..depth].join("/")
}

/// Prefix tree of subgraph groups over package names, in first-seen order.
pub fn build_group_tree(nodes: &[PackageNode]) -> GroupTree {
    let mut order: Vec<String> = Vec::new();
    let mut members: HashMap<String, usize> = HashMap::new();
    for node in nodes {
        let segments: Vec<&str> = node.name.split('/').collect();
        for depth in 1..=segments.len() {
            let prefix = prefix_of(&segments, depth);
            let count = members.entry(prefix.clone()).or_insert(0);
            if *count == 0 {
                order.push(prefix);
            }
            *count += 1;
        }
    }

    let mut tree = GroupTree::default();
    let mut index: HashMap<String, usize> = HashMap::new();
    for prefix in order.into_iter().filter(|p| members.get(p).is_some_and(|&n| n >= 2)) {
        index.insert(prefix.clone(), tree.groups.len());
        tree.groups.push(Group {
            prefix,
            children: Vec::new(),
            node_ids: Vec::new(),
        });
    }

    for i in 0..tree.groups.len() {
        let segments: Vec<&str> = tree.groups[i].prefix.split('/').collect();
        let parent = (1..segments.len())
            .rev()
            .find_map(|depth| index.get(&prefix_of(&segments, depth)).copied());
        match parent {
            Some(p) => tree.groups[p].children.push(i),
            None => tree.roots.push(i),
        }
    }

    for node in nodes {
        let segments: Vec<&str> = node.name.split('/').collect();
        let deepest = (1..=segments.len())
            .rev()
            .find_map(|depth| index.get(&prefix_of(&segments, depth)).copied());
        if let Some(g) = deepest {
            tree.groups[g].node_ids.push(node.id.clone());
            tree.grouped.insert(node.id.clone());
        }
    }

    tree
}

fn node_line(node: &PackageNode, in_cycle: &HashSet<&str>, indent: &str) -> String {
    let style = if in_cycle.contains(node.id.as_str()) {
        "cycle"
    } else {
        node.kind.as_str()
    };
    format!("{}{}[\"{}\"]:::{}", indent, sanitize_id(&node.id), node.name, style)
}

fn render_groups(
    out: &mut Lines,
    tree: &GroupTree,
    groups: &[usize],
    nodes: &HashMap<&str, &PackageNode>,
    in_cycle: &HashSet<&str>,
    indent: &str,
) {
    for &g in groups {
        let group = &tree.groups[g];
        out.blank();
        out.push(format!(
            "{}subgraph grp_{}[\"{}\"]",
            indent,
            sanitize_id(&group.prefix),
            group.prefix
        ));
        render_groups(out, tree, &group.children, nodes, in_cycle, &format!("{}  ", indent));
        for id in &group.node_ids {
            if let Some(node) = nodes.get(id.as_str()) {
                out.push(node_line(node, in_cycle, &format!("{}  ", indent)));
            }
        }
        out.push(format!("{}end", indent));
    }
}

pub fn render(graph: &PackageGraph) -> String {
    let mut out = Lines::new("flowchart TB");

    if !graph.cycles.is_empty() {
        out.push("  %% Cycles detected:");
        for cycle in &graph.cycles {
            out.push(format!(
                "  %% {}: {}",
                cycle.severity.as_str(),
                cycle.packages.join(" → ")
            ));
        }
        out.blank();
    }

    // self-loops are drawn as edges, not cycle members
    let in_cycle: HashSet<&str> = graph
        .cycles
        .iter()
        .filter(|c| c.packages.len() > 1)
        .flat_map(|c| c.packages.iter().map(String::as_str))
        .collect();

    let nodes: HashMap<&str, &PackageNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let tree = build_group_tree(&graph.nodes);

    for node in graph.nodes.iter().filter(|n| !tree.grouped.contains(&n.id)) {
        out.push(node_line(node, &in_cycle, "  "));
    }
    render_groups(&mut out, &tree, &tree.roots, &nodes, &in_cycle, "  ");

    out.blank();
    for class_def in CLASS_DEFS {
        out.push(class_def);
    }

    out.blank();
    for edge in &graph.edges {
        let from = sanitize_id(&edge.from);
        let to = sanitize_id(&edge.to);
        if edge.from == edge.to {
            out.push(format!("  {} -.->|\"⚠ self\"| {}", from, to));
        } else if edge.strength > 1 {
            out.push(format!("  {} -->|\"{} refs\"| {}", from, edge.strength, to));
        } else {
            out.push(format!("  {} --> {}", from, to));
        }
    }

    out.finish()
}
