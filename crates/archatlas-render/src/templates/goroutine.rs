//! Goroutine topology as a top-to-bottom flowchart
//!
//! Goroutines are grouped by package. Spawners that are plain functions
//! rather than goroutine nodes are declared on the fly from spawn and
//! channel edges.

use std::collections::{HashMap, HashSet};

use archatlas_core::{GoroutineKind, GoroutineNode, GoroutineTopology};

use super::Lines;
use crate::sanitize::sanitize_id;

const CHANNEL_PREFIX: &str = "chan-";

struct NodeDecl<'t> {
    raw_id: &'t str,
    label: String,
    style: &'static str,
}

/// Node declarations grouped by package, in first-seen order.
#[derive(Default)]
struct Declarations<'t> {
    groups: Vec<(&'t str, Vec<NodeDecl<'t>>)>,
    ungrouped: Vec<NodeDecl<'t>>,
    declared: HashSet<&'t str>,
}

impl<'t> Declarations<'t> {
    fn add(&mut self, package: Option<&'t str>, decl: NodeDecl<'t>) {
        self.declared.insert(decl.raw_id);
        match package.filter(|p| !p.is_empty()) {
            Some(package) => match self.groups.iter_mut().find(|(p, _)| *p == package) {
                Some((_, decls)) => decls.push(decl),
                None => self.groups.push((package, vec![decl])),
            },
            None => self.ungrouped.push(decl),
        }
    }

    fn add_spawner(&mut self, raw_id: &'t str, package: Option<&'t str>) {
        if self.declared.contains(raw_id) {
            return;
        }
        self.add(
            package,
            NodeDecl {
                raw_id,
                label: spawner_label(raw_id),
                style: ":::spawner",
            },
        );
    }
}

pub fn render(topology: &GoroutineTopology) -> String {
    let mut out = Lines::new("flowchart TB");

    let package_of: HashMap<&str, &str> = topology
        .nodes
        .iter()
        .filter(|n| !n.package.is_empty())
        .map(|n| (n.id.as_str(), n.package.as_str()))
        .collect();

    let mut decls = Declarations::default();
    for node in &topology.nodes {
        let pattern = node
            .pattern
            .map(|p| format!(" ({})", p.as_str()))
            .unwrap_or_default();
        decls.add(
            Some(node.package.as_str()),
            NodeDecl {
                raw_id: &node.id,
                label: format!("{}{}", goroutine_name(node), pattern),
                style: match node.kind {
                    GoroutineKind::Main => ":::main",
                    GoroutineKind::Spawned => ":::spawned",
                },
            },
        );
    }
    for edge in &topology.edges {
        decls.add_spawner(&edge.from, package_of.get(edge.to.as_str()).copied());
    }
    for edge in topology
        .channel_edges
        .iter()
        .filter(|e| !e.from.starts_with(CHANNEL_PREFIX))
    {
        decls.add_spawner(&edge.from, package_of.get(edge.to.as_str()).copied());
    }

    for (package, group) in &decls.groups {
        out.blank();
        out.push(format!("  subgraph grp_{}[\"{}\"]", sanitize_id(package), package));
        for decl in group {
            out.push(format!("    {}[\"{}\"]{}", sanitize_id(decl.raw_id), decl.label, decl.style));
        }
        out.push("  end");
    }
    for decl in &decls.ungrouped {
        out.push(format!("  {}[\"{}\"]{}", sanitize_id(decl.raw_id), decl.label, decl.style));
    }

    for edge in &topology.edges {
        out.push(format!("  {} -->|go| {}", sanitize_id(&edge.from), sanitize_id(&edge.to)));
    }

    if !topology.channels.is_empty() {
        out.blank();
        out.push("  subgraph channels");
        for channel in &topology.channels {
            let label = if channel.element_type != "chan" {
                channel.element_type.clone()
            } else {
                channel_label(&channel.id)
            };
            out.push(format!("    {}[(\"{}\")]:::channel", sanitize_id(&channel.id), label));
        }
        out.push("  end");
    }

    for edge in &topology.channel_edges {
        out.push(format!(
            "  {} -->|{}| {}",
            sanitize_id(&edge.from),
            edge.kind.as_str(),
            sanitize_id(&edge.to)
        ));
    }

    out.blank();
    out.push("  classDef main fill:#f66,stroke:#333,stroke-width:2px");
    out.push("  classDef spawned fill:#6f6,stroke:#333,stroke-width:1px");
    out.push("  classDef spawner fill:#69f,stroke:#333,stroke-width:1px");
    out.push("  classDef channel fill:#ff6,stroke:#333,stroke-width:1px");

    out.finish()
}

fn after_last_slash(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

/// Display name of a goroutine node.
///
/// Named nodes lose their package path; a hyphenated package prefix is also
/// dropped when followed by an exported symbol (`user-service.NewHarness`
/// becomes `NewHarness`). Unnamed nodes fall back to the last two dotted
/// parts of the id without its `.spawn-N` suffix.
pub fn goroutine_name(node: &GoroutineNode) -> String {
    if !node.name.is_empty() {
        let short = after_last_slash(&node.name);
        if let Some((package, symbol)) = short.split_once('.') {
            let exported = symbol.chars().next().is_some_and(char::is_uppercase);
            if !package.is_empty() && package.contains('-') && exported {
                return symbol.to_string();
            }
        }
        return short.to_string();
    }

    let id = strip_spawn_suffix(&node.id);
    let parts: Vec<&str> = after_last_slash(id).split('.').collect();
    parts[parts.len().saturating_sub(2)..].join(".")
}

fn strip_spawn_suffix(id: &str) -> &str {
    match id.rfind(".spawn-") {
        Some(i) => {
            let digits = &id[i + ".spawn-".len()..];
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                &id[..i]
            } else {
                id
            }
        }
        None => id,
    }
}

/// `pkg/hub.WorkerPool.Start` -> `WorkerPool.Start`; shorter ids keep their
/// dotted form.
pub fn spawner_label(node_id: &str) -> String {
    let short = after_last_slash(node_id);
    let parts: Vec<&str> = short.split('.').collect();
    if parts.len() > 2 {
        parts[parts.len() - 2..].join(".")
    } else {
        short.to_string()
    }
}

/// `chan-pkg/hub-114` -> `hub`
pub fn channel_label(channel_id: &str) -> String {
    let id = channel_id.strip_prefix(CHANNEL_PREFIX).unwrap_or(channel_id);
    let id = match id.rsplit_once('-') {
        Some((head, line)) if !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()) => head,
        _ => id,
    };
    after_last_slash(id).to_string()
}
