//! Request flow as a flowchart of entry points or as a sequence diagram

use std::fmt;
use std::str::FromStr;

use archatlas_core::{EntryPoint, FlowGraph};
use serde::{Deserialize, Serialize};

use super::Lines;
use crate::sanitize::sanitize_id;

/// How the flow layer is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStyle {
    /// Entry points grouped by source directory, chains as edges.
    #[default]
    Flowchart,
    /// One call/return message pair per traced call.
    Sequence,
}

impl fmt::Display for FlowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStyle::Flowchart => f.write_str("flowchart"),
            FlowStyle::Sequence => f.write_str("sequence"),
        }
    }
}

impl FromStr for FlowStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flowchart" => Ok(FlowStyle::Flowchart),
            "sequence" => Ok(FlowStyle::Sequence),
            other => Err(format!("unknown flow style: {other}")),
        }
    }
}

pub fn render(graph: &FlowGraph, style: FlowStyle) -> String {
    match style {
        FlowStyle::Flowchart => render_flowchart(graph),
        FlowStyle::Sequence => render_sequence(graph),
    }
}

fn render_flowchart(graph: &FlowGraph) -> String {
    let mut out = Lines::new("flowchart LR");

    let mut dirs: Vec<(&str, Vec<&EntryPoint>)> = Vec::new();
    for entry in &graph.entry_points {
        let dir = dirname(&entry.location.file);
        match dirs.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, entries)) => entries.push(entry),
            None => dirs.push((dir, vec![entry])),
        }
    }

    for (dir, entries) in &dirs {
        out.blank();
        out.push(format!("  subgraph {}[\"{}\"]", sanitize_id(dir), dir));
        for entry in entries {
            out.push(format!("    {}[\"{}\"]", sanitize_id(&entry.id), entry_label(entry)));
        }
        out.push("  end");
    }

    for chain in &graph.call_chains {
        let Some(entry) = graph.entry_point(&chain.entry_point) else {
            continue;
        };
        let entry_id = sanitize_id(&entry.id);
        for call in &chain.calls {
            let from = sanitize_id(&call.from);
            let to = sanitize_id(&call.to);
            if from.is_empty() || to.is_empty() {
                continue;
            }
            if call.from == entry.handler {
                out.push(format!("  {} --> {}", entry_id, from));
            }
            out.push(format!("  {} --> {}", from, to));
        }
    }

    out.finish()
}

fn render_sequence(graph: &FlowGraph) -> String {
    let mut out = Lines::new("sequenceDiagram");

    for chain in &graph.call_chains {
        let Some(entry) = graph.entry_point(&chain.entry_point) else {
            continue;
        };
        let handler = sanitize_id(&entry.handler);
        if !handler.is_empty() {
            let subject = if entry.path.is_empty() { &entry.id } else { &entry.path };
            out.blank();
            out.push(format!("  Note over {}: {} {}", handler, entry.kind, subject));
        }
        for call in &chain.calls {
            let from = sanitize_id(&call.from);
            let to = sanitize_id(&call.to);
            if from.is_empty() || to.is_empty() {
                continue;
            }
            out.push(format!("  {}->>+{}: call", from, to));
            out.push(format!("  {}-->>-{}: return", to, from));
        }
    }

    out.finish()
}

/// `GET /users`, `CMD serve`; plain handlers show only their path.
pub fn entry_label(entry: &EntryPoint) -> String {
    let method = match entry.kind.as_str() {
        "http-handler" => return entry.path.clone(),
        "http-get" => "GET".to_string(),
        "http-post" => "POST".to_string(),
        "http-put" => "PUT".to_string(),
        "http-delete" => "DELETE".to_string(),
        "http-patch" => "PATCH".to_string(),
        "grpc-unary" | "grpc-stream" => "GRPC".to_string(),
        "cli-command" => "CMD".to_string(),
        other => other.to_uppercase(),
    };
    format!("{} {}", method, entry.path)
}

/// Directory part of a source path; `.` for bare names and manual entries.
pub fn dirname(file: &str) -> &str {
    if file == "manual" {
        return ".";
    }
    match file.rfind('/') {
        Some(0) => "/",
        Some(i) => &file[..i],
        None => ".",
    }
}
