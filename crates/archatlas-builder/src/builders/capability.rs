//! Capability graph builder
//!
//! Interface-centric: every interface node is kept, structs only when they
//! take part in at least one `implements` or `uses` edge.

use std::collections::{HashMap, HashSet};

use archatlas_core::{
    node_id, CapabilityEdge, CapabilityEdgeKind, CapabilityGraph, CapabilityNode,
    CapabilityNodeKind, ConcreteUsageRisk, DeclKind, EdgeContext, InferredImplementation,
    RawModel, ResolveContext, TypeDecl, TypeIndex,
};

use super::LayerBuilder;
use crate::matcher::InterfaceMatcher;
use crate::type_ref::TypeRef;

/// Confidence of every field-type `uses` edge.
pub const FIELD_TYPE_CONFIDENCE: f32 = 0.9;

/// Composite edge identity used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EdgeKey {
    kind: CapabilityEdgeKind,
    source: String,
    target: String,
}

/// Edges in first-seen order, unique by `(kind, source, target)`.
#[derive(Default)]
struct EdgeSet {
    seen: HashSet<EdgeKey>,
    edges: Vec<CapabilityEdge>,
}

impl EdgeSet {
    fn insert(&mut self, edge: CapabilityEdge) -> bool {
        let key = EdgeKey {
            kind: edge.kind,
            source: edge.source.clone(),
            target: edge.target.clone(),
        };
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push(edge);
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityGraphBuilder;

impl CapabilityGraphBuilder {
    pub fn new() -> Self {
        CapabilityGraphBuilder
    }

    /// Build from explicit implementation facts instead of the model's own.
    pub fn build_with(
        &self,
        model: &RawModel,
        implementations: &[InferredImplementation],
    ) -> CapabilityGraph {
        let index = TypeIndex::new(model);
        let all_nodes = candidate_nodes(model);

        let mut edges = EdgeSet::default();
        let mut risks = Vec::new();

        for imp in implementations {
            match resolve_implementation(&index, imp) {
                Some((source, target)) => {
                    edges.insert(CapabilityEdge {
                        id: format!("impl-{}-{}", source, target),
                        kind: CapabilityEdgeKind::Implements,
                        source,
                        target,
                        confidence: imp.confidence,
                        concrete_usage: false,
                        context: None,
                    });
                }
                None => tracing::debug!(
                    struct_name = %imp.struct_name,
                    interface_name = %imp.interface_name,
                    "implementation does not resolve to known types, skipping"
                ),
            }
        }

        for pkg in &model.packages {
            for s in &pkg.structs {
                let source = node_id(&pkg.id, &s.name);
                for field in &s.fields {
                    let Some(type_ref) = TypeRef::parse(&field.type_text) else {
                        continue;
                    };
                    let Some(target) = type_ref.resolve(&index, &pkg.id) else {
                        tracing::trace!(field_type = %field.type_text, "unresolved field type");
                        continue;
                    };
                    if target == source {
                        continue;
                    }

                    let concrete = matches!(index.lookup_node(&target), Some(TypeDecl::Struct(_)));
                    let location = field.location.reference();
                    let inserted = edges.insert(CapabilityEdge {
                        id: format!("uses-{}-{}", source, type_ref.name),
                        kind: CapabilityEdgeKind::Uses,
                        source: source.clone(),
                        target: target.clone(),
                        confidence: FIELD_TYPE_CONFIDENCE,
                        concrete_usage: concrete,
                        context: Some(EdgeContext {
                            field_type: true,
                            usage_locations: vec![location.clone()],
                        }),
                    });
                    if inserted && concrete {
                        risks.push(ConcreteUsageRisk {
                            owner: source.clone(),
                            field_type: field.type_text.clone(),
                            concrete_type: target,
                            location,
                        });
                    }
                }
            }
        }

        let edges = edges.edges;
        let nodes = prune_and_measure(all_nodes, &edges);

        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "built capability graph");

        CapabilityGraph {
            nodes,
            edges,
            concrete_usage_risks: risks,
        }
    }
}

impl LayerBuilder for CapabilityGraphBuilder {
    type Output = CapabilityGraph;

    /// Uses supplied implementations when present, otherwise runs the matcher.
    fn build(&self, model: &RawModel) -> CapabilityGraph {
        match model.supplied_implementations() {
            Some(supplied) => self.build_with(model, supplied),
            None => {
                let index = TypeIndex::new(model);
                let inferred = InterfaceMatcher::new(&index).match_all();
                self.build_with(model, &inferred)
            }
        }
    }
}

/// Interface and struct nodes for every declaration, first declaration wins.
fn candidate_nodes(model: &RawModel) -> Vec<CapabilityNode> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for pkg in &model.packages {
        for iface in &pkg.interfaces {
            let id = node_id(&pkg.id, &iface.name);
            if seen.insert(id.clone()) {
                nodes.push(CapabilityNode {
                    id,
                    name: iface.name.clone(),
                    kind: CapabilityNodeKind::Interface,
                    package: pkg.id.clone(),
                    exported: iface.exported,
                    method_count: iface.methods.len(),
                    field_count: 0,
                    fan_in: 0,
                    fan_out: 0,
                });
            }
        }
        for s in &pkg.structs {
            let id = node_id(&pkg.id, &s.name);
            if seen.insert(id.clone()) {
                nodes.push(CapabilityNode {
                    id,
                    name: s.name.clone(),
                    kind: CapabilityNodeKind::Struct,
                    package: pkg.id.clone(),
                    exported: s.exported,
                    method_count: s.methods.len(),
                    field_count: s.fields.len(),
                    fan_in: 0,
                    fan_out: 0,
                });
            }
        }
    }
    nodes
}

/// Resolve both ends of an implementation fact to node ids.
fn resolve_implementation(
    index: &TypeIndex<'_>,
    imp: &InferredImplementation,
) -> Option<(String, String)> {
    let by_methods = ResolveContext {
        referencing_package: None,
        required_methods: &imp.matched_methods,
    };
    let struct_pkg = index.resolve_package(
        &imp.struct_package_id,
        &imp.struct_name,
        DeclKind::Struct,
        by_methods,
    );
    let iface_pkg = index.resolve_package(
        &imp.interface_package_id,
        &imp.interface_name,
        DeclKind::Interface,
        ResolveContext {
            referencing_package: struct_pkg,
            ..by_methods
        },
    )?;
    let struct_pkg = match struct_pkg {
        Some(pkg) => pkg,
        None => index.resolve_package(
            &imp.struct_package_id,
            &imp.struct_name,
            DeclKind::Struct,
            ResolveContext {
                referencing_package: Some(iface_pkg),
                ..by_methods
            },
        )?,
    };

    Some((
        node_id(struct_pkg, &imp.struct_name),
        node_id(iface_pkg, &imp.interface_name),
    ))
}

/// Keep all interfaces plus every node touched by an edge, and fill in fan-in/out.
fn prune_and_measure(nodes: Vec<CapabilityNode>, edges: &[CapabilityEdge]) -> Vec<CapabilityNode> {
    let mut fan_out: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut fan_in: HashMap<&str, HashSet<&str>> = HashMap::new();
    for edge in edges {
        fan_out
            .entry(edge.source.as_str())
            .or_default()
            .insert(edge.target.as_str());
        fan_in
            .entry(edge.target.as_str())
            .or_default()
            .insert(edge.source.as_str());
    }

    nodes
        .into_iter()
        .filter(|n| {
            n.kind == CapabilityNodeKind::Interface
                || fan_out.contains_key(n.id.as_str())
                || fan_in.contains_key(n.id.as_str())
        })
        .map(|mut n| {
            n.fan_out = fan_out.get(n.id.as_str()).map_or(0, HashSet::len);
            n.fan_in = fan_in.get(n.id.as_str()).map_or(0, HashSet::len);
            n
        })
        .collect()
}
