//! Goroutine topology builder
//!
//! Scans `go` statements and channel operations in both standalone
//! functions and struct methods.

use std::collections::HashMap;

use archatlas_core::{
    Channel, ChannelDirection, ChannelEdge, ChannelEdgeKind, ChannelOperation, FunctionBody,
    GoroutineEdge, GoroutineKind, GoroutineNode, GoroutinePattern, GoroutineTopology,
    NodeLocation, Package, RawModel, SourceLocation, SpawnTarget, SpawnType,
};

use super::{LayerBuilder, UniqueIds};

/// A function or method body together with the ids it is known by.
struct Scope<'a> {
    pkg: &'a Package,
    /// `Func` or `Struct.method`, used in spawned node ids.
    parent: String,
    /// Node id of the goroutine or function running this body.
    owner_id: String,
    body: &'a FunctionBody,
}

fn location(loc: &SourceLocation) -> NodeLocation {
    NodeLocation {
        file: loc.file.clone(),
        line: loc.start_line,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoroutineTopologyBuilder;

impl GoroutineTopologyBuilder {
    pub fn new() -> Self {
        GoroutineTopologyBuilder
    }
}

impl LayerBuilder for GoroutineTopologyBuilder {
    type Output = GoroutineTopology;

    fn build(&self, model: &RawModel) -> GoroutineTopology {
        let mut nodes = Vec::new();
        let mut scopes = Vec::new();

        for pkg in &model.packages {
            for func in &pkg.functions {
                let is_main = func.name == "main" && pkg.name == "main";
                let owner_id = if is_main {
                    let id = format!("{}.main", pkg.id);
                    nodes.push(GoroutineNode {
                        id: id.clone(),
                        name: "main.main".to_string(),
                        kind: GoroutineKind::Main,
                        spawn_type: None,
                        package: pkg.id.clone(),
                        location: location(&func.location),
                        pattern: None,
                    });
                    id
                } else {
                    format!("{}.{}", pkg.id, func.name)
                };
                if let Some(body) = &func.body {
                    scopes.push(Scope {
                        pkg,
                        parent: func.name.clone(),
                        owner_id,
                        body,
                    });
                }
            }

            for s in &pkg.structs {
                for method in &s.methods {
                    if let Some(body) = &method.body {
                        let parent = format!("{}.{}", s.name, method.name);
                        scopes.push(Scope {
                            pkg,
                            owner_id: format!("{}.{}", pkg.id, parent),
                            parent,
                            body,
                        });
                    }
                }
            }
        }

        let mut ids = UniqueIds::default();
        let mut edges = Vec::new();
        for scope in &scopes {
            let mut anonymous = 0;
            for spawn in &scope.body.go_spawns {
                let call = &spawn.call;
                let (name, spawn_target) = if call.is_anonymous() {
                    anonymous += 1;
                    (format!("{}.func{}", scope.parent, anonymous), SpawnTarget::AnonymousFunc)
                } else if let Some(receiver) = call.receiver_type.as_deref().filter(|r| !r.is_empty()) {
                    (format!("{}.{}", receiver, call.function_name), SpawnTarget::Method)
                } else {
                    (call.display_target(), SpawnTarget::NamedFunc)
                };

                let id = ids.claim(format!(
                    "{}.{}.spawn-{}",
                    scope.pkg.id, scope.parent, spawn.location.start_line
                ));
                let pattern = spawn.pattern_hint.as_deref().and_then(|hint| {
                    let pattern = GoroutinePattern::from_hint(hint);
                    if pattern.is_none() {
                        tracing::debug!(hint, "unknown goroutine pattern hint");
                    }
                    pattern
                });

                nodes.push(GoroutineNode {
                    id: id.clone(),
                    name,
                    kind: GoroutineKind::Spawned,
                    spawn_type: Some(spawn_target),
                    package: scope.pkg.id.clone(),
                    location: location(&spawn.location),
                    pattern,
                });
                edges.push(GoroutineEdge {
                    from: scope.owner_id.clone(),
                    to: id,
                    spawn_type: if call.is_anonymous() {
                        SpawnType::GoFunc
                    } else {
                        SpawnType::GoStmt
                    },
                });
            }
        }

        let (channels, by_name) = collect_channels(&scopes);
        let channel_edges = link_channels(&scopes, &by_name);

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            channels = channels.len(),
            "built goroutine topology"
        );

        GoroutineTopology {
            nodes,
            edges,
            channels,
            channel_edges,
        }
    }
}

/// One channel per `make`, plus a `(package, name) -> channel id` map where
/// the first `make` of a name wins.
fn collect_channels(scopes: &[Scope<'_>]) -> (Vec<Channel>, HashMap<(String, String), String>) {
    let mut ids = UniqueIds::default();
    let mut channels = Vec::new();
    let mut by_name = HashMap::new();

    for scope in scopes {
        for op in &scope.body.channel_ops {
            if op.operation != ChannelOperation::Make {
                continue;
            }
            let id = ids.claim(format!("chan-{}-{}", scope.pkg.id, op.location.start_line));
            let element_type = op
                .element_type
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "chan".to_string());
            by_name
                .entry((scope.pkg.id.clone(), op.channel_name.clone()))
                .or_insert_with(|| id.clone());
            channels.push(Channel {
                id,
                name: op.channel_name.clone(),
                direction: ChannelDirection::from_type_text(&element_type),
                element_type,
                buffer_size: op.buffer_size,
                location: location(&op.location),
            });
        }
    }
    (channels, by_name)
}

/// make/send edges run from the owner to the channel, recv edges back out.
fn link_channels(
    scopes: &[Scope<'_>],
    by_name: &HashMap<(String, String), String>,
) -> Vec<ChannelEdge> {
    let mut edges = Vec::new();
    for scope in scopes {
        for op in &scope.body.channel_ops {
            let key = (scope.pkg.id.clone(), op.channel_name.clone());
            let Some(channel_id) = by_name.get(&key) else {
                tracing::trace!(channel = %op.channel_name, "channel not declared in package");
                continue;
            };
            let edge = match op.operation {
                ChannelOperation::Make => ChannelEdge {
                    from: scope.owner_id.clone(),
                    to: channel_id.clone(),
                    kind: ChannelEdgeKind::Make,
                },
                ChannelOperation::Send => ChannelEdge {
                    from: scope.owner_id.clone(),
                    to: channel_id.clone(),
                    kind: ChannelEdgeKind::Send,
                },
                ChannelOperation::Receive => ChannelEdge {
                    from: channel_id.clone(),
                    to: scope.owner_id.clone(),
                    kind: ChannelEdgeKind::Recv,
                },
                ChannelOperation::Close => continue,
            };
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }
    edges
}
