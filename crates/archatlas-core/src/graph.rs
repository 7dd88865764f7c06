//! Derived graph entities for the four atlas layers and the atlas bundle.
//!
//! Node ids are the only join key between nodes, edges and layers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Layers ──────────────────────────────────────────────────

/// One independently constructible graph view of a codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Package,
    Capability,
    Goroutine,
    Flow,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Package, Layer::Capability, Layer::Goroutine, Layer::Flow];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Package => "package",
            Layer::Capability => "capability",
            Layer::Goroutine => "goroutine",
            Layer::Flow => "flow",
        }
    }

    /// Capitalized name used in user-facing messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Layer::Package => "Package",
            Layer::Capability => "Capability",
            Layer::Goroutine => "Goroutine",
            Layer::Flow => "Flow",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLayer(pub String);

impl fmt::Display for UnknownLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown layer: {}", self.0)
    }
}

impl std::error::Error for UnknownLayer {}

impl FromStr for Layer {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "package" => Ok(Layer::Package),
            "capability" => Ok(Layer::Capability),
            "goroutine" => Ok(Layer::Goroutine),
            "flow" => Ok(Layer::Flow),
            other => Err(UnknownLayer(other.to_string())),
        }
    }
}

// ── Package graph ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Internal,
    Cmd,
    Tests,
    Examples,
    Testutil,
    Vendor,
    External,
}

impl PackageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageKind::Internal => "internal",
            PackageKind::Cmd => "cmd",
            PackageKind::Tests => "tests",
            PackageKind::Examples => "examples",
            PackageKind::Testutil => "testutil",
            PackageKind::Vendor => "vendor",
            PackageKind::External => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PackageStats {
    pub structs: usize,
    pub interfaces: usize,
    pub functions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    /// Import path, e.g. `github.com/acme/app/pkg/hub`.
    pub id: String,
    /// Module-relative path, e.g. `pkg/hub`.
    pub name: String,
    pub kind: PackageKind,
    pub file_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PackageStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEdge {
    pub from: String,
    pub to: String,
    /// Number of import references from `from` to `to`.
    pub strength: u32,
    pub import_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    Warning,
    Error,
}

impl CycleSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleSeverity::Warning => "warning",
            CycleSeverity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageCycle {
    /// Package ids in traversal order.
    pub packages: Vec<String>,
    pub severity: CycleSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PackageGraph {
    pub nodes: Vec<PackageNode>,
    pub edges: Vec<PackageEdge>,
    pub cycles: Vec<PackageCycle>,
}

// ── Capability graph ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityNodeKind {
    Interface,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityNode {
    /// `{declaringPackageFullId}.{TypeName}`
    pub id: String,
    pub name: String,
    pub kind: CapabilityNodeKind,
    pub package: String,
    pub exported: bool,
    #[serde(default)]
    pub method_count: usize,
    #[serde(default)]
    pub field_count: usize,
    #[serde(default)]
    pub fan_in: usize,
    #[serde(default)]
    pub fan_out: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityEdgeKind {
    Implements,
    Uses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EdgeContext {
    #[serde(default)]
    pub field_type: bool,
    /// `file:line` references.
    #[serde(default)]
    pub usage_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityEdge {
    pub id: String,
    pub kind: CapabilityEdgeKind,
    pub source: String,
    pub target: String,
    pub confidence: f32,
    /// Set when a `uses` edge targets a struct rather than an interface.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub concrete_usage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EdgeContext>,
}

/// A struct field that depends on a concrete struct instead of an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcreteUsageRisk {
    pub owner: String,
    pub field_type: String,
    pub concrete_type: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityGraph {
    pub nodes: Vec<CapabilityNode>,
    pub edges: Vec<CapabilityEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concrete_usage_risks: Vec<ConcreteUsageRisk>,
}

impl CapabilityGraph {
    pub fn node(&self, id: &str) -> Option<&CapabilityNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_of_kind(&self, kind: CapabilityEdgeKind) -> impl Iterator<Item = &CapabilityEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

// ── Goroutine topology ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoroutineKind {
    Main,
    Spawned,
}

/// How the spawned function was named at the `go` site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnTarget {
    NamedFunc,
    AnonymousFunc,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoroutinePattern {
    WorkerPool,
    Pipeline,
    FanOut,
    FanIn,
    ProducerConsumer,
}

impl GoroutinePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            GoroutinePattern::WorkerPool => "worker-pool",
            GoroutinePattern::Pipeline => "pipeline",
            GoroutinePattern::FanOut => "fan-out",
            GoroutinePattern::FanIn => "fan-in",
            GoroutinePattern::ProducerConsumer => "producer-consumer",
        }
    }

    /// Parse a front-end hint; unknown hints yield `None`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "worker-pool" => Some(GoroutinePattern::WorkerPool),
            "pipeline" => Some(GoroutinePattern::Pipeline),
            "fan-out" => Some(GoroutinePattern::FanOut),
            "fan-in" => Some(GoroutinePattern::FanIn),
            "producer-consumer" => Some(GoroutinePattern::ProducerConsumer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeLocation {
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineNode {
    pub id: String,
    pub name: String,
    pub kind: GoroutineKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_type: Option<SpawnTarget>,
    pub package: String,
    pub location: NodeLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<GoroutinePattern>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpawnType {
    GoFunc,
    GoStmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineEdge {
    pub from: String,
    pub to: String,
    pub spawn_type: SpawnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDirection {
    Send,
    Receive,
    Bidirectional,
}

impl ChannelDirection {
    /// Direction implied by channel type text (`<-chan T`, `chan<- T`, `chan T`).
    pub fn from_type_text(type_text: &str) -> Self {
        let t = type_text.trim();
        if t.starts_with("<-chan") {
            ChannelDirection::Receive
        } else if t.starts_with("chan<-") || t.starts_with("chan <-") {
            ChannelDirection::Send
        } else {
            ChannelDirection::Bidirectional
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Channel type text, `chan` when the front end did not report one.
    pub element_type: String,
    pub direction: ChannelDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u32>,
    pub location: NodeLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelEdgeKind {
    Make,
    Send,
    Recv,
}

impl ChannelEdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelEdgeKind::Make => "make",
            ChannelEdgeKind::Send => "send",
            ChannelEdgeKind::Recv => "recv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEdge {
    /// Goroutine/function id for make and send, channel id for recv.
    pub from: String,
    pub to: String,
    pub kind: ChannelEdgeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GoroutineTopology {
    pub nodes: Vec<GoroutineNode>,
    pub edges: Vec<GoroutineEdge>,
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub channel_edges: Vec<ChannelEdge>,
}

// ── Flow graph ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Any,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Any => "ANY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub id: String,
    /// Combined protocol/method tag, e.g. `http-get`, `cli-command`.
    pub kind: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    pub framework: String,
    pub path: String,
    /// Handler function id; empty for inline closures.
    pub handler: String,
    pub middleware: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub location: NodeLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Direct,
    Interface,
    Indirect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub from: String,
    pub to: String,
    pub kind: CallKind,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChain {
    pub id: String,
    /// Id of the entry point this chain starts from.
    pub entry_point: String,
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub entry_points: Vec<EntryPoint>,
    pub call_chains: Vec<CallChain>,
}

impl FlowGraph {
    pub fn entry_point(&self, id: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.id == id)
    }
}

// ── Atlas bundle ────────────────────────────────────────────

pub const ATLAS_VERSION: &str = "1.0";

/// Generated layers; absent layers are omitted when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AtlasLayers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goroutine: Option<GoroutineTopology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowGraph>,
}

impl AtlasLayers {
    pub fn contains(&self, layer: Layer) -> bool {
        match layer {
            Layer::Package => self.package.is_some(),
            Layer::Capability => self.capability.is_some(),
            Layer::Goroutine => self.goroutine.is_some(),
            Layer::Flow => self.flow.is_some(),
        }
    }

    /// Present layers in canonical order.
    pub fn present(&self) -> Vec<Layer> {
        Layer::ALL.into_iter().filter(|l| self.contains(*l)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionBodyStrategy {
    None,
    #[default]
    Selective,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStrategy {
    pub function_body_strategy: FunctionBodyStrategy,
    /// `supplied` when implementations came with the raw model, `inferred` otherwise.
    pub implementation_source: String,
    pub detected_frameworks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    pub follow_indirect_calls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceCounters {
    pub file_count: usize,
    pub parse_time_ms: f64,
    pub total_time_ms: f64,
    pub memory_usage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AtlasMetadata {
    pub generated_at: String,
    pub generation_strategy: GenerationStrategy,
    /// Completeness ratio (0..1) per present layer.
    pub completeness: BTreeMap<Layer, f32>,
    pub performance: PerformanceCounters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AtlasBundle {
    pub version: String,
    pub layers: AtlasLayers,
    pub metadata: AtlasMetadata,
}

impl AtlasBundle {
    pub fn new(layers: AtlasLayers, metadata: AtlasMetadata) -> Self {
        AtlasBundle {
            version: ATLAS_VERSION.to_string(),
            layers,
            metadata,
        }
    }
}
