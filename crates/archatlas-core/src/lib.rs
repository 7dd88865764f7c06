//! ArchAtlas Core — raw model, derived graph types, and package-aware type index

pub mod graph;
pub mod model;
pub mod symbols;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use graph::{
    AtlasBundle, AtlasLayers, AtlasMetadata, Call, CallChain, CallKind, CapabilityEdge,
    CapabilityEdgeKind, CapabilityGraph, CapabilityNode, CapabilityNodeKind, Channel,
    ChannelDirection, ChannelEdge, ChannelEdgeKind, ConcreteUsageRisk, CycleSeverity, EdgeContext,
    EntryPoint, FlowGraph, FunctionBodyStrategy, GenerationStrategy, GoroutineEdge, GoroutineKind,
    GoroutineNode, GoroutinePattern, GoroutineTopology, HttpMethod, Layer, NodeLocation,
    PackageCycle, PackageEdge, PackageGraph, PackageKind, PackageNode, PackageStats,
    PerformanceCounters, SpawnTarget, SpawnType, UnknownLayer, ATLAS_VERSION,
};
pub use model::{
    is_exported, CallExpr, ChannelOp, ChannelOperation, Field, FrontEndStats, Function,
    FunctionBody, Import, ImplementationSource, InferredImplementation, Interface, Method,
    Package, RawModel, SourceLocation, SpawnStmt, Struct, ANONYMOUS_FUNCTION,
};
pub use symbols::{node_id, DeclKind, ResolveContext, TypeDecl, TypeIndex};
