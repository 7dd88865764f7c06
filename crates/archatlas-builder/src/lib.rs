//! Graph construction: interface matching, the four layer builders and atlas assembly

pub mod builders;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod frameworks;
pub mod matcher;
pub mod module;
pub mod type_ref;


#[cfg(test)]
pub mod test_utils;

pub use builders::{
    CapabilityGraphBuilder, FlowBuildOptions, FlowGraphBuilder, GoroutineTopologyBuilder,
    LayerBuilder, PackageGraphBuilder,
};
pub use config::{AtlasConfig, CustomFramework, CustomPattern, FlowOptions, ManualEntryPoint};
pub use coordinator::{build_atlas, AtlasBuilder};
pub use error::{ConfigError, ConfigResult, ModuleError};
pub use frameworks::FrameworkDetector;
pub use matcher::{match_implementations, InterfaceMatcher};
pub use module::{ImportClassifier, ImportKind, ModuleInfo};
