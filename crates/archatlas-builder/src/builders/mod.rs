//! Layer builders
//!
//! Each builder is a pure function of one `RawModel` snapshot, so the
//! coordinator can run them on separate threads.

pub mod capability;
pub mod flow;
pub mod goroutine;
pub mod package;

use archatlas_core::RawModel;

pub use capability::CapabilityGraphBuilder;
pub use flow::{FlowBuildOptions, FlowGraphBuilder};
pub use goroutine::GoroutineTopologyBuilder;
pub use package::PackageGraphBuilder;

/// A builder for one atlas layer.
pub trait LayerBuilder: Send + Sync {
    type Output: Send;

    fn build(&self, model: &RawModel) -> Self::Output;
}

/// Hands out ids, suffixing repeats with `-2`, `-3`, ...
#[derive(Debug, Default)]
pub(crate) struct UniqueIds {
    seen: std::collections::HashMap<String, usize>,
}

impl UniqueIds {
    pub(crate) fn claim(&mut self, base: String) -> String {
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{}-{}", base, count)
        }
    }
}
