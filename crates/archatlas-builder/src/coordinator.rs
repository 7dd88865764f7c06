//! Atlas assembly: filters the raw model, runs the requested layer builders
//! in parallel and bundles their output with generation metadata.

use std::collections::BTreeMap;
use std::time::Instant;

use archatlas_core::{
    AtlasBundle, AtlasLayers, AtlasMetadata, FunctionBodyStrategy, GenerationStrategy, Layer,
    Package, PerformanceCounters, RawModel,
};
use globset::GlobSet;

use crate::builders::{
    CapabilityGraphBuilder, FlowBuildOptions, FlowGraphBuilder, GoroutineTopologyBuilder,
    LayerBuilder, PackageGraphBuilder,
};
use crate::config::AtlasConfig;
use crate::error::ConfigResult;
use crate::frameworks::FrameworkDetector;
use crate::module::{ImportClassifier, ModuleInfo};

pub const PACKAGE_COMPLETENESS: f32 = 1.0;
pub const CAPABILITY_COMPLETENESS: f32 = 0.85;
pub const FLOW_COMPLETENESS: f32 = 0.6;

/// Builds atlas bundles for one configuration.
pub struct AtlasBuilder {
    config: AtlasConfig,
    exclusions: GlobSet,
    module: Option<ModuleInfo>,
}

impl AtlasBuilder {
    /// Validates the config and compiles its exclusion globs.
    pub fn new(config: AtlasConfig) -> ConfigResult<Self> {
        config.validate()?;
        let exclusions = config.exclusion_set()?;
        Ok(AtlasBuilder {
            config,
            exclusions,
            module: None,
        })
    }

    /// Use a parsed `go.mod` for import classification and framework detection.
    pub fn with_module(mut self, module: ModuleInfo) -> Self {
        self.module = Some(module);
        self
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn build(&self, raw: &RawModel) -> AtlasBundle {
        let started = Instant::now();
        let model = self.filter(raw);
        let excluded = raw.packages.len() - model.packages.len();
        if excluded > 0 {
            tracing::debug!(excluded, "excluded packages from build");
        }

        let module_path = match &self.module {
            Some(module) => module.path.clone(),
            None => model.module_name.clone(),
        };
        let detected = FrameworkDetector::new().detect(self.module.as_ref(), &model);

        let package_builder = PackageGraphBuilder::new(ImportClassifier::new(module_path))
            .with_external(self.config.package.include_external);
        let capability_builder = CapabilityGraphBuilder::new();
        let goroutine_builder = GoroutineTopologyBuilder::new();
        let flow_builder =
            FlowGraphBuilder::new(FlowBuildOptions::new(detected.clone(), &self.config.flow));

        let mut layers = AtlasLayers::default();
        {
            let AtlasLayers {
                package,
                capability,
                goroutine,
                flow,
            } = &mut layers;
            let model = &model;
            rayon::scope(|s| {
                if self.config.wants(Layer::Package) {
                    s.spawn(move |_| *package = Some(package_builder.build(model)));
                }
                if self.config.wants(Layer::Capability) {
                    s.spawn(move |_| *capability = Some(capability_builder.build(model)));
                }
                if self.config.wants(Layer::Goroutine) {
                    s.spawn(move |_| *goroutine = Some(goroutine_builder.build(model)));
                }
                if self.config.wants(Layer::Flow) {
                    s.spawn(move |_| *flow = Some(flow_builder.build(model)));
                }
            });
        }

        let metadata = AtlasMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            generation_strategy: GenerationStrategy {
                function_body_strategy: self.config.function_body_strategy,
                implementation_source: if model.supplied_implementations().is_some() {
                    "supplied".to_string()
                } else {
                    "inferred".to_string()
                },
                detected_frameworks: detected.into_iter().collect(),
                protocols: self.config.flow.protocols.clone(),
                follow_indirect_calls: self.config.flow.follow_indirect_calls,
            },
            completeness: completeness(&layers, self.config.function_body_strategy),
            performance: PerformanceCounters {
                file_count: model.file_count(),
                parse_time_ms: model.stats.map_or(0.0, |s| s.parse_time_ms),
                total_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                memory_usage: model.stats.map_or(0, |s| s.memory_usage),
            },
            warnings: self.warnings(&model, &layers, excluded),
        };

        tracing::info!(
            layers = ?layers.present(),
            packages = model.packages.len(),
            total_ms = metadata.performance.total_time_ms,
            "built atlas"
        );

        AtlasBundle::new(layers, metadata)
    }

    /// Copy of the model without excluded and (optionally) test packages.
    fn filter(&self, raw: &RawModel) -> RawModel {
        let mut model = raw.clone();
        model.packages.retain(|pkg| {
            if self.exclusions.is_match(&pkg.id)
                || (!pkg.dir_path.is_empty() && self.exclusions.is_match(&pkg.dir_path))
            {
                return false;
            }
            !(self.config.exclude_tests && is_test_package(pkg))
        });
        model
    }

    fn warnings(&self, model: &RawModel, layers: &AtlasLayers, excluded: usize) -> Vec<String> {
        let mut warnings = Vec::new();
        if model.packages.is_empty() {
            warnings.push(if excluded > 0 {
                "every package was excluded by the build filters".to_string()
            } else {
                "raw model contains no packages".to_string()
            });
        }

        let has_bodies = model.packages.iter().any(|pkg| {
            pkg.functions.iter().any(|f| f.body.is_some())
                || pkg
                    .structs
                    .iter()
                    .any(|s| s.methods.iter().any(|m| m.body.is_some()))
        });
        if !has_bodies && (layers.goroutine.is_some() || layers.flow.is_some()) {
            warnings.push(
                "raw model carries no function bodies; goroutine and flow layers only reflect declarations"
                    .to_string(),
            );
        }
        warnings
    }
}

/// Test-only packages: `_test` package names or only `_test.go` sources.
pub fn is_test_package(pkg: &Package) -> bool {
    pkg.name.ends_with("_test")
        || (!pkg.source_files.is_empty()
            && pkg.source_files.iter().all(|f| f.ends_with("_test.go")))
}

/// Completeness ratio per present layer.
pub fn completeness(layers: &AtlasLayers, strategy: FunctionBodyStrategy) -> BTreeMap<Layer, f32> {
    layers
        .present()
        .into_iter()
        .map(|layer| {
            let ratio = match (layer, strategy) {
                (Layer::Package, _) => PACKAGE_COMPLETENESS,
                (Layer::Capability, _) => CAPABILITY_COMPLETENESS,
                (Layer::Goroutine, FunctionBodyStrategy::Full) => 0.7,
                (Layer::Goroutine, FunctionBodyStrategy::Selective) => 0.5,
                (Layer::Goroutine, FunctionBodyStrategy::None) => 0.0,
                (Layer::Flow, FunctionBodyStrategy::None) => 0.0,
                (Layer::Flow, _) => FLOW_COMPLETENESS,
            };
            (layer, ratio)
        })
        .collect()
}

/// Build an atlas with a given config in one call.
pub fn build_atlas(model: &RawModel, config: AtlasConfig) -> ConfigResult<AtlasBundle> {
    Ok(AtlasBuilder::new(config)?.build(model))
}
