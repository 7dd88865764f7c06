//! Build configuration
//!
//! Loaded from TOML, YAML or JSON depending on the file extension. Every
//! field has a default so partial files are fine.

use std::path::Path;

use archatlas_core::{FunctionBodyStrategy, Layer};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Call depth used when `follow_indirect_calls` is set without an explicit depth.
pub const DEFAULT_INDIRECT_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Layers to generate.
    pub layers: Vec<Layer>,
    pub function_body_strategy: FunctionBodyStrategy,
    /// Drop `_test` packages and packages made only of `_test.go` files.
    pub exclude_tests: bool,
    /// Globs matched against package ids and directory paths.
    pub exclude_patterns: Vec<String>,
    pub package: PackageOptions,
    pub flow: FlowOptions,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        AtlasConfig {
            layers: Layer::ALL.to_vec(),
            function_body_strategy: FunctionBodyStrategy::default(),
            exclude_tests: false,
            exclude_patterns: Vec::new(),
            package: PackageOptions::default(),
            flow: FlowOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PackageOptions {
    /// Emit nodes for third-party import targets.
    pub include_external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FlowOptions {
    /// Protocol allow-list applied after entry point detection.
    pub protocols: Option<Vec<String>>,
    pub custom_frameworks: Vec<CustomFramework>,
    pub entry_points: Vec<ManualEntryPoint>,
    pub follow_indirect_calls: bool,
    pub max_call_depth: Option<usize>,
}

impl FlowOptions {
    /// Maximum number of call hops traced from a handler.
    pub fn effective_call_depth(&self) -> usize {
        if !self.follow_indirect_calls {
            return 1;
        }
        self.max_call_depth.unwrap_or(DEFAULT_INDIRECT_DEPTH).max(1)
    }
}

/// A user-defined framework whose registration calls mark entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFramework {
    pub name: String,
    pub protocol: String,
    pub patterns: Vec<CustomPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CustomPattern {
    /// Exact call name.
    pub method: Option<String>,
    /// Call name suffix, e.g. `Server` for `RegisterFooServer`.
    pub method_suffix: Option<String>,
    /// Substring required in the call's receiver type.
    pub receiver_contains: Option<String>,
    pub path_arg_index: Option<usize>,
    pub handler_arg_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEntryPoint {
    /// Fully qualified handler, e.g. `pkg/api.(*Server).Run`.
    pub function: String,
    pub protocol: String,
}

impl AtlasConfig {
    /// Load a config file, picking the decoder from its extension.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config = match ext.as_str() {
            "toml" => Self::from_toml_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        tracing::debug!(path = %path.display(), "loaded atlas config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: AtlasConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: AtlasConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: AtlasConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.layers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one layer must be requested".to_string(),
            ));
        }

        for framework in &self.flow.custom_frameworks {
            if framework.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "custom framework with empty name".to_string(),
                ));
            }
            for pattern in &framework.patterns {
                if pattern.method.is_none() && pattern.method_suffix.is_none() {
                    return Err(ConfigError::Validation(format!(
                        "custom framework '{}' has a pattern with neither method nor method_suffix",
                        framework.name
                    )));
                }
            }
        }

        for entry in &self.flow.entry_points {
            if entry.function.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "manual entry point with empty function".to_string(),
                ));
            }
        }

        if self.flow.max_call_depth == Some(0) {
            return Err(ConfigError::Validation(
                "flow.max_call_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn wants(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }

    /// Compile `exclude_patterns` into one matcher.
    pub fn exclusion_set(&self) -> ConfigResult<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidPattern {
            pattern: self.exclude_patterns.join(","),
            source,
        })
    }
}
