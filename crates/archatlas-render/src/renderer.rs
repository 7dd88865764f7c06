//! Layer selection and output formats over a built atlas

use std::fmt;
use std::str::FromStr;

use archatlas_core::{AtlasBundle, Layer, UnknownLayer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::templates::{self, FlowStyle};

/// Separator placed between diagrams when every layer is rendered.
pub const LAYER_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Mermaid,
    Json,
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFormat::Mermaid => f.write_str("mermaid"),
            RenderFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for RenderFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mermaid" => Ok(RenderFormat::Mermaid),
            "json" => Ok(RenderFormat::Json),
            other => Err(RenderError::UnknownFormat(other.to_string())),
        }
    }
}

/// A single layer or every layer present in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSelection {
    One(Layer),
    All,
}

impl fmt::Display for LayerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSelection::One(layer) => layer.fmt(f),
            LayerSelection::All => f.write_str("all"),
        }
    }
}

impl FromStr for LayerSelection {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(LayerSelection::All);
        }
        s.parse().map(LayerSelection::One)
    }
}

impl From<Layer> for LayerSelection {
    fn from(layer: Layer) -> Self {
        LayerSelection::One(layer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub content: String,
    pub format: RenderFormat,
    pub layer: LayerSelection,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AtlasRenderer {
    flow_style: FlowStyle,
}

impl AtlasRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flow_style(mut self, style: FlowStyle) -> Self {
        self.flow_style = style;
        self
    }

    pub fn flow_style(&self) -> FlowStyle {
        self.flow_style
    }

    pub fn render(
        &self,
        atlas: &AtlasBundle,
        layer: LayerSelection,
        format: RenderFormat,
    ) -> RenderResult<RenderOutput> {
        let content = match (layer, format) {
            (LayerSelection::One(layer), RenderFormat::Mermaid) => self.mermaid(atlas, layer)?,
            (LayerSelection::One(layer), RenderFormat::Json) => json(atlas, layer)?,
            (LayerSelection::All, RenderFormat::Mermaid) => atlas
                .layers
                .present()
                .into_iter()
                .map(|layer| self.mermaid(atlas, layer))
                .collect::<RenderResult<Vec<_>>>()?
                .join(LAYER_SEPARATOR),
            (LayerSelection::All, RenderFormat::Json) => serde_json::to_string_pretty(&atlas.layers)?,
        };
        debug!(layer = %layer, format = %format, bytes = content.len(), "Rendered atlas");
        Ok(RenderOutput {
            content,
            format,
            layer,
        })
    }

    fn mermaid(&self, atlas: &AtlasBundle, layer: Layer) -> RenderResult<String> {
        let missing = || RenderError::LayerNotAvailable(layer);
        let layers = &atlas.layers;
        Ok(match layer {
            Layer::Package => templates::package::render(layers.package.as_ref().ok_or_else(missing)?),
            Layer::Capability => {
                templates::capability::render(layers.capability.as_ref().ok_or_else(missing)?)
            }
            Layer::Goroutine => {
                templates::goroutine::render(layers.goroutine.as_ref().ok_or_else(missing)?)
            }
            Layer::Flow => {
                templates::flow::render(layers.flow.as_ref().ok_or_else(missing)?, self.flow_style)
            }
        })
    }
}

fn json(atlas: &AtlasBundle, layer: Layer) -> RenderResult<String> {
    let missing = || RenderError::LayerNotAvailable(layer);
    let layers = &atlas.layers;
    let content = match layer {
        Layer::Package => serde_json::to_string_pretty(layers.package.as_ref().ok_or_else(missing)?)?,
        Layer::Capability => {
            serde_json::to_string_pretty(layers.capability.as_ref().ok_or_else(missing)?)?
        }
        Layer::Goroutine => {
            serde_json::to_string_pretty(layers.goroutine.as_ref().ok_or_else(missing)?)?
        }
        Layer::Flow => serde_json::to_string_pretty(layers.flow.as_ref().ok_or_else(missing)?)?,
    };
    Ok(content)
}

/// Render with the default flow style.
pub fn render_atlas(
    atlas: &AtlasBundle,
    layer: LayerSelection,
    format: RenderFormat,
) -> RenderResult<RenderOutput> {
    AtlasRenderer::new().render(atlas, layer, format)
}
