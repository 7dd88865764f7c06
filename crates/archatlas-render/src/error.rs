//! Render error types

use archatlas_core::Layer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The requested layer was not generated for this atlas.
    #[error("{} layer not available", .0.display_name())]
    LayerNotAvailable(Layer),

    #[error("Failed to serialize layer: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unknown render format '{0}'. Use mermaid or json")]
    UnknownFormat(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
