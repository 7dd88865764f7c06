//! Mermaid diagrams and JSON views of atlas layers

pub mod error;
pub mod renderer;
pub mod sanitize;
pub mod templates;


pub use error::{RenderError, RenderResult};
pub use renderer::{
    render_atlas, AtlasRenderer, LayerSelection, RenderFormat, RenderOutput, LAYER_SEPARATOR,
};
pub use sanitize::sanitize_id;
pub use templates::FlowStyle;
