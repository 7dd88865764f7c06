//! CLI command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use archatlas_builder::{AtlasBuilder, AtlasConfig, ModuleInfo};
use archatlas_core::{AtlasBundle, Layer, RawModel};
use archatlas_render::{AtlasRenderer, FlowStyle, LayerSelection, RenderFormat};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Raw model JSON emitted by the front end
    #[arg(short, long)]
    pub input: PathBuf,

    /// Build config (.toml, .yaml, .yml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// go.mod used for import classification and framework detection
    #[arg(long)]
    pub go_mod: Option<PathBuf>,

    /// Layers to build, overriding the config file
    #[arg(long, value_delimiter = ',')]
    pub layers: Vec<Layer>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Layer to render, or `all`
    #[arg(short, long, default_value = "all")]
    pub layer: LayerSelection,

    /// Output format: mermaid or json
    #[arg(short, long, default_value = "mermaid")]
    pub format: RenderFormat,

    /// Draw the flow layer as a sequence diagram
    #[arg(long)]
    pub sequence: bool,

    /// Destination file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn build(args: &BuildArgs, output: Option<&Path>) -> anyhow::Result<()> {
    let atlas = build_bundle(args)?;
    let json = serde_json::to_string_pretty(&atlas).context("Failed to serialize atlas")?;
    write_output(&json, output)
}

pub fn render(atlas_path: &Path, args: &RenderArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(atlas_path)
        .with_context(|| format!("Failed to read atlas {}", atlas_path.display()))?;
    let atlas: AtlasBundle = serde_json::from_str(&content)
        .with_context(|| format!("Failed to decode atlas {}", atlas_path.display()))?;
    render_bundle(&atlas, args)
}

pub fn generate(build: &BuildArgs, render: &RenderArgs) -> anyhow::Result<()> {
    let atlas = build_bundle(build)?;
    render_bundle(&atlas, render)
}

pub fn build_bundle(args: &BuildArgs) -> anyhow::Result<AtlasBundle> {
    let model = load_raw_model(&args.input)?;

    let mut config = match &args.config {
        Some(path) => AtlasConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AtlasConfig::default(),
    };
    if !args.layers.is_empty() {
        config.layers = args.layers.clone();
    }

    let mut builder = AtlasBuilder::new(config).context("Invalid build configuration")?;
    if let Some(go_mod) = &args.go_mod {
        let module = ModuleInfo::load(go_mod)
            .with_context(|| format!("Failed to load {}", go_mod.display()))?;
        builder = builder.with_module(module);
    }

    tracing::info!(
        "Building atlas from {} ({} packages)",
        args.input.display(),
        model.packages.len()
    );
    Ok(builder.build(&model))
}

pub fn load_raw_model(path: &Path) -> anyhow::Result<RawModel> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read raw model {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to decode raw model {}", path.display()))
}

fn render_bundle(atlas: &AtlasBundle, args: &RenderArgs) -> anyhow::Result<()> {
    let style = if args.sequence {
        FlowStyle::Sequence
    } else {
        FlowStyle::Flowchart
    };
    let output = AtlasRenderer::new()
        .with_flow_style(style)
        .render(atlas, args.layer, args.format)
        .with_context(|| format!("Failed to render {} as {}", args.layer, args.format))?;

    for warning in &atlas.metadata.warnings {
        tracing::warn!("{}", warning);
    }
    write_output(&output.content, args.output.as_deref())
}

fn write_output(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
