//! ArchAtlas CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{BuildArgs, RenderArgs};

#[derive(Parser)]
#[command(name = "archatlas")]
#[command(about = "Architecture atlas diagrams for Go codebases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an atlas from a raw model
    Build {
        #[command(flatten)]
        build: BuildArgs,

        /// Atlas JSON destination (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a layer of a previously built atlas
    Render {
        /// Atlas JSON produced by `build`
        #[arg(short, long)]
        atlas: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },
    /// Build and render in one step
    Generate {
        #[command(flatten)]
        build: BuildArgs,

        #[command(flatten)]
        render: RenderArgs,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("archatlas={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Build { build, output } => commands::build(&build, output.as_deref()),
        Commands::Render { atlas, render } => commands::render(&atlas, &render),
        Commands::Generate { build, render } => commands::generate(&build, &render),
        Commands::Version => {
            println!("ArchAtlas v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
