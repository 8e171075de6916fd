//! Vellum CLI
//!
//! Replay scene scripts against the desktop compositor and write the composed
//! frame to PNG.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vellum_compositor::{CompositorConfig, Desktop};

mod scene;

use scene::Scene;

#[derive(Parser)]
#[command(name = "vellum")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vellum desktop compositor", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Compositor configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scene and write the composed desktop
    Render {
        /// Scene file
        scene: PathBuf,

        /// Output PNG
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,
    },

    /// Parse a scene and report what replaying it would do
    Check {
        /// Scene file
        scene: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render { scene, output } => cmd_render(config, &scene, &output),
        Commands::Check { scene } => cmd_check(config, &scene),
    }
}

fn load_config(path: Option<&Path>) -> Result<CompositorConfig> {
    match path {
        Some(path) => CompositorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(CompositorConfig::default()),
    }
}

fn cmd_render(config: CompositorConfig, scene_path: &Path, output: &Path) -> Result<()> {
    let scene = Scene::load(scene_path)?;
    let mut desktop = Desktop::new(config)?;

    let replay = scene.replay(&mut desktop)?;
    let frame = desktop.render()?;

    frame
        .as_image()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Rendered {} ({} applied, {} skipped) to {}",
        scene_path.display(),
        replay.applied,
        replay.skipped,
        output.display()
    );
    Ok(())
}

fn cmd_check(config: CompositorConfig, scene_path: &Path) -> Result<()> {
    let scene = Scene::load(scene_path)?;
    scene.pictures()?;

    let mut desktop = Desktop::new(config)?;
    let replay = scene.replay(&mut desktop)?;
    if replay.skipped > 0 {
        anyhow::bail!(
            "{}: {} of {} steps would be skipped",
            scene_path.display(),
            replay.skipped,
            replay.applied + replay.skipped
        );
    }

    info!(
        "{}: {} pictures, {} windows, {} operations",
        scene_path.display(),
        scene.pictures.len(),
        scene.windows.len(),
        scene.ops.len()
    );
    Ok(())
}
