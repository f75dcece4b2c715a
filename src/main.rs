//! Container image builder
//!
//! Builds a container image from a Dockerfile and pushes every tag to its
//! image repository, using either Docker or Podman.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use image_builder::docker;
use image_builder::engine::Engine;

mod config;

use config::Config;

/// Command-line interface for the image builder
#[derive(Parser)]
#[command(
    name = "image-builder",
    about = "Build and push container images",
    after_help = "ENVIRONMENT VARIABLES:
  CONTAINER_ENGINE        Container engine to use (default: docker)
  RUST_LOG                Log filter (default: info)

EXAMPLES:
  image-builder build -t ghcr.io/acme/app:v1
  image-builder build -f build/Dockerfile -c build -t app:v1,app:latest
  CONTAINER_ENGINE=podman image-builder build -t app:v1"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a Docker image from a Dockerfile and push it to an image repository
    Build(BuildArgs),
}

/// Arguments of the `build` subcommand
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the Dockerfile
    #[arg(short, long, value_name = "PATH", default_value = "./Dockerfile")]
    file: PathBuf,

    /// A path to the build context
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    context: PathBuf,

    /// A comma-separated list of name:tag
    #[arg(short, long, value_name = "LIST", default_value = "")]
    tags: String,

    /// Container engine to use, docker or podman (default: $CONTAINER_ENGINE or docker)
    #[arg(long, value_name = "ENGINE")]
    engine: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Build(args) => run_build(args),
    };
    check(result);
}

/// Builds the image, then pushes each tag in order, stopping at the first failure.
fn run_build(args: BuildArgs) -> Result<()> {
    let config = Config::from_args_and_env(args)?;
    let engine = Engine::locate(config.engine_type)?;

    docker::build(&engine, &config.build_opts())?;
    for opts in config.push_opts() {
        docker::push(&engine, &opts)?;
    }

    tracing::info!(tags = ?config.tags, "image built and pushed");
    Ok(())
}

/// Reports a failed run and exits with a non-zero status.
fn check(result: Result<()>) {
    if let Err(err) = result {
        tracing::debug!(root_cause = %err.root_cause(), "command failed");
        eprintln!("error: {err}");
        process::exit(1);
    }
}
