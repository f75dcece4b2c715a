//! Configuration for the build command
//!
//! Combines command-line flags with environment variables into the options
//! handed to the [`docker`](image_builder::docker) operations.

use anyhow::Result;
use std::env;
use std::path::PathBuf;

use image_builder::docker::{BuildOpts, PushOpts};
use image_builder::engine::EngineType;
use image_builder::errorf;

use crate::BuildArgs;

image_builder::wrappable_error! {
    /// The tag list did not name any image.
    pub struct ErrInvalidTags;
}

/// Settings for one build-and-push run
#[derive(Debug)]
pub struct Config {
    /// Path to the Dockerfile
    pub file: PathBuf,
    /// Build context directory
    pub context_dir: PathBuf,
    /// Tags to apply and push, in the order given
    pub tags: Vec<String>,
    /// Container engine to shell out to
    pub engine_type: EngineType,
}

impl Config {
    /// Creates the configuration from command-line arguments and environment variables
    ///
    /// # Environment Variables
    ///
    /// * `CONTAINER_ENGINE` - Container engine to use when `--engine` is not given
    ///   (docker/podman, defaults to docker)
    pub fn from_args_and_env(args: BuildArgs) -> Result<Self> {
        Self::resolve(args, env::var("CONTAINER_ENGINE").ok())
    }

    fn resolve(args: BuildArgs, env_engine: Option<String>) -> Result<Self> {
        let engine_type = match args.engine.or(env_engine) {
            Some(name) => name.parse::<EngineType>()?,
            None => EngineType::default(),
        };

        let tags = parse_tags(&args.tags)?;

        Ok(Self {
            file: args.file,
            context_dir: args.context,
            tags,
            engine_type,
        })
    }

    pub fn build_opts(&self) -> BuildOpts {
        BuildOpts {
            context_dir: self.context_dir.clone(),
            file: self.file.clone(),
            tags: self.tags.clone(),
        }
    }

    pub fn push_opts(&self) -> impl Iterator<Item = PushOpts> + '_ {
        self.tags.iter().map(|tag| PushOpts { tag: tag.clone() })
    }
}

/// Splits a comma-separated list of `name:tag`, dropping blank entries.
pub fn parse_tags(csv: &str) -> Result<Vec<String>, ErrInvalidTags> {
    let tags: Vec<String> = csv
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect();

    if tags.is_empty() {
        return Err(errorf!(
            ErrInvalidTags::default(),
            "at least one tag name must be specified"
        ));
    }
    Ok(tags)
}
