//! Image build and push
//!
//! Thin wrappers around `<engine> build` and `<engine> push`. Whatever goes
//! wrong inside the toolchain is reported as a [`ContainerError`] and wrapped
//! into [`ErrBuild`] or [`ErrPush`], so callers can match on the step that
//! failed and still reach the underlying process failure.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::engine::Engine;
use crate::errorf;

crate::wrappable_error! {
    /// Building the image failed.
    pub struct ErrBuild;

    /// Pushing a tag to the image repository failed.
    pub struct ErrPush;
}

/// Failures of a single engine invocation
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The engine process could not be started at all
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The engine ran but reported failure
    #[error("'{command}' exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },
}

/// Options for [`build`]
#[derive(Debug, Clone)]
pub struct BuildOpts {
    /// Directory sent to the engine as the build context
    pub context_dir: PathBuf,
    /// Path to the Dockerfile
    pub file: PathBuf,
    /// Every `name:tag` the built image is tagged with
    pub tags: Vec<String>,
}

/// Options for [`push`]
#[derive(Debug, Clone)]
pub struct PushOpts {
    pub tag: String,
}

impl BuildOpts {
    /// Arguments passed to the engine, `build -f FILE -t TAG... CONTEXT`.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["build".into(), "-f".into(), self.file.clone().into()];
        for tag in &self.tags {
            args.push("-t".into());
            args.push(tag.into());
        }
        args.push(self.context_dir.clone().into());
        args
    }
}

impl PushOpts {
    /// Arguments passed to the engine, `push TAG`.
    pub fn args(&self) -> Vec<OsString> {
        vec!["push".into(), (&self.tag).into()]
    }
}

/// Builds an image from a Dockerfile.
///
/// # Arguments
///
/// * `engine` - The container engine to shell out to
/// * `opts` - Dockerfile, build context and tags
///
/// # Errors
///
/// Returns [`ErrBuild`] wrapping a [`ContainerError`] if the engine cannot be
/// started or exits unsuccessfully.
pub fn build(engine: &Engine, opts: &BuildOpts) -> Result<(), ErrBuild> {
    tracing::info!(
        file = %opts.file.display(),
        context = %opts.context_dir.display(),
        tags = ?opts.tags,
        "building image"
    );

    run(engine.command(opts.args())).map_err(|err| {
        errorf!(
            ErrBuild::default(),
            source = err,
            "failed to build {} image: {source}",
            engine.kind()
        )
    })
}

/// Pushes one tag to its image repository.
///
/// # Errors
///
/// Returns [`ErrPush`] wrapping a [`ContainerError`] if the engine cannot be
/// started or exits unsuccessfully.
pub fn push(engine: &Engine, opts: &PushOpts) -> Result<(), ErrPush> {
    tracing::info!(tag = %opts.tag, "pushing image");

    run(engine.command(opts.args())).map_err(|err| {
        errorf!(
            ErrPush::default(),
            source = err,
            "failed to push {} to image repository: {source}",
            opts.tag
        )
    })
}

/// Runs `cmd` to completion with inherited stdio.
fn run(mut cmd: Command) -> Result<(), ContainerError> {
    let command = describe(&cmd);
    tracing::debug!(%command, "running container engine");

    let status = cmd.status().map_err(|source| ContainerError::Spawn {
        command: command.clone(),
        source,
    })?;

    if !status.success() {
        return Err(ContainerError::CommandFailed { command, status });
    }
    Ok(())
}

fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}
