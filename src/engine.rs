//! Container engine selection
//!
//! Resolves which container toolchain (Docker or Podman) the builder shells
//! out to, and where its executable lives.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use crate::errorf;

crate::wrappable_error! {
    /// The requested engine is not installed or not on `PATH`.
    pub struct ErrEngineNotFound;

    /// An engine name that is neither `docker` nor `podman`.
    pub struct ErrUnknownEngine;
}

/// Supported container engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineType {
    #[default]
    Docker,
    Podman,
}

impl EngineType {
    /// The executable name looked up on `PATH`
    pub fn as_command(&self) -> &'static str {
        match self {
            EngineType::Docker => "docker",
            EngineType::Podman => "podman",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_command())
    }
}

impl FromStr for EngineType {
    type Err = ErrUnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(EngineType::Docker),
            "podman" => Ok(EngineType::Podman),
            _ => Err(errorf!(
                ErrUnknownEngine::default(),
                "unknown container engine '{}', expected 'docker' or 'podman'",
                s
            )),
        }
    }
}

/// A located container engine executable
///
/// Every toolchain invocation goes through [`Engine::command`], so the
/// executable is resolved once up front.
#[derive(Debug, Clone)]
pub struct Engine {
    kind: EngineType,
    program: PathBuf,
}

impl Engine {
    /// Finds the engine executable on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrEngineNotFound`] wrapping the lookup failure when the
    /// executable cannot be found.
    pub fn locate(kind: EngineType) -> Result<Self, ErrEngineNotFound> {
        Self::from_lookup(kind, which::which(kind.as_command()))
    }

    /// Finds the engine executable in the given search path instead of `PATH`.
    pub fn locate_in(
        kind: EngineType,
        paths: impl AsRef<OsStr>,
        cwd: impl AsRef<Path>,
    ) -> Result<Self, ErrEngineNotFound> {
        Self::from_lookup(kind, which::which_in(kind.as_command(), Some(paths), cwd))
    }

    fn from_lookup(
        kind: EngineType,
        lookup: which::Result<PathBuf>,
    ) -> Result<Self, ErrEngineNotFound> {
        let program = lookup.map_err(|err| {
            errorf!(
                ErrEngineNotFound::default(),
                source = err,
                "container engine '{}' not found: {source}",
                kind
            )
        })?;

        tracing::debug!(engine = %kind, program = %program.display(), "located container engine");
        Ok(Self { kind, program })
    }

    /// Uses `program` as the engine executable without searching `PATH`.
    pub fn with_program(kind: EngineType, program: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            program: program.into(),
        }
    }

    pub fn kind(&self) -> EngineType {
        self.kind
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A command invoking the engine with `args`.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }
}
