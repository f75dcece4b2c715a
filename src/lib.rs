//! Image builder
//!
//! Builds a container image from a Dockerfile and pushes it to an image
//! repository by shelling out to Docker or Podman. The [`errors`] module holds
//! the typed error wrapping used throughout: every failure is reported as a
//! concrete error type that still chains down to the toolchain's own error.

pub mod docker;
pub mod engine;
pub mod errors;
