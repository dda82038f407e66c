//! Bakery - Batch container image builder
//!
//! Builds, tags, and pushes declared batches of container images, resolving
//! build args from upstream release sources and sweeping base images to
//! conserve disk space on CI runners.

pub mod cli;
pub mod containerfile;
pub mod engine;
pub mod error;
pub mod image;
pub mod manifest;
pub mod orchestrator;
pub mod versions;

pub use error::{BakeryError, BakeryResult};
