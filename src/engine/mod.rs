//! Build-tool abstraction
//!
//! Provides a trait for the external container build tool so the
//! orchestrator can be tested against a recording fake, and ships the
//! Podman-backed production implementation.

pub mod podman;

pub use podman::PodmanEngine;

use crate::error::BakeryResult;
use crate::image::{BuildArg, Label};
use async_trait::async_trait;
use std::path::Path;

/// Abstract build-tool interface
///
/// Exit status is the sole success/failure signal; no structured output is
/// parsed from any of these calls.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Build `file` in `context`, tagging the result as `tag`
    async fn build(
        &self,
        tag: &str,
        file: &Path,
        context: &Path,
        build_args: &[BuildArg],
        labels: &[Label],
    ) -> BakeryResult<()>;

    /// Create a local tag alias from `source` to `dest`
    async fn tag(&self, source: &str, dest: &str) -> BakeryResult<()>;

    /// Push `pushspec` using the credentials in `authfile`
    async fn push(&self, authfile: &Path, pushspec: &str) -> BakeryResult<()>;

    /// Remove the local image for `pushspec`
    ///
    /// With `ignore_missing`, an already-absent image is a no-op.
    async fn remove_image(&self, pushspec: &str, ignore_missing: bool) -> BakeryResult<()>;
}
