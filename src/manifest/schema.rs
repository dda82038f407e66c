//! Manifest schema
//!
//! Lives next to the Containerfiles it declares, conventionally as
//! `bakery.toml` at the repository root.

use crate::error::{BakeryError, BakeryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root manifest structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Source repository URL, used for provenance labels and build args
    pub repo: String,

    /// Version-tracked packages: build-arg name to `owner/repo` or
    /// `owner/repo@branch`
    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    /// Optional platform release index
    #[serde(default)]
    pub platform: Option<PlatformConfig>,

    /// Ordered batches of images
    #[serde(default)]
    pub batch: Vec<BatchConfig>,
}

/// A plain-text release index to resolve one build arg from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// URL of the release index
    pub index_url: String,

    /// Build-arg name the release string is assigned to
    pub build_arg: String,
}

/// An ordered group of images sharing base-image cleanup accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Batch name, used in logs
    pub name: String,

    /// Images in build order
    #[serde(default)]
    pub image: Vec<ImageConfig>,
}

/// One declared image build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Containerfile path, relative to the manifest directory
    pub containerfile: PathBuf,

    /// Push destinations; the first is the build tag
    pub pushspecs: Vec<String>,

    /// Extra build args for this image, overriding common ones
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,

    /// Transient images are built but never pushed or swept
    #[serde(default)]
    pub transient: bool,
}

impl Manifest {
    /// Structural checks beyond what serde enforces
    pub fn validate(&self, path: &Path) -> BakeryResult<()> {
        for name in self.versions.keys() {
            if name.contains(['/', '\\']) {
                return Err(BakeryError::ManifestInvalid {
                    path: path.to_path_buf(),
                    reason: format!(
                        "version build-arg name '{name}' contains a path separator"
                    ),
                });
            }
        }
        for batch in &self.batch {
            for image in &batch.image {
                if image.pushspecs.is_empty() {
                    return Err(BakeryError::ManifestInvalid {
                        path: path.to_path_buf(),
                        reason: format!(
                            "image {} in batch '{}' has no pushspecs",
                            image.containerfile.display(),
                            batch.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
