//! Image manifest loading
//!
//! The manifest is a TOML file declaring the source repository, the
//! version-tracked packages, and the ordered batches of images to build.

pub mod schema;

pub use schema::{BatchConfig, ImageConfig, Manifest, PlatformConfig};

use crate::error::{BakeryError, BakeryResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Load and validate a manifest file
pub async fn load(path: &Path) -> BakeryResult<Manifest> {
    if !path.is_file() {
        return Err(BakeryError::ManifestNotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| BakeryError::io(format!("reading manifest {}", path.display()), e))?;

    let manifest: Manifest =
        toml::from_str(&contents).map_err(|e| BakeryError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    manifest.validate(path)?;
    debug!(
        "Loaded manifest with {} batches from {}",
        manifest.batch.len(),
        path.display()
    );
    Ok(manifest)
}

/// The directory declared image paths are resolved against
pub fn root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if parent != Path::new("") => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
repo = "https://github.com/acme/containerfiles"

[versions]
YQ_VERSION = "mikefarah/yq"
HELPERS_COMMIT = "acme/helpers@main"

[platform]
index_url = "https://mirror.example.com/stable/release.txt"
build_arg = "OCP_VERSION"

[[batch]]
name = "transient"

[[batch.image]]
containerfile = "toolbox/Containerfile.tools-fetcher"
pushspecs = ["quay.io/acme/toolbox:tools-fetcher"]
transient = true

[[batch]]
name = "fedora-40"

[[batch.image]]
containerfile = "toolbox/Containerfile.base"
pushspecs = [
    "quay.io/acme/toolbox:base-fedora-40",
    "quay.io/acme/toolbox:latest",
]

[batch.image.build_args]
FEDORA_VERSION = "40"
"#;

    async fn write_and_load(contents: &str) -> BakeryResult<Manifest> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bakery.toml");
        std::fs::write(&path, contents).unwrap();
        load(&path).await
    }

    #[tokio::test]
    async fn sample_manifest_parses() {
        let manifest = write_and_load(SAMPLE).await.unwrap();

        assert_eq!(manifest.repo, "https://github.com/acme/containerfiles");
        assert_eq!(manifest.versions.len(), 2);
        assert_eq!(manifest.platform.unwrap().build_arg, "OCP_VERSION");
        assert_eq!(manifest.batch.len(), 2);
        assert_eq!(manifest.batch[0].name, "transient");
        assert!(manifest.batch[0].image[0].transient);
        assert_eq!(manifest.batch[1].image[0].pushspecs.len(), 2);
        assert_eq!(
            manifest.batch[1].image[0].build_args.get("FEDORA_VERSION"),
            Some(&"40".to_string())
        );
    }

    #[tokio::test]
    async fn missing_manifest_errors() {
        let result = load(Path::new("/nonexistent/bakery.toml")).await;
        assert!(matches!(result, Err(BakeryError::ManifestNotFound(_))));
    }

    #[tokio::test]
    async fn invalid_toml_errors() {
        let result = write_and_load("repo = [broken").await;
        assert!(matches!(result, Err(BakeryError::ManifestInvalid { .. })));
    }

    #[tokio::test]
    async fn empty_pushspecs_rejected() {
        let contents = r#"
repo = "https://github.com/acme/containerfiles"

[[batch]]
name = "broken"

[[batch.image]]
containerfile = "Containerfile"
pushspecs = []
"#;
        let result = write_and_load(contents).await;
        assert!(matches!(result, Err(BakeryError::ManifestInvalid { .. })));
    }

    #[test]
    fn root_dir_of_bare_filename() {
        assert_eq!(root_dir(Path::new("bakery.toml")), PathBuf::from("."));
        assert_eq!(
            root_dir(Path::new("/repo/bakery.toml")),
            PathBuf::from("/repo")
        );
    }
}
