//! Top-level run flow
//!
//! Loads the manifest, assembles common build args, plans the batches,
//! and hands them to the orchestrator. Version cache teardown happens
//! here so it runs for validate-only runs too.

use crate::cli::Cli;
use crate::engine::PodmanEngine;
use crate::error::{BakeryError, BakeryResult};
use crate::image::{ci_labels, provenance_labels, BuildArg, Image, ImageKind};
use crate::manifest::{self, Manifest};
use crate::orchestrator::{Batch, Orchestrator, RunOptions};
use crate::versions::resolve::{self, ResolveOptions};
use crate::versions::{CacheStore, FileStore, GithubSource};
use std::path::Path;
use tracing::info;

/// Directory under the manifest root holding per-package cache files
const CACHE_DIR: &str = ".bakery-cache";

/// Execute one full run of the CLI
pub async fn run(cli: Cli) -> BakeryResult<()> {
    if let Some(authfile) = &cli.authfile {
        if !authfile.is_file() {
            return Err(BakeryError::AuthfileNotFound(authfile.clone()));
        }
        info!("Will push using creds in {}", authfile.display());
    }

    let manifest = manifest::load(&cli.manifest).await?;
    let root = manifest::root_dir(&cli.manifest);
    let store = FileStore::new(root.join(CACHE_DIR));

    let revision = resolve::head_revision(&root).await?;
    let source = GithubSource::new();
    let resolve_options = ResolveOptions {
        push_only: cli.push_only,
        skip_release_check: cli.skip_release_check,
        skip_platform_check: cli.skip_platform_check,
        build_args_file: cli.build_args_file.clone(),
    };
    let common_args =
        resolve::common_build_args(&resolve_options, &manifest, &revision, &source, &store)?;
    info!(
        "Applying common build args to all builds: {:?}",
        common_args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );

    let batches = plan_batches(&manifest, &root, &common_args, &revision)?;

    let engine = PodmanEngine::new();
    let options = RunOptions {
        authfile: cli.authfile.clone(),
        clear_images: cli.clear_images,
        validate_only: cli.validate_only,
    };
    let outcome = Orchestrator::new(&engine, batches, options).run().await;

    // a failed run keeps the cache so the retry skips the network
    if outcome.is_ok() && !cli.keep_version_cache {
        for name in manifest.versions.keys() {
            store.delete(name)?;
        }
    }

    outcome
}

/// Turn the manifest's declarations into concrete image batches
///
/// Every image gets its own copy of the common args plus its declared
/// extras, a `CONTAINERFILE_SOURCE` arg, and provenance/CI labels.
fn plan_batches(
    manifest: &Manifest,
    root: &Path,
    common_args: &[BuildArg],
    revision: &str,
) -> BakeryResult<Vec<Batch>> {
    manifest
        .batch
        .iter()
        .map(|batch| {
            let images = batch
                .image
                .iter()
                .map(|config| {
                    let mut build_args = common_args.to_vec();
                    for (name, value) in &config.build_args {
                        build_args.push(BuildArg::new(name, value));
                    }
                    build_args.push(BuildArg::new(
                        "CONTAINERFILE_SOURCE",
                        format!("{}/tree/main/{}", manifest.repo, config.containerfile.display()),
                    ));

                    let mut labels =
                        provenance_labels(&manifest.repo, revision, &config.containerfile);
                    labels.extend(ci_labels());

                    let kind = if config.transient {
                        ImageKind::Transient
                    } else {
                        ImageKind::Distributable
                    };

                    Image::new(
                        root.join(&config.containerfile),
                        config.pushspecs.clone(),
                        build_args,
                        labels,
                        kind,
                    )
                })
                .collect::<BakeryResult<Vec<_>>>()?;

            Ok(Batch {
                name: batch.name.clone(),
                images,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_manifest() -> Manifest {
        toml::from_str(
            r#"
repo = "https://github.com/acme/containerfiles"

[[batch]]
name = "toolbox"

[[batch.image]]
containerfile = "toolbox/Containerfile.base"
pushspecs = ["quay.io/acme/toolbox:base"]

[batch.image.build_args]
FEDORA_VERSION = "40"

[[batch.image]]
containerfile = "toolbox/Containerfile.fetcher"
pushspecs = ["localhost/fetcher:latest"]
transient = true
"#,
        )
        .unwrap()
    }

    #[test]
    #[serial_test::serial]
    fn plan_carries_args_labels_and_kind() {
        std::env::remove_var("GITHUB_WORKFLOW");
        std::env::remove_var("GITHUB_RUN_ID");

        let manifest = sample_manifest();
        let common = vec![BuildArg::new("YQ_VERSION", "4.44.1")];
        let batches = plan_batches(&manifest, Path::new("/repo"), &common, "abc123").unwrap();

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.name, "toolbox");
        assert_eq!(batch.images.len(), 2);

        let base = &batch.images[0];
        assert_eq!(
            base.containerfile(),
            Path::new("/repo/toolbox/Containerfile.base")
        );
        assert_eq!(base.kind(), ImageKind::Distributable);
        let args: BTreeMap<_, _> = base
            .build_args()
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        assert_eq!(args.get("YQ_VERSION").unwrap(), "4.44.1");
        assert_eq!(args.get("FEDORA_VERSION").unwrap(), "40");
        assert_eq!(
            args.get("CONTAINERFILE_SOURCE").unwrap(),
            "https://github.com/acme/containerfiles/tree/main/toolbox/Containerfile.base"
        );
        assert_eq!(base.labels().len(), 3);
        assert_eq!(
            base.labels()[1].value, "abc123",
            "revision label should carry the resolved revision"
        );

        let fetcher = &batch.images[1];
        assert_eq!(fetcher.kind(), ImageKind::Transient);
    }

    #[test]
    fn images_get_independent_arg_collections() {
        let manifest = sample_manifest();
        let common = vec![BuildArg::new("SHARED", "1")];
        let batches = plan_batches(&manifest, Path::new("/repo"), &common, "abc123").unwrap();

        let first = &batches[0].images[0];
        let second = &batches[0].images[1];
        // each image owns its own collection; extras never leak across
        assert!(first.build_args().iter().any(|a| a.name == "FEDORA_VERSION"));
        assert!(!second.build_args().iter().any(|a| a.name == "FEDORA_VERSION"));
    }

    #[test]
    fn plan_rejects_empty_pushspecs() {
        let mut manifest = sample_manifest();
        manifest.batch[0].image[0].pushspecs.clear();
        let result = plan_batches(&manifest, Path::new("/repo"), &[], "abc123");
        assert!(matches!(result, Err(BakeryError::NoPushspecs(_))));
    }
}
