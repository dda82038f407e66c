//! Common build-arg assembly
//!
//! Combines the static build-args file, the per-package version cache, the
//! platform release index, and repository provenance into the build-arg
//! list every image receives.

use crate::error::{BakeryError, BakeryResult};
use crate::image::BuildArg;
use crate::manifest::Manifest;
use crate::versions::cache::{CacheStore, VersionedPackage};
use crate::versions::source::{trim_version_prefix, VersionSource};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Flags controlling how common build args are assembled
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Skip resolution entirely, producing an empty arg list
    pub push_only: bool,

    /// Skip upstream release lookups
    pub skip_release_check: bool,

    /// Skip the platform release index
    pub skip_platform_check: bool,

    /// Static build-args JSON file substituted for live resolution
    pub build_args_file: Option<PathBuf>,
}

/// How a tracked package's version is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Track {
    /// Latest release tag, version prefix trimmed
    Release { org_and_repo: String },
    /// Tip commit of a branch
    Branch { org_and_repo: String, branch: String },
}

/// Parse a manifest track value: `owner/repo` or `owner/repo@branch`
pub fn parse_track(arg: &str, value: &str) -> BakeryResult<Track> {
    let (org_and_repo, branch) = match value.split_once('@') {
        Some((repo, branch)) => (repo, Some(branch)),
        None => (value, None),
    };

    let well_formed = org_and_repo.split('/').filter(|p| !p.is_empty()).count() == 2
        && branch.is_none_or(|b| !b.is_empty());
    if !well_formed {
        return Err(BakeryError::TrackInvalid {
            arg: arg.to_string(),
            track: value.to_string(),
        });
    }

    Ok(match branch {
        Some(branch) => Track::Branch {
            org_and_repo: org_and_repo.to_string(),
            branch: branch.to_string(),
        },
        None => Track::Release {
            org_and_repo: org_and_repo.to_string(),
        },
    })
}

/// Assemble the build args shared by every image in the run
pub fn common_build_args(
    options: &ResolveOptions,
    manifest: &Manifest,
    revision: &str,
    source: &dyn VersionSource,
    store: &dyn CacheStore,
) -> BakeryResult<Vec<BuildArg>> {
    if options.push_only {
        return Ok(vec![]);
    }

    let mut args = BTreeMap::new();

    if let Some(path) = &options.build_args_file {
        args = load_build_args_file(path, manifest)?;
    } else if !options.skip_release_check {
        info!("Resolving upstream versions");
        for (arg, track) in &manifest.versions {
            let value = match parse_track(arg, track)? {
                Track::Release { org_and_repo } => {
                    let mut package = VersionedPackage::load_or_new(arg, org_and_repo, store);
                    let tag = package.resolve_tag(source, store)?;
                    trim_version_prefix(&tag).to_string()
                }
                Track::Branch {
                    org_and_repo,
                    branch,
                } => {
                    let mut package = VersionedPackage::load_or_new(arg, org_and_repo, store);
                    package.resolve_branch_commit(&branch, source, store)?
                }
            };
            args.insert(arg.clone(), value);
        }
    }

    if options.build_args_file.is_none() && !options.skip_platform_check {
        if let Some(platform) = &manifest.platform {
            let release = source.latest_stable_release(&platform.index_url)?;
            args.insert(platform.build_arg.clone(), release);
        }
    }

    args.insert("GIT_REPO".to_string(), manifest.repo.clone());
    args.insert("GIT_REVISION".to_string(), revision.to_string());

    Ok(args
        .into_iter()
        .map(|(name, value)| BuildArg::new(name, value))
        .collect())
}

/// Load a static build-args file: a flat JSON map of name to value
///
/// Values for version-tracked packages still pass through the version
/// prefix trim, so a hand-written `v1.2.3` behaves like a live lookup.
fn load_build_args_file(
    path: &Path,
    manifest: &Manifest,
) -> BakeryResult<BTreeMap<String, String>> {
    info!("Reading build args from {}", path.display());

    let contents = std::fs::read_to_string(path)
        .map_err(|e| BakeryError::io(format!("reading build args file {}", path.display()), e))?;
    let mut args: BTreeMap<String, String> = serde_json::from_str(&contents)?;

    for (name, value) in args.iter_mut() {
        if manifest.versions.contains_key(name) {
            *value = trim_version_prefix(value).to_string();
        }
    }

    Ok(args)
}

/// The VCS revision the run is built from
///
/// Prefers `GITHUB_SHA` when set (CI checkouts can be shallow or detached),
/// falling back to `git rev-parse HEAD` in the manifest directory.
pub async fn head_revision(dir: &Path) -> BakeryResult<String> {
    if let Ok(sha) = std::env::var("GITHUB_SHA") {
        if !sha.is_empty() {
            return Ok(sha);
        }
    }

    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| BakeryError::command_failed("git rev-parse HEAD", e))?;

    if !output.status.success() {
        return Err(BakeryError::CommandStatus {
            command: "git rev-parse HEAD".to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }

    let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if revision.is_empty() {
        return Err(BakeryError::CommandOutput {
            command: "git rev-parse HEAD".to_string(),
        });
    }
    Ok(revision)
}
