//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Bakery - batch container image builder
///
/// Builds, tags, and pushes the image batches declared in a manifest,
/// resolving build args from upstream release sources.
#[derive(Parser, Debug)]
#[command(name = "bakery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the image manifest
    #[arg(short, long, env = "BAKERY_MANIFEST", default_value = "bakery.toml")]
    pub manifest: PathBuf,

    /// Path to the authfile for pushing the images
    #[arg(long)]
    pub authfile: Option<PathBuf>,

    /// Push the local tags, if found, without resolving build args
    #[arg(long, conflicts_with = "authfile")]
    pub push_only: bool,

    /// Skip upstream release version checks
    #[arg(long)]
    pub skip_release_check: bool,

    /// Skip the platform release index check
    #[arg(long)]
    pub skip_platform_check: bool,

    /// Clear images after build to conserve disk space (primarily for CI)
    #[arg(long)]
    pub clear_images: bool,

    /// Path to a build args JSON file in the form of {"arg1": "val1"},
    /// used in place of live resolution
    #[arg(long, value_name = "FILE")]
    pub build_args_file: Option<PathBuf>,

    /// Validate that the Containerfiles are present and print each
    /// image's plan without building anything
    #[arg(long)]
    pub validate_only: bool,

    /// Keep the per-package version cache files at run end
    #[arg(long)]
    pub keep_version_cache: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
