//! Image build specifications
//!
//! An [`Image`] is an immutable descriptor combining a Containerfile, its
//! push destinations, build args, and provenance labels. Build, push, and
//! clear all delegate to an injected [`BuildEngine`]; base-image discovery
//! delegates to the Containerfile analyzer.

use crate::containerfile;
use crate::engine::BuildEngine;
use crate::error::{BakeryError, BakeryResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// A named build-time parameter, passed as `--build-arg name=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArg {
    pub name: String,
    pub value: String,
}

impl BuildArg {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for BuildArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// An image label, passed as `--label name=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Whether an image is published or only feeds other builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Built, pushed, and swept by batch cleanup
    Distributable,
    /// Built for its intermediate artifacts; never pushed, never swept
    Transient,
}

/// Immutable build specification for one container image
///
/// The first pushspec is the build tag; the rest become local tag aliases
/// before pushing. Labels and build args are fixed at construction.
#[derive(Debug)]
pub struct Image {
    containerfile: PathBuf,
    pushspecs: Vec<String>,
    build_args: Vec<BuildArg>,
    labels: Vec<Label>,
    kind: ImageKind,
    base_images: OnceLock<BTreeSet<String>>,
}

impl Image {
    /// Create a new image spec
    ///
    /// Duplicate build-arg names are collapsed, last value wins. Fails if
    /// no pushspecs are declared.
    pub fn new(
        containerfile: PathBuf,
        pushspecs: Vec<String>,
        build_args: Vec<BuildArg>,
        labels: Vec<Label>,
        kind: ImageKind,
    ) -> BakeryResult<Self> {
        if pushspecs.is_empty() {
            return Err(BakeryError::NoPushspecs(
                containerfile.display().to_string(),
            ));
        }

        let mut deduped: Vec<BuildArg> = Vec::with_capacity(build_args.len());
        for arg in build_args {
            match deduped.iter_mut().find(|existing| existing.name == arg.name) {
                Some(existing) => existing.value = arg.value,
                None => deduped.push(arg),
            }
        }

        Ok(Self {
            containerfile,
            pushspecs,
            build_args: deduped,
            labels,
            kind,
            base_images: OnceLock::new(),
        })
    }

    /// Path to the Containerfile
    pub fn containerfile(&self) -> &Path {
        &self.containerfile
    }

    /// Build context: the Containerfile's parent directory
    pub fn context(&self) -> PathBuf {
        match self.containerfile.parent() {
            Some(parent) if parent != Path::new("") => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Ordered push destinations; the first is the build tag
    pub fn pushspecs(&self) -> &[String] {
        &self.pushspecs
    }

    /// The pushspec the image is built as
    pub fn build_tag(&self) -> &str {
        &self.pushspecs[0]
    }

    pub fn build_args(&self) -> &[BuildArg] {
        &self.build_args
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ImageKind::Transient
    }

    /// True iff the Containerfile is present and a regular file
    pub fn exists(&self) -> bool {
        self.containerfile.is_file()
    }

    /// External base images this build pulls
    ///
    /// Memoized after the first successful computation; errors are not
    /// cached so a fixed filesystem can be retried.
    pub fn base_images(&self) -> BakeryResult<BTreeSet<String>> {
        if let Some(cached) = self.base_images.get() {
            return Ok(cached.clone());
        }

        let contents = std::fs::read_to_string(&self.containerfile).map_err(|e| {
            BakeryError::io(
                format!("reading containerfile {}", self.containerfile.display()),
                e,
            )
        })?;

        let mapping: BTreeMap<String, String> = self
            .build_args
            .iter()
            .map(|arg| (arg.name.clone(), arg.value.clone()))
            .collect();

        let computed = containerfile::base_images(&contents, &mapping);
        let _ = self.base_images.set(computed.clone());
        Ok(computed)
    }

    /// Build this image, tagged as the first pushspec
    pub async fn build(&self, engine: &dyn BuildEngine) -> BakeryResult<()> {
        info!("Building {}", self.containerfile.display());
        engine
            .build(
                self.build_tag(),
                &self.containerfile,
                &self.context(),
                &self.build_args,
                &self.labels,
            )
            .await
    }

    /// Tag every secondary pushspec, then push all pushspecs in order
    pub async fn push(&self, engine: &dyn BuildEngine, authfile: &Path) -> BakeryResult<()> {
        for dest in &self.pushspecs[1..] {
            engine.tag(self.build_tag(), dest).await?;
        }
        for pushspec in &self.pushspecs {
            info!("Pushing {}", pushspec);
            engine.push(authfile, pushspec).await?;
        }
        Ok(())
    }

    /// Remove the local image for every pushspec, tolerating absence
    pub async fn clear(&self, engine: &dyn BuildEngine) -> BakeryResult<()> {
        for pushspec in &self.pushspecs {
            engine.remove_image(pushspec, true).await?;
        }
        Ok(())
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.containerfile.display())
    }
}

/// Provenance labels tying an image back to its source repository
pub fn provenance_labels(repo_url: &str, revision: &str, containerfile: &Path) -> Vec<Label> {
    let blob = format!(
        "{}/blob/{}/{}",
        repo_url,
        revision,
        containerfile.display()
    );
    vec![
        Label::new("org.opencontainers.image.source", repo_url),
        Label::new("org.opencontainers.image.revision", revision),
        Label::new("org.opencontainers.image.url", blob),
    ]
}

/// CI labels, added only when the corresponding env vars are present
pub fn ci_labels() -> Vec<Label> {
    let mut labels = vec![];
    if let Ok(workflow) = std::env::var("GITHUB_WORKFLOW") {
        if !workflow.is_empty() {
            labels.push(Label::new("ci.workflow", workflow));
        }
    }
    if let Ok(run_id) = std::env::var("GITHUB_RUN_ID") {
        if !run_id.is_empty() {
            labels.push(Label::new("ci.run-id", run_id));
        }
    }
    labels
}
