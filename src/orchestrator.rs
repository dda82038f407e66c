//! Batch orchestration
//!
//! Drives build/push/clear across ordered batches of images. A global
//! pre-flight pass announces every image's plan and rejects the whole run
//! if any Containerfile is missing, so no engine call ever happens for a
//! partially valid declaration.

use crate::engine::BuildEngine;
use crate::error::{BakeryError, BakeryResult};
use crate::image::Image;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{error, info};

/// An ordered group of images sharing base-image cleanup accounting
#[derive(Debug)]
pub struct Batch {
    pub name: String,
    pub images: Vec<Image>,
}

/// Options for one orchestrator run
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Registry credentials; pushing happens only when present
    pub authfile: Option<PathBuf>,

    /// Remove images and batch base images after building
    pub clear_images: bool,

    /// Stop after the pre-flight pass
    pub validate_only: bool,
}

/// Sequences batches of image builds against a build engine
pub struct Orchestrator<'a> {
    engine: &'a dyn BuildEngine,
    batches: Vec<Batch>,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(engine: &'a dyn BuildEngine, batches: Vec<Batch>, options: RunOptions) -> Self {
        Self {
            engine,
            batches,
            options,
        }
    }

    /// Validate everything, then process unless validate-only
    pub async fn run(&self) -> BakeryResult<()> {
        self.validate()?;

        if self.options.validate_only {
            info!("Validate-only run, skipping builds");
            return Ok(());
        }

        self.process().await
    }

    /// Global pre-flight gate: announce every image's plan, fail on the
    /// first missing Containerfile before any mutating action
    fn validate(&self) -> BakeryResult<()> {
        for batch in &self.batches {
            for image in &batch.images {
                if !image.exists() {
                    error!("Missing containerfile for {}", image);
                    return Err(BakeryError::MissingContainerfile(
                        image.containerfile().to_path_buf(),
                    ));
                }

                info!("Containerfile source: {}", image);
                info!("Build context: {}", image.context().display());
                info!("Pushspecs: {:?}", image.pushspecs());
                info!("Base images: {:?}", image.base_images()?);
                info!(
                    "Build args: {:?}",
                    image
                        .build_args()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                );
                info!("Is transient: {}", image.is_transient());
                info!("");
            }
        }
        Ok(())
    }

    async fn process(&self) -> BakeryResult<()> {
        let transient_pushspecs = self.transient_pushspecs();

        for batch in &self.batches {
            info!("Processing batch '{}'", batch.name);
            let mut batch_base_images = BTreeSet::new();

            for image in &batch.images {
                batch_base_images.extend(image.base_images()?);
                image.build(self.engine).await?;

                if image.is_transient() {
                    continue;
                }

                if let Some(authfile) = &self.options.authfile {
                    image.push(self.engine, authfile).await?;
                }

                if self.options.clear_images {
                    image.clear(self.engine).await?;
                }
            }

            if self.options.clear_images {
                for base_image in &batch_base_images {
                    if !transient_pushspecs.contains(base_image.as_str()) {
                        self.engine.remove_image(base_image, true).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Pushspecs of every transient image across all batches; these are
    /// excluded from the batch-level base-image sweep
    fn transient_pushspecs(&self) -> BTreeSet<&str> {
        self.batches
            .iter()
            .flat_map(|batch| &batch.images)
            .filter(|image| image.is_transient())
            .flat_map(|image| image.pushspecs())
            .map(String::as_str)
            .collect()
    }
}
