//! Podman-backed build engine
//!
//! Shells out to `podman` for every operation. Build and push output is
//! streamed straight to the terminal; disk usage is reported around each
//! image removal since cleanup exists to keep CI runners from filling up.

use crate::engine::BuildEngine;
use crate::error::{BakeryError, BakeryResult};
use crate::image::{BuildArg, Label};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Build engine using the `podman` CLI
pub struct PodmanEngine;

impl PodmanEngine {
    /// Create a new Podman engine
    pub fn new() -> Self {
        Self
    }

    /// Run a command with inherited stdio, failing on non-zero exit
    async fn run(&self, program: &str, args: &[String]) -> BakeryResult<()> {
        let command = format!("{} {}", program, args.join(" "));
        info!("$ {}", command);

        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| BakeryError::command_failed(command.clone(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(BakeryError::CommandStatus {
                command,
                code: status.code().unwrap_or(-1),
            })
        }
    }

    /// Report filesystem usage, used around image removals
    async fn report_disk_space(&self) -> BakeryResult<()> {
        self.run("df", &["-h".to_string()]).await
    }
}

impl Default for PodmanEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildEngine for PodmanEngine {
    async fn build(
        &self,
        tag: &str,
        file: &Path,
        context: &Path,
        build_args: &[BuildArg],
        labels: &[Label],
    ) -> BakeryResult<()> {
        let mut args = vec![
            "build".to_string(),
            "--tag".to_string(),
            tag.to_string(),
            "--file".to_string(),
            file.display().to_string(),
        ];

        for build_arg in build_args {
            args.push("--build-arg".to_string());
            args.push(build_arg.to_string());
        }

        for label in labels {
            args.push("--label".to_string());
            args.push(label.to_string());
        }

        args.push(context.display().to_string());

        self.run("podman", &args).await
    }

    async fn tag(&self, source: &str, dest: &str) -> BakeryResult<()> {
        self.run(
            "podman",
            &["tag".to_string(), source.to_string(), dest.to_string()],
        )
        .await
    }

    async fn push(&self, authfile: &Path, pushspec: &str) -> BakeryResult<()> {
        self.run(
            "podman",
            &[
                "push".to_string(),
                "--authfile".to_string(),
                authfile.display().to_string(),
                pushspec.to_string(),
            ],
        )
        .await
    }

    async fn remove_image(&self, pushspec: &str, ignore_missing: bool) -> BakeryResult<()> {
        info!("Disk space before removing {}:", pushspec);
        self.report_disk_space().await?;

        let mut args = vec!["image".to_string(), "rm".to_string()];
        if ignore_missing {
            args.push("--ignore".to_string());
        }
        args.push(pushspec.to_string());

        self.run("podman", &args).await?;

        info!("Disk space after removing {}:", pushspec);
        self.report_disk_space().await
    }
}
