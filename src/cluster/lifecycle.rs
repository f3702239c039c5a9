//! Cluster Lifecycle Manager
//!
//! Drives the k3d CLI through four steps: probe, create (only when the probe
//! finds nothing), merge credentials, import images. A cluster is never
//! deleted, so re-running the pipeline reuses the one created the first time.
//!
//! Probe and create are not atomic. Two concurrent runs against the same
//! project may both decide to create; callers must serialize runs.

use crate::context::{ClusterHandle, ImageReference};
use crate::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
use crate::progress::{ProgressEvent, ProgressHandler};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClusterError {
    /// The CLI could not be run at all (not installed, timed out)
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The CLI ran and exited unsuccessfully
    #[error("'{command}' failed (exit code {exit_code:?}): {diagnostics}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },
}

impl ClusterError {
    fn failed(spec: &CommandSpec, output: &CommandOutput) -> Self {
        ClusterError::CommandFailed {
            command: spec.to_string(),
            exit_code: output.exit_code,
            diagnostics: output.diagnostics().to_string(),
        }
    }
}

/// Argument vectors for the k3d subcommands the pipeline uses
#[derive(Debug, Clone)]
pub struct K3dCli {
    program: String,
}

impl K3dCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn list(&self, name: &str) -> CommandSpec {
        CommandSpec::new(&self.program, ["cluster", "list", name])
    }

    /// Publishes the load balancer's HTTP and HTTPS ports on the host
    pub fn create(&self, name: &str) -> CommandSpec {
        CommandSpec::new(
            &self.program,
            [
                "cluster",
                "create",
                "-p",
                "80@loadbalancer",
                "-p",
                "443@loadbalancer",
                name,
            ],
        )
    }

    pub fn merge_kubeconfig(&self, name: &str, output: &str) -> CommandSpec {
        CommandSpec::new(&self.program, ["kubeconfig", "merge", name, "-o", output])
    }

    pub fn import_image(&self, image: &str, name: &str) -> CommandSpec {
        CommandSpec::new(&self.program, ["image", "import", image, "-c", name])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterReady {
    /// False when an existing cluster was reused
    pub created: bool,
    pub imported: Vec<ImageReference>,
}

pub struct ClusterManager {
    runner: Arc<dyn CommandRunner>,
    cli: K3dCli,
    progress: Arc<dyn ProgressHandler>,
}

impl ClusterManager {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        cli: K3dCli,
        progress: Arc<dyn ProgressHandler>,
    ) -> Self {
        Self {
            runner,
            cli,
            progress,
        }
    }

    /// Exit status 0 from `cluster list <name>` means the cluster exists
    pub async fn exists(&self, name: &str) -> Result<bool, ClusterError> {
        let output = self.runner.run(&self.cli.list(name)).await?;
        if !output.success() {
            debug!(cluster = name, stderr = %output.diagnostics(), "Cluster list reported absence");
        }
        Ok(output.success())
    }

    pub async fn ensure_cluster(
        &self,
        handle: &ClusterHandle,
        images: &[ImageReference],
    ) -> Result<ClusterReady, ClusterError> {
        let exists = self.exists(&handle.name).await?;
        self.progress.on_progress(&ProgressEvent::ClusterProbed {
            name: handle.name.clone(),
            exists,
        });

        if !exists {
            info!(cluster = %handle.name, "Creating cluster");
            self.run_checked(self.cli.create(&handle.name)).await?;
            self.progress.on_progress(&ProgressEvent::ClusterCreated {
                name: handle.name.clone(),
            });
        }

        let kubeconfig = handle.kubeconfig_path.display().to_string();
        self.run_checked(self.cli.merge_kubeconfig(&handle.name, &kubeconfig))
            .await?;
        self.progress.on_progress(&ProgressEvent::KubeconfigMerged {
            path: kubeconfig,
        });

        let mut imported = Vec::with_capacity(images.len());
        for image in images {
            let tag = image.to_string();
            self.run_checked(self.cli.import_image(&tag, &handle.name))
                .await?;
            self.progress
                .on_progress(&ProgressEvent::ImageImported { reference: tag });
            imported.push(image.clone());
        }

        Ok(ClusterReady {
            created: !exists,
            imported,
        })
    }

    async fn run_checked(&self, spec: CommandSpec) -> Result<CommandOutput, ClusterError> {
        let output = self.runner.run(&spec).await?;
        if output.success() {
            Ok(output)
        } else {
            warn!(command = %spec, exit_code = ?output.exit_code, "Cluster command failed");
            Err(ClusterError::failed(&spec, &output))
        }
    }
}
