//! Ephemeral Deploy Executor
//!
//! Applies the project's manifests from a short-lived container attached to
//! the cluster network. Each step is guarded on its own: a failure is
//! recorded and the sequence moves on, and the container is removed at the
//! end whatever happened before.

pub mod kubeconfig;

pub use kubeconfig::{server_entries, ServerRewrite};

use crate::context::DeployJob;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::runtime::{ContainerRuntime, RunSpec, RuntimeError};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where the kubeconfig lands inside the deploy container
pub const CONTAINER_KUBECONFIG: &str = "/kubeconfig";

/// Where the manifest directory lands inside the deploy container
pub const CONTAINER_MANIFEST_DIR: &str = "/kubernetes";

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Failed to archive {path}: {source}")]
    Archive {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {exit_code:?}: {diagnostics}")]
    ExecFailed {
        command: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Launch,
    Upload,
    RewriteKubeconfig,
    Apply,
    Remove,
}

impl DeployStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::Launch => "launch",
            DeployStep::Upload => "upload",
            DeployStep::RewriteKubeconfig => "rewrite-kubeconfig",
            DeployStep::Apply => "apply",
            DeployStep::Remove => "remove",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: DeployStep,
    /// `Ok` carries command output worth showing, `Err` the failure text
    pub result: Result<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Applied,
    PartialFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub job_id: String,
    pub steps: Vec<StepReport>,
}

impl DeployReport {
    pub fn outcome(&self) -> DeployOutcome {
        if self.steps.iter().all(|s| s.result.is_ok()) {
            DeployOutcome::Applied
        } else {
            DeployOutcome::PartialFailure
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.result.is_err())
    }
}

/// Tar stream with `kubernetes/` and `kubeconfig` at its root, ready to be
/// extracted at `/` inside the container. Only reads the host filesystem.
pub fn pack_deploy_archive(manifest_dir: &Path, kubeconfig: &Path) -> Result<Vec<u8>, DeployError> {
    let archive_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| DeployError::Archive { path, source }
    };

    let mut builder = tar::Builder::new(Vec::new());
    builder.mode(tar::HeaderMode::Deterministic);
    builder
        .append_dir_all("kubernetes", manifest_dir)
        .map_err(archive_err(manifest_dir))?;
    builder
        .append_path_with_name(kubeconfig, "kubeconfig")
        .map_err(archive_err(kubeconfig))?;
    builder.into_inner().map_err(archive_err(manifest_dir))
}

pub struct DeployExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    deploy_image: String,
    progress: Arc<dyn ProgressHandler>,
}

impl DeployExecutor {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        deploy_image: impl Into<String>,
        progress: Arc<dyn ProgressHandler>,
    ) -> Self {
        Self {
            runtime,
            deploy_image: deploy_image.into(),
            progress,
        }
    }

    pub async fn deploy(&self, job: &DeployJob) -> DeployReport {
        let rewrite = ServerRewrite::for_cluster(&job.cluster);
        preflight(&rewrite, &job.kubeconfig_path);

        let mut report = DeployReport {
            job_id: job.id.clone(),
            steps: Vec::with_capacity(5),
        };

        let launched = self.launch(job).await;
        // Exec and upload address the container by name when the id is unknown
        let container = launched.as_ref().map(String::clone).unwrap_or_else(|_| job.id.clone());
        self.record(&mut report, DeployStep::Launch, launched);

        let uploaded = self.upload(&container, job).await;
        self.record(&mut report, DeployStep::Upload, uploaded);

        let rewritten = self
            .exec(&container, rewrite.sed_command(CONTAINER_KUBECONFIG))
            .await;
        self.record(&mut report, DeployStep::RewriteKubeconfig, rewritten);

        let applied = self
            .exec(
                &container,
                vec![
                    "kubectl".to_string(),
                    "apply".to_string(),
                    "-f".to_string(),
                    CONTAINER_MANIFEST_DIR.to_string(),
                ],
            )
            .await;
        self.record(&mut report, DeployStep::Apply, applied);

        let removed = self.remove(&container).await;
        self.record(&mut report, DeployStep::Remove, removed);

        info!(
            job = %job.id,
            outcome = ?report.outcome(),
            failed_steps = report.failures().count(),
            "Deploy finished"
        );
        report
    }

    async fn launch(&self, job: &DeployJob) -> Result<String, DeployError> {
        let spec = RunSpec {
            image: self.deploy_image.clone(),
            name: job.id.clone(),
            network: Some(job.cluster.network()),
            env: vec![format!("KUBECONFIG={}", CONTAINER_KUBECONFIG)],
            auto_remove: true,
        };
        debug!(image = %spec.image, name = %spec.name, network = ?spec.network, "Launching deploy container");
        Ok(self.runtime.run_detached(&spec).await?)
    }

    async fn upload(&self, container: &str, job: &DeployJob) -> Result<String, DeployError> {
        let archive = pack_deploy_archive(&job.manifest_dir, &job.kubeconfig_path)?;
        let bytes = archive.len();
        self.runtime.upload_archive(container, "/", archive).await?;
        Ok(format!("{} bytes", bytes))
    }

    async fn exec(&self, container: &str, cmd: Vec<String>) -> Result<String, DeployError> {
        let output = self.runtime.exec(container, &cmd).await?;
        if output.success() {
            Ok(output.stdout.trim_end().to_string())
        } else {
            Err(DeployError::ExecFailed {
                command: cmd.join(" "),
                exit_code: output.exit_code,
                diagnostics: output.diagnostics().to_string(),
            })
        }
    }

    async fn remove(&self, container: &str) -> Result<String, DeployError> {
        match self.runtime.remove(container).await {
            Ok(()) => Ok(String::new()),
            // Auto-remove already reaped it
            Err(RuntimeError::NotFound(_)) => Ok("already removed".to_string()),
            Err(e) => Err(e.into()),
        }
    }

    fn record(
        &self,
        report: &mut DeployReport,
        step: DeployStep,
        result: Result<String, DeployError>,
    ) {
        let result = result.map_err(|e| e.to_string());
        match &result {
            Ok(detail) => debug!(step = %step, detail = %detail, "Deploy step ok"),
            Err(error) => warn!(step = %step, error = %error, "Deploy step failed"),
        }
        self.progress.on_progress(&ProgressEvent::DeployStep {
            step: step.to_string(),
            success: result.is_ok(),
            detail: match &result {
                Ok(d) | Err(d) => d.clone(),
            },
        });
        report.steps.push(StepReport { step, result });
    }
}

/// Warns early when the host kubeconfig has nothing the in-container rewrite
/// would touch. Never fails the deploy.
fn preflight(rewrite: &ServerRewrite, kubeconfig: &Path) {
    let content = match std::fs::read_to_string(kubeconfig) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %kubeconfig.display(), error = %e, "Cannot read host kubeconfig");
            return;
        }
    };

    if !rewrite.matches(&content) {
        warn!(path = %kubeconfig.display(), "No host-facing API server in kubeconfig; rewrite will not change it");
        return;
    }

    match server_entries(&rewrite.apply(&content)) {
        Ok(servers) => debug!(servers = ?servers, "In-cluster API servers"),
        Err(e) => warn!(error = %e, "Host kubeconfig is not valid YAML"),
    }
}
