//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { project_dir } => {
                info!(project = %project_dir, "Starting pipeline");
            }
            ProgressEvent::StageStarted { stage } => {
                debug!(stage = %stage, "Starting stage");
            }
            ProgressEvent::StageFinished { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::StageSkipped { stage, reason } => {
                info!(stage = %stage, reason = %reason, "Stage skipped");
            }
            ProgressEvent::StageFailed {
                stage,
                policy,
                error,
            } => {
                warn!(stage = %stage, policy = %policy, error = %error, "Stage failed");
            }
            ProgressEvent::EntrypointLocated { path, found } => {
                if *found {
                    debug!(path = %path, "Entrypoint present");
                } else {
                    warn!(path = %path, "Entrypoint missing");
                }
            }
            ProgressEvent::ArtifactChecked { path, created } => {
                debug!(path = %path, created, "Artifact checked");
            }
            ProgressEvent::RuntimeConnected { version } => {
                debug!(version = %version, "Container runtime connected");
            }
            ProgressEvent::ImageBuilt { reference } => {
                info!(image = %reference, "Image built");
            }
            ProgressEvent::ImageFailed { reference, error } => {
                warn!(image = %reference, error = %error, "Image build failed");
            }
            ProgressEvent::ClusterProbed { name, exists } => {
                debug!(cluster = %name, exists, "Cluster probed");
            }
            ProgressEvent::ClusterCreated { name } => {
                info!(cluster = %name, "Cluster created");
            }
            ProgressEvent::KubeconfigMerged { path } => {
                debug!(path = %path, "Kubeconfig merged");
            }
            ProgressEvent::ImageImported { reference } => {
                debug!(image = %reference, "Image imported");
            }
            ProgressEvent::PortsDiscovered {
                http_url,
                https_url,
            } => {
                info!(http = ?http_url, https = ?https_url, "Ingress reachable");
            }
            ProgressEvent::DeployStep {
                step,
                success,
                detail,
            } => {
                if *success {
                    debug!(step = %step, detail = %detail, "Deploy step complete");
                } else {
                    warn!(step = %step, error = %detail, "Deploy step failed");
                }
            }
            ProgressEvent::TerraformWritten { path } => {
                info!(path = %path, "Terraform stack written");
            }
            ProgressEvent::Completed {
                total_time,
                exit_code,
            } => {
                info!(
                    exit_code,
                    total_time_ms = total_time.as_millis(),
                    "Pipeline complete"
                );
            }
        }
    }
}
