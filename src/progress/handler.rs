//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while the pipeline runs
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Pipeline started
    Started { project_dir: String },

    /// A stage is about to run
    StageStarted { stage: String },

    /// A stage returned successfully
    StageFinished { stage: String, duration: Duration },

    /// A stage could not run because something it needs is unavailable
    StageSkipped { stage: String, reason: String },

    /// A stage failed; `policy` says what the pipeline does about it
    StageFailed {
        stage: String,
        policy: String,
        error: String,
    },

    /// Entrypoint probe result
    EntrypointLocated { path: String, found: bool },

    /// Artifact writer result; `created` is false when the file already existed
    ArtifactChecked { path: String, created: bool },

    /// Container runtime answered the handshake
    RuntimeConnected { version: String },

    ImageBuilt { reference: String },

    ImageFailed { reference: String, error: String },

    /// Cluster probe result
    ClusterProbed { name: String, exists: bool },

    ClusterCreated { name: String },

    KubeconfigMerged { path: String },

    ImageImported { reference: String },

    /// Load balancer URLs reachable from the host
    PortsDiscovered {
        http_url: Option<String>,
        https_url: Option<String>,
    },

    /// One step of the ephemeral deploy executor
    DeployStep {
        step: String,
        success: bool,
        detail: String,
    },

    TerraformWritten { path: String },

    /// Pipeline finished; `exit_code` is what the process will exit with
    Completed { total_time: Duration, exit_code: i32 },
}

/// Trait for handling progress events during a pipeline run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards every event to each inner handler in order
pub struct FanOut {
    handlers: Vec<std::sync::Arc<dyn ProgressHandler>>,
}

impl FanOut {
    pub fn new(handlers: Vec<std::sync::Arc<dyn ProgressHandler>>) -> Self {
        Self { handlers }
    }
}

impl ProgressHandler for FanOut {
    fn on_progress(&self, event: &ProgressEvent) {
        for handler in &self.handlers {
            handler.on_progress(event);
        }
    }
}
