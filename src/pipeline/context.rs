//! Pipeline context for managing dependencies

use crate::config::GeppConfig;
use crate::context::{BuildContext, ClusterHandle, ImageReference, PortMap};
use crate::deploy::DeployReport;
use crate::process::CommandRunner;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::runtime::ContainerRuntime;
use std::path::PathBuf;
use std::sync::Arc;

/// Context that owns all long-lived pipeline dependencies
pub struct PipelineContext {
    /// Runtime configuration
    pub config: GeppConfig,

    /// External CLIs (git, k3d)
    pub runner: Arc<dyn CommandRunner>,

    /// Container runtime API
    pub runtime: Arc<dyn ContainerRuntime>,

    /// Receives every progress event
    pub progress: Arc<dyn ProgressHandler>,
}

impl PipelineContext {
    pub fn new(
        config: GeppConfig,
        runner: Arc<dyn CommandRunner>,
        runtime: Arc<dyn ContainerRuntime>,
        progress: Arc<dyn ProgressHandler>,
    ) -> Self {
        Self {
            config,
            runner,
            runtime,
            progress,
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        self.progress.on_progress(&event);
    }

    /// The cluster this project deploys to
    pub fn cluster_handle(&self, build: &BuildContext) -> ClusterHandle {
        ClusterHandle::new(build.app_name.clone(), build.resolve(&self.config.kubeconfig))
    }

    pub fn manifest_dir(&self, build: &BuildContext) -> PathBuf {
        build.resolve(&self.config.manifest_dir)
    }
}

/// What stages hand to later stages
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Set only when the image build succeeded
    pub image: Option<ImageReference>,
    /// Set once the cluster exists and the kubeconfig is merged
    pub cluster: Option<ClusterHandle>,
    pub ports: Option<PortMap>,
    pub deploy: Option<DeployReport>,
    /// Files the run wrote for the first time
    pub created: Vec<PathBuf>,
    pub terraform: Option<PathBuf>,
}
