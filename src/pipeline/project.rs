//! Wiring from a project directory to a pipeline run

use super::context::PipelineContext;
use super::orchestrator::{PipelineOrchestrator, PipelineReport};
use super::stage::Stage;
use crate::cluster::exposed_ports;
use crate::config::{ConfigError, GeppConfig};
use crate::context::{resolve_commit, BuildContext, PortMap};
use crate::process::SystemRunner;
use crate::progress::ProgressHandler;
use crate::runtime::{ContainerRuntime, Disconnected, DockerRuntime, RuntimeError};
use crate::source::ConfigSource;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProjectPipeline {
    ctx: PipelineContext,
}

impl ProjectPipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Real process runner and Docker connection. A runtime that cannot even
    /// be configured is replaced by [`Disconnected`] so the stages that need
    /// it skip instead of the run failing.
    pub fn connect(config: GeppConfig, progress: Arc<dyn ProgressHandler>) -> Self {
        let timeout = config.command_timeout();
        let runtime: Arc<dyn ContainerRuntime> = match DockerRuntime::connect(timeout) {
            Ok(docker) => Arc::new(docker),
            Err(e) => {
                warn!(error = %e, "Container runtime not configured");
                Arc::new(Disconnected::new(e.to_string()))
            }
        };

        Self::new(PipelineContext::new(
            config,
            Arc::new(SystemRunner::new(timeout)),
            runtime,
            progress,
        ))
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Loads project settings from `source` and freezes them, together with
    /// the current commit, into a [`BuildContext`]
    pub async fn prepare(
        &self,
        project_dir: &Path,
        source: &mut dyn ConfigSource,
    ) -> Result<BuildContext, ConfigError> {
        let project_dir = project_dir.canonicalize()?;
        let settings = source.load(&self.ctx.config.project_name_for(&project_dir))?;
        let commit = resolve_commit(self.ctx.runner.as_ref(), &project_dir).await;

        let build = BuildContext::new(project_dir, &settings, commit);
        debug!(app = %build.app_name, commit = %build.commit, "Build context ready");
        Ok(build)
    }

    pub async fn run(&self, build: &BuildContext, stages: &[Stage]) -> PipelineReport {
        PipelineOrchestrator::new(&self.ctx).execute(build, stages).await
    }

    /// Ports of an existing cluster, outside of a full run
    pub async fn ports(&self, build: &BuildContext) -> Result<PortMap, RuntimeError> {
        exposed_ports(self.ctx.runtime.as_ref(), &self.ctx.cluster_handle(build)).await
    }
}
