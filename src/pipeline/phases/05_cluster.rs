use crate::cluster::{ClusterManager, K3dCli};
use crate::context::{BuildContext, ImageReference};
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use async_trait::async_trait;
use tracing::debug;

pub struct ClusterPhase;

#[async_trait]
impl StagePhase for ClusterPhase {
    fn stage(&self) -> Stage {
        Stage::Cluster
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        let handle = ctx.cluster_handle(build);
        let manager = ClusterManager::new(
            ctx.runner.clone(),
            K3dCli::new(ctx.config.k3d_bin.clone()),
            ctx.progress.clone(),
        );

        // Without a built image there is nothing to import
        let images: Vec<ImageReference> = state.image.iter().cloned().collect();
        let ready = manager.ensure_cluster(&handle, &images).await?;
        debug!(cluster = %handle.name, created = ready.created, imported = ready.imported.len(), "Cluster ready");

        state.cluster = Some(handle);
        Ok(())
    }
}
