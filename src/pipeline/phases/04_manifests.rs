use crate::artifacts::manifest_artifacts;
use crate::context::BuildContext;
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use async_trait::async_trait;

/// Deployment, service, ingress and autoscaler manifests. Existing files are
/// left alone so hand edits survive re-runs.
pub struct ManifestsPhase;

#[async_trait]
impl StagePhase for ManifestsPhase {
    fn stage(&self) -> Stage {
        Stage::Manifests
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        let artifacts = manifest_artifacts(&ctx.config.manifest_dir, &build.app_name);
        super::ensure_artifacts(ctx, build, state, artifacts)
    }
}
