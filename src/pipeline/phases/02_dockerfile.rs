use crate::artifacts::container_artifacts;
use crate::context::BuildContext;
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use async_trait::async_trait;

/// `Dockerfile` and `.dockerignore`, written only when absent
pub struct DockerfilePhase;

#[async_trait]
impl StagePhase for DockerfilePhase {
    fn stage(&self) -> Stage {
        Stage::Dockerfile
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        super::ensure_artifacts(ctx, build, state, container_artifacts())
    }
}
