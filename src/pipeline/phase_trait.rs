use super::context::{PipelineContext, RunState};
use super::stage::{Stage, StageError};
use crate::context::BuildContext;
use async_trait::async_trait;

#[async_trait]
pub trait StagePhase: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError>;
}
