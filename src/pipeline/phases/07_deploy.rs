use crate::context::{BuildContext, DeployJob};
use crate::deploy::DeployExecutor;
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use async_trait::async_trait;

pub struct DeployPhase;

#[async_trait]
impl StagePhase for DeployPhase {
    fn stage(&self) -> Stage {
        Stage::Deploy
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        let handle = state
            .cluster
            .clone()
            .ok_or_else(|| StageError::Prerequisite("a ready cluster".to_string()))?;

        ctx.runtime.version().await?;

        let job = DeployJob::new(handle, ctx.manifest_dir(build));
        let report = DeployExecutor::new(
            ctx.runtime.clone(),
            ctx.config.deploy_image.clone(),
            ctx.progress.clone(),
        )
        .deploy(&job)
        .await;

        let failed_steps: Vec<String> = report.failures().map(|s| s.step.to_string()).collect();
        state.deploy = Some(report);

        if failed_steps.is_empty() {
            Ok(())
        } else {
            Err(StageError::PartialDeployFailure { failed_steps })
        }
    }
}
