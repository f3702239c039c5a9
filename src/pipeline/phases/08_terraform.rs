use crate::context::BuildContext;
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use crate::progress::ProgressEvent;
use crate::terraform::{write_stack, AksStackParams};
use async_trait::async_trait;

pub struct TerraformPhase;

#[async_trait]
impl StagePhase for TerraformPhase {
    fn stage(&self) -> Stage {
        Stage::Terraform
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        let path = write_stack(&build.project_dir, &build.app_name, &AksStackParams::default())?;

        let shown = path.strip_prefix(&build.project_dir).unwrap_or(&path);
        ctx.emit(ProgressEvent::TerraformWritten {
            path: shown.display().to_string(),
        });
        state.terraform = Some(path);
        Ok(())
    }
}
