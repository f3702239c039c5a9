use crate::context::BuildContext;
use crate::image::{BuildOutcome, ImageBuilder};
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use crate::progress::ProgressEvent;
use async_trait::async_trait;

pub struct ImageBuildPhase;

#[async_trait]
impl StagePhase for ImageBuildPhase {
    fn stage(&self) -> Stage {
        Stage::ImageBuild
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        let reference = build.image_reference();
        let outcome = ImageBuilder::new(ctx.runtime.clone())
            .build(build, &reference)
            .await;

        match outcome {
            BuildOutcome::Built {
                reference,
                engine_version,
            } => {
                ctx.emit(ProgressEvent::RuntimeConnected {
                    version: engine_version,
                });
                ctx.emit(ProgressEvent::ImageBuilt {
                    reference: reference.to_string(),
                });
                state.image = Some(reference);
                Ok(())
            }
            BuildOutcome::Skipped { reason } => Err(StageError::RuntimeUnreachable(reason)),
            BuildOutcome::Failed { reference, error } => {
                ctx.emit(ProgressEvent::ImageFailed {
                    reference: reference.to_string(),
                    error: error.clone(),
                });
                Err(StageError::BuildFailure(error))
            }
        }
    }
}
