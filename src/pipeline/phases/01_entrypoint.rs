use crate::context::BuildContext;
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use crate::progress::ProgressEvent;
use async_trait::async_trait;

pub struct EntrypointPhase;

#[async_trait]
impl StagePhase for EntrypointPhase {
    fn stage(&self) -> Stage {
        Stage::Entrypoint
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        _state: &mut RunState,
    ) -> Result<(), StageError> {
        let path = build.entrypoint_path();
        let found = path.is_file();

        ctx.emit(ProgressEvent::EntrypointLocated {
            path: build.main_entrypoint.display().to_string(),
            found,
        });

        if found {
            Ok(())
        } else {
            Err(StageError::MissingEntrypoint(path))
        }
    }
}
