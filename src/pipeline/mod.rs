pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod project;
pub mod stage;

pub use context::{PipelineContext, RunState};
pub use orchestrator::{PipelineOrchestrator, PipelineReport, StageOutcome, StageRecord};
pub use project::ProjectPipeline;
pub use stage::{Stage, StageError, StagePolicy, POLICY_TABLE};
