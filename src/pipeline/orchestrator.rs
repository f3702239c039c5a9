use super::context::{PipelineContext, RunState};
use super::phases::phase_for;
use super::stage::{Stage, StagePolicy};
use crate::context::BuildContext;
use crate::progress::ProgressEvent;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The container runtime was unreachable
    Skipped { reason: String },
    Failed { policy: StagePolicy, error: String },
    /// A fatal failure earlier stopped the run
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stages: Vec<StageRecord>,
    pub state: RunState,
    pub total_time: Duration,
}

impl PipelineReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    pub fn fatal(&self) -> Option<&StageRecord> {
        self.stages.iter().find(|r| {
            matches!(
                r.outcome,
                StageOutcome::Failed {
                    policy: StagePolicy::Fatal,
                    ..
                }
            )
        })
    }

    /// Stages that failed under [`StagePolicy::Degrade`]
    pub fn degraded(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    StageOutcome::Failed {
                        policy: StagePolicy::Degrade,
                        ..
                    }
                )
            })
            .map(|r| r.stage)
            .collect()
    }

    /// 1 only when a fatal stage failed
    pub fn exit_code(&self) -> i32 {
        if self.fatal().is_some() {
            1
        } else {
            0
        }
    }
}

pub struct PipelineOrchestrator<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Runs `stages` in order. Only a [`StagePolicy::Fatal`] failure stops the
    /// run; the remaining stages are then recorded as [`StageOutcome::NotRun`].
    pub async fn execute(&self, build: &BuildContext, stages: &[Stage]) -> PipelineReport {
        let start = Instant::now();
        info!(
            "Starting pipeline for: {} ({} stages)",
            build.project_dir.display(),
            stages.len()
        );
        self.ctx.emit(ProgressEvent::Started {
            project_dir: build.project_dir.display().to_string(),
        });

        let mut state = RunState::default();
        let mut records = Vec::with_capacity(stages.len());
        let mut stopped = false;

        for &stage in stages {
            if stopped {
                records.push(StageRecord {
                    stage,
                    outcome: StageOutcome::NotRun,
                });
                continue;
            }

            self.ctx.emit(ProgressEvent::StageStarted {
                stage: stage.to_string(),
            });
            let stage_start = Instant::now();
            let phase = phase_for(stage);

            let outcome = match phase.execute(self.ctx, build, &mut state).await {
                Ok(()) => {
                    self.ctx.emit(ProgressEvent::StageFinished {
                        stage: stage.to_string(),
                        duration: stage_start.elapsed(),
                    });
                    debug!("Stage {} complete", stage);
                    StageOutcome::Completed
                }
                Err(e) if e.is_skip() => {
                    let reason = e.to_string();
                    info!(stage = %stage, reason = %reason, "Stage skipped");
                    self.ctx.emit(ProgressEvent::StageSkipped {
                        stage: stage.to_string(),
                        reason: reason.clone(),
                    });
                    StageOutcome::Skipped { reason }
                }
                Err(e) => {
                    let policy = stage.policy();
                    let message = e.to_string();
                    match policy {
                        StagePolicy::Fatal => error!(stage = %stage, error = %message, "Fatal stage failure"),
                        StagePolicy::Degrade => warn!(stage = %stage, error = %message, "Stage failed, continuing"),
                        StagePolicy::Ignore => debug!(stage = %stage, error = %message, "Stage failed, ignored"),
                    }
                    self.ctx.emit(ProgressEvent::StageFailed {
                        stage: stage.to_string(),
                        policy: policy.to_string(),
                        error: message.clone(),
                    });
                    stopped = policy == StagePolicy::Fatal;
                    StageOutcome::Failed {
                        policy,
                        error: message,
                    }
                }
            };

            records.push(StageRecord { stage, outcome });
        }

        let report = PipelineReport {
            stages: records,
            state,
            total_time: start.elapsed(),
        };

        info!(
            exit_code = report.exit_code(),
            degraded = ?report.degraded(),
            "Pipeline complete"
        );
        self.ctx.emit(ProgressEvent::Completed {
            total_time: report.total_time,
            exit_code: report.exit_code(),
        });

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeppConfig;
    use crate::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
    use crate::progress::NoOpHandler;
    use crate::runtime::Disconnected;
    use crate::source::ProjectSettings;
    use async_trait::async_trait;
    use serial_test::serial;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Every external CLI is missing
    struct NoTools;

    #[async_trait]
    impl CommandRunner for NoTools {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
            Err(ProcessError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    fn context() -> PipelineContext {
        PipelineContext::new(
            GeppConfig::default(),
            Arc::new(NoTools),
            Arc::new(Disconnected::new("no daemon")),
            Arc::new(NoOpHandler),
        )
    }

    fn build(dir: &TempDir) -> BuildContext {
        BuildContext::new(
            dir.path().to_path_buf(),
            &ProjectSettings::defaults_for("myapp"),
            "latest".to_string(),
        )
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_entrypoint_stops_run() {
        let dir = TempDir::new().unwrap();
        let ctx = context();

        let report = PipelineOrchestrator::new(&ctx)
            .execute(&build(&dir), &Stage::ALL)
            .await;

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.fatal().unwrap().stage, Stage::Entrypoint);
        assert_eq!(report.outcome(Stage::Terraform), Some(&StageOutcome::NotRun));
        assert!(!dir.path().join("Dockerfile").exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_offline_host_degrades() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        let ctx = context();

        let report = PipelineOrchestrator::new(&ctx)
            .execute(&build(&dir), &Stage::ALL)
            .await;

        assert_eq!(report.exit_code(), 0);
        assert!(matches!(
            report.outcome(Stage::ImageBuild),
            Some(StageOutcome::Skipped { .. })
        ));
        assert_eq!(report.degraded(), vec![Stage::Cluster, Stage::Deploy]);
        assert!(matches!(
            report.outcome(Stage::Introspect),
            Some(StageOutcome::Skipped { .. })
        ));
        assert_eq!(report.outcome(Stage::Terraform), Some(&StageOutcome::Completed));
        assert!(report.state.image.is_none());
        assert!(dir.path().join("kubernetes/deployment-myapp.yaml").is_file());
        assert!(dir
            .path()
            .join("cdktf.out/stacks/myapp/cdk.tf.json")
            .is_file());
    }
}
