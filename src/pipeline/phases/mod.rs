// Pipeline stages, one file each, numbered in execution order.
//
// Each stage reads the immutable build context, may add to the run state,
// and reports failure as a StageError. Whether a failure stops the run is
// decided by the orchestrator, never by the stage itself.

#[path = "01_entrypoint.rs"]
pub mod entrypoint;
#[path = "02_dockerfile.rs"]
pub mod dockerfile;
#[path = "03_image_build.rs"]
pub mod image_build;
#[path = "04_manifests.rs"]
pub mod manifests;
#[path = "05_cluster.rs"]
pub mod cluster;
#[path = "06_introspect.rs"]
pub mod introspect;
#[path = "07_deploy.rs"]
pub mod deploy;
#[path = "08_terraform.rs"]
pub mod terraform;

use super::context::{PipelineContext, RunState};
use super::phase_trait::StagePhase;
use super::stage::{Stage, StageError};
use crate::artifacts::{Artifact, ArtifactStatus, Scaffolder};
use crate::context::BuildContext;
use crate::progress::ProgressEvent;
use tracing::warn;

/// The phase implementing `stage`
pub fn phase_for(stage: Stage) -> Box<dyn StagePhase> {
    match stage {
        Stage::Entrypoint => Box::new(entrypoint::EntrypointPhase),
        Stage::Dockerfile => Box::new(dockerfile::DockerfilePhase),
        Stage::ImageBuild => Box::new(image_build::ImageBuildPhase),
        Stage::Manifests => Box::new(manifests::ManifestsPhase),
        Stage::Cluster => Box::new(cluster::ClusterPhase),
        Stage::Introspect => Box::new(introspect::IntrospectPhase),
        Stage::Deploy => Box::new(deploy::DeployPhase),
        Stage::Terraform => Box::new(terraform::TerraformPhase),
    }
}

/// Ensures every artifact, reporting each one. A failing artifact does not
/// stop the others; the first error is returned.
fn ensure_artifacts(
    ctx: &PipelineContext,
    build: &BuildContext,
    state: &mut RunState,
    artifacts: Vec<Artifact>,
) -> Result<(), StageError> {
    let scaffolder = Scaffolder::new(build)?;
    let mut first_error = None;

    for artifact in artifacts {
        match scaffolder.ensure(&artifact) {
            Ok(status) => {
                let created = status == ArtifactStatus::Created;
                if created {
                    state.created.push(artifact.path.clone());
                }
                ctx.emit(ProgressEvent::ArtifactChecked {
                    path: artifact.path.display().to_string(),
                    created,
                });
            }
            Err(e) => {
                warn!(path = %artifact.path.display(), error = %e, "Artifact not written");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
