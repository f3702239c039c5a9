//! Stages, their failure policies, and the errors they return

use crate::artifacts::ArtifactError;
use crate::cluster::ClusterError;
use crate::runtime::RuntimeError;
use crate::terraform::TerraformError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Entrypoint,
    Dockerfile,
    ImageBuild,
    Manifests,
    Cluster,
    Introspect,
    Deploy,
    Terraform,
}

impl Stage {
    /// Everything `gepp up` runs
    pub const ALL: [Stage; 8] = [
        Stage::Entrypoint,
        Stage::Dockerfile,
        Stage::ImageBuild,
        Stage::Manifests,
        Stage::Cluster,
        Stage::Introspect,
        Stage::Deploy,
        Stage::Terraform,
    ];

    /// File generation only; nothing leaves the host
    pub const SCAFFOLD: [Stage; 3] = [Stage::Entrypoint, Stage::Dockerfile, Stage::Manifests];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Entrypoint => "entrypoint",
            Stage::Dockerfile => "dockerfile",
            Stage::ImageBuild => "image-build",
            Stage::Manifests => "manifests",
            Stage::Cluster => "cluster",
            Stage::Introspect => "introspect",
            Stage::Deploy => "deploy",
            Stage::Terraform => "terraform",
        }
    }

    pub fn policy(&self) -> StagePolicy {
        POLICY_TABLE
            .iter()
            .find(|(stage, _)| stage == self)
            .map(|(_, policy)| *policy)
            .unwrap_or(StagePolicy::Degrade)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline does when a stage fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePolicy {
    /// Stop; the process exits non-zero
    Fatal,
    /// Record the failure and carry on with less
    Degrade,
    /// Carry on; the result was informational anyway
    Ignore,
}

impl StagePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagePolicy::Fatal => "fatal",
            StagePolicy::Degrade => "degrade",
            StagePolicy::Ignore => "ignore",
        }
    }
}

impl fmt::Display for StagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every later stage needs the entrypoint, so only its absence is fatal
pub const POLICY_TABLE: [(Stage, StagePolicy); 8] = [
    (Stage::Entrypoint, StagePolicy::Fatal),
    (Stage::Dockerfile, StagePolicy::Degrade),
    (Stage::ImageBuild, StagePolicy::Degrade),
    (Stage::Manifests, StagePolicy::Degrade),
    (Stage::Cluster, StagePolicy::Degrade),
    (Stage::Introspect, StagePolicy::Ignore),
    (Stage::Deploy, StagePolicy::Degrade),
    (Stage::Terraform, StagePolicy::Degrade),
];

#[derive(Debug, Error)]
pub enum StageError {
    /// Container runtime offline; the stage is skipped rather than failed
    #[error("Container runtime unreachable: {0}")]
    RuntimeUnreachable(String),

    /// An external CLI could not be run or exited unsuccessfully
    #[error(transparent)]
    ProcessFailure(#[from] ClusterError),

    #[error("Entrypoint {} not found", .0.display())]
    MissingEntrypoint(PathBuf),

    #[error("Image build failed: {0}")]
    BuildFailure(String),

    #[error("Deploy steps failed: {}", failed_steps.join(", "))]
    PartialDeployFailure { failed_steps: Vec<String> },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Terraform(#[from] TerraformError),

    /// Runtime answered but the call failed
    #[error(transparent)]
    Runtime(RuntimeError),

    /// An earlier stage did not produce what this one needs
    #[error("Requires {0}")]
    Prerequisite(String),
}

impl StageError {
    /// Skips are reported as such instead of as failures
    pub fn is_skip(&self) -> bool {
        matches!(self, StageError::RuntimeUnreachable(_))
    }
}

impl From<RuntimeError> for StageError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unreachable(reason) => StageError::RuntimeUnreachable(reason),
            other => StageError::Runtime(other),
        }
    }
}
