//! gepp - scaffold, build and deploy a project onto a local Kubernetes cluster
//!
//! Given a project directory with an application entrypoint, gepp generates
//! whatever is missing to containerize it, builds the image, provisions a
//! k3d cluster named after the project, applies the manifests from inside
//! the cluster network, and writes a Terraform stack for a managed AKS
//! equivalent.
//!
//! # Example Usage
//!
//! ```no_run
//! use gepp::pipeline::{ProjectPipeline, Stage};
//! use gepp::progress::LoggingHandler;
//! use gepp::{DefaultConfig, GeppConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ProjectPipeline::connect(GeppConfig::default(), Arc::new(LoggingHandler));
//! let build = pipeline.prepare(Path::new("."), &mut DefaultConfig).await?;
//! let report = pipeline.run(&build, &Stage::ALL).await;
//! std::process::exit(report.exit_code());
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: stage orchestration and the per-stage failure policy
//! - [`artifacts`]: embedded templates and write-once file creation
//! - [`image`], [`cluster`], [`deploy`]: the container runtime and k3d steps
//! - [`terraform`]: the AKS stack emitter
//! - [`process`], [`runtime`]: seams to external CLIs and the Docker API

pub mod artifacts;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod context;
pub mod deploy;
pub mod image;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod runtime;
pub mod source;
pub mod terraform;
pub mod util;

// Re-export key types for convenient access
pub use config::{ConfigError, GeppConfig};
pub use context::{BuildContext, ClusterHandle, DeployJob, ImageReference, PortMap};
pub use pipeline::{PipelineReport, ProjectPipeline, Stage, StageError, StagePolicy};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
pub use source::{ConfigSource, DefaultConfig, InteractiveConfig, ProjectSettings};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
