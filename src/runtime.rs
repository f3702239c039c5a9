//! Container runtime access
//!
//! [`ContainerRuntime`] is the seam between the pipeline and the Docker
//! Engine API. [`DockerRuntime`] talks to the local daemon through `bollard`;
//! tests substitute an in-memory implementation.

use crate::process::CommandOutput;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    UploadToContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::BuildImageOptions;
use bollard::service::HostConfig;
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors surfaced by the container runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Daemon cannot be reached or did not answer the handshake
    #[error("Container runtime unreachable: {0}")]
    Unreachable(String),

    /// Container or image does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image build reported an error
    #[error("Image build failed: {0}")]
    Build(String),

    /// Any other API failure
    #[error("Container runtime API error: {0}")]
    Api(String),
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            bollard::errors::Error::SocketNotFoundError(path) => {
                RuntimeError::Unreachable(format!("socket not found at {}", path))
            }
            other => RuntimeError::Api(other.to_string()),
        }
    }
}

/// Parameters for a detached container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub network: Option<String>,
    pub env: Vec<String>,
    /// Daemon deletes the container as soon as it stops
    pub auto_remove: bool,
}

/// Published host ports keyed by `"<port>/<proto>"`
pub type PortBindings = HashMap<String, Vec<String>>;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Handshake; returns the engine version
    async fn version(&self) -> Result<String, RuntimeError>;

    /// Builds `tag` from an uncompressed tar of the build context
    async fn build_image(&self, context: Vec<u8>, tag: &str) -> Result<(), RuntimeError>;

    async fn port_bindings(&self, container: &str) -> Result<PortBindings, RuntimeError>;

    /// Creates and starts a container, returning its id
    async fn run_detached(&self, spec: &RunSpec) -> Result<String, RuntimeError>;

    /// Extracts an uncompressed tar archive at `path` inside the container
    async fn upload_archive(
        &self,
        container: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError>;

    async fn exec(&self, container: &str, cmd: &[String]) -> Result<CommandOutput, RuntimeError>;

    /// Force-removes a container, running or not
    async fn remove(&self, container: &str) -> Result<(), RuntimeError>;
}

/// Stand-in used when no connection to the daemon could be set up at all;
/// every call reports [`RuntimeError::Unreachable`].
#[derive(Debug, Clone)]
pub struct Disconnected {
    reason: String,
}

impl Disconnected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn err<T>(&self) -> Result<T, RuntimeError> {
        Err(RuntimeError::Unreachable(self.reason.clone()))
    }
}

#[async_trait]
impl ContainerRuntime for Disconnected {
    async fn version(&self) -> Result<String, RuntimeError> {
        self.err()
    }

    async fn build_image(&self, _context: Vec<u8>, _tag: &str) -> Result<(), RuntimeError> {
        self.err()
    }

    async fn port_bindings(&self, _container: &str) -> Result<PortBindings, RuntimeError> {
        self.err()
    }

    async fn run_detached(&self, _spec: &RunSpec) -> Result<String, RuntimeError> {
        self.err()
    }

    async fn upload_archive(
        &self,
        _container: &str,
        _path: &str,
        _archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        self.err()
    }

    async fn exec(&self, _container: &str, _cmd: &[String]) -> Result<CommandOutput, RuntimeError> {
        self.err()
    }

    async fn remove(&self, _container: &str) -> Result<(), RuntimeError> {
        self.err()
    }
}

/// Docker Engine API over the local socket
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects with local defaults; `timeout` bounds every API request.
    ///
    /// Connecting does not contact the daemon. Call
    /// [`ContainerRuntime::version`] to find out whether it is reachable.
    pub fn connect(timeout: Duration) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unreachable(e.to_string()))?
            .with_timeout(timeout);
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn version(&self) -> Result<String, RuntimeError> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| RuntimeError::Unreachable(e.to_string()))?;

        let engine = version
            .components
            .as_ref()
            .and_then(|c| c.first())
            .map(|c| c.version.clone())
            .or(version.version)
            .unwrap_or_else(|| "unknown".to_string());

        debug!(
            engine = %engine,
            api_version = ?version.api_version,
            "Connected to container runtime"
        );
        Ok(engine)
    }

    async fn build_image(&self, context: Vec<u8>, tag: &str) -> Result<(), RuntimeError> {
        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self
            .docker
            .build_image(options, None, Some(Bytes::from(context)));

        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| RuntimeError::Build(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(RuntimeError::Build(error));
            }
            if let Some(line) = info.stream {
                let line = line.trim_end();
                if !line.is_empty() {
                    trace!(build = %line);
                }
            }
        }

        Ok(())
    }

    async fn port_bindings(&self, container: &str) -> Result<PortBindings, RuntimeError> {
        let inspect = self.docker.inspect_container(container, None).await?;

        let ports = inspect
            .network_settings
            .and_then(|ns| ns.ports)
            .unwrap_or_default();

        Ok(ports
            .into_iter()
            .map(|(port, bindings)| {
                let host_ports = bindings
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|b| b.host_port)
                    .collect();
                (port, host_ports)
            })
            .collect())
    }

    async fn run_detached(&self, spec: &RunSpec) -> Result<String, RuntimeError> {
        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            host_config: Some(HostConfig {
                network_mode: spec.network.clone(),
                auto_remove: Some(spec.auto_remove),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.as_str(),
                    platform: None,
                }),
                config,
            )
            .await?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;

        Ok(created.id)
    }

    async fn upload_archive(
        &self,
        container: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        self.docker
            .upload_to_container(
                container,
                Some(UploadToContainerOptions {
                    path,
                    ..Default::default()
                }),
                Bytes::from(archive),
            )
            .await?;
        Ok(())
    }

    async fn exec(&self, container: &str, cmd: &[String]) -> Result<CommandOutput, RuntimeError> {
        let exec = self
            .docker
            .create_exec(
                container,
                CreateExecOptions {
                    cmd: Some(cmd.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(chunk) = output.next().await {
                match chunk? {
                    bollard::container::LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message))
                    }
                    other => stdout.push_str(&other.to_string()),
                }
            }
        }

        let exit_code = self
            .docker
            .inspect_exec(&exec.id)
            .await?
            .exit_code
            .map(|c| c as i32);

        Ok(CommandOutput::new(exit_code, stdout, stderr))
    }

    async fn remove(&self, container: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(
                container,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }
}
