//! Configuration management for gepp
//!
//! Settings are loaded from environment variables with sensible defaults. They
//! cover the names of the external tools the pipeline drives, where the
//! generated files live, and how long any single external call may block.
//!
//! # Environment Variables
//!
//! - `PROJECT_NAME`: Project name, slugified into the app/cluster name - default: the project directory name
//! - `GEPP_DEPLOY_IMAGE`: Image used for the ephemeral deploy container - default: "guray/gepp-kubectl:v1.18.6"
//! - `GEPP_K3D_BIN`: Cluster CLI executable - default: "k3d"
//! - `GEPP_KUBECONFIG`: Host kubeconfig file, relative to the project - default: "kubeconfig"
//! - `GEPP_MANIFEST_DIR`: Manifest directory, relative to the project - default: "kubernetes"
//! - `GEPP_COMMAND_TIMEOUT`: Timeout in seconds for each external call - default: "300"
//! - `GEPP_LOG_LEVEL`: Diagnostics level on stderr - default: "warn"
//! - `GEPP_LOG_JSON`: Emit diagnostics as JSON lines - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use gepp::GeppConfig;
//!
//! let config = GeppConfig::default().with_fallbacks();
//! assert!(config.validate().is_ok());
//! println!("{}", config);
//! ```

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_PROJECT_NAME: &str = "project";
const DEFAULT_DEPLOY_IMAGE: &str = "guray/gepp-kubectl:v1.18.6";
const DEFAULT_K3D_BIN: &str = "k3d";
const DEFAULT_KUBECONFIG: &str = "kubeconfig";
const DEFAULT_MANIFEST_DIR: &str = "kubernetes";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Reading an interactive answer failed
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Main configuration structure for gepp
#[derive(Debug, Clone)]
pub struct GeppConfig {
    /// Unslugified project name; `None` names the project after its directory
    pub project_name: Option<String>,

    /// Image holding kubectl and sed, run inside the cluster network
    pub deploy_image: String,

    /// Cluster lifecycle CLI
    pub k3d_bin: String,

    /// Host kubeconfig path, relative to the project directory
    pub kubeconfig: PathBuf,

    /// Manifest directory, relative to the project directory
    pub manifest_dir: PathBuf,

    /// Upper bound for any single external call
    pub command_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeppConfig {
    /// Loads `GEPP_*` variables (and `PROJECT_NAME`), falling back to defaults
    fn default() -> Self {
        let project_name = env::var("PROJECT_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty());

        let deploy_image =
            env::var("GEPP_DEPLOY_IMAGE").unwrap_or_else(|_| DEFAULT_DEPLOY_IMAGE.to_string());

        let k3d_bin = env::var("GEPP_K3D_BIN").unwrap_or_else(|_| DEFAULT_K3D_BIN.to_string());

        let kubeconfig = env::var("GEPP_KUBECONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_KUBECONFIG));

        let manifest_dir = env::var("GEPP_MANIFEST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MANIFEST_DIR));

        let command_timeout_secs = env::var("GEPP_COMMAND_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS);

        let log_level = env::var("GEPP_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            project_name,
            deploy_image,
            k3d_bin,
            kubeconfig,
            manifest_dir,
            command_timeout_secs,
            log_level,
        }
    }
}

impl GeppConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` on an out-of-range timeout, an
    /// empty deploy image or tool name, or an unknown log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Command timeout must be at least 1 second".to_string(),
            ));
        }
        if self.command_timeout_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "Command timeout cannot exceed 1 hour".to_string(),
            ));
        }

        if self.deploy_image.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Deploy image must not be empty".to_string(),
            ));
        }

        if self.k3d_bin.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Cluster CLI executable must not be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Replaces each invalid setting with its default
    ///
    /// A bad value never aborts a run. Every field that `validate` would
    /// reject is logged and reset on its own, so the rest of the
    /// configuration is kept as given.
    pub fn with_fallbacks(mut self) -> Self {
        if !(1..=3600).contains(&self.command_timeout_secs) {
            warn!(
                value = self.command_timeout_secs,
                default = DEFAULT_COMMAND_TIMEOUT_SECS,
                "GEPP_COMMAND_TIMEOUT must be between 1 and 3600 seconds, using default"
            );
            self.command_timeout_secs = DEFAULT_COMMAND_TIMEOUT_SECS;
        }

        if self.deploy_image.trim().is_empty() {
            warn!(
                default = DEFAULT_DEPLOY_IMAGE,
                "GEPP_DEPLOY_IMAGE is empty, using default"
            );
            self.deploy_image = DEFAULT_DEPLOY_IMAGE.to_string();
        }

        if self.k3d_bin.trim().is_empty() {
            warn!(default = DEFAULT_K3D_BIN, "GEPP_K3D_BIN is empty, using default");
            self.k3d_bin = DEFAULT_K3D_BIN.to_string();
        }

        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            warn!(
                value = %self.log_level,
                default = DEFAULT_LOG_LEVEL,
                "Invalid GEPP_LOG_LEVEL, using default"
            );
            self.log_level = DEFAULT_LOG_LEVEL.to_string();
        }

        self
    }

    /// `PROJECT_NAME` when set, otherwise the basename of `project_dir`
    pub fn project_name_for(&self, project_dir: &Path) -> String {
        if let Some(name) = &self.project_name {
            return name.clone();
        }
        project_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(
            "project_name".to_string(),
            self.project_name.clone().unwrap_or_default(),
        );
        map.insert("deploy_image".to_string(), self.deploy_image.clone());
        map.insert("k3d_bin".to_string(), self.k3d_bin.clone());
        map.insert(
            "kubeconfig".to_string(),
            self.kubeconfig.display().to_string(),
        );
        map.insert(
            "manifest_dir".to_string(),
            self.manifest_dir.display().to_string(),
        );
        map.insert(
            "command_timeout_secs".to_string(),
            self.command_timeout_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for GeppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gepp Configuration:")?;
        writeln!(
            f,
            "  Project: {}",
            self.project_name.as_deref().unwrap_or("(directory name)")
        )?;
        writeln!(f, "  Deploy Image: {}", self.deploy_image)?;
        writeln!(f, "  Cluster CLI: {}", self.k3d_bin)?;
        writeln!(f, "  Kubeconfig: {}", self.kubeconfig.display())?;
        writeln!(f, "  Manifest Dir: {}", self.manifest_dir.display())?;
        writeln!(f, "  Command Timeout: {}s", self.command_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
