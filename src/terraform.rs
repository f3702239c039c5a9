//! Terraform JSON for a managed AKS equivalent of the local cluster
//!
//! Output goes to `cdktf.out/stacks/<app>/cdk.tf.json`, the layout CDK for
//! Terraform synthesizes, so `terraform init/plan/apply` can run in that
//! directory. Unlike the Kubernetes manifests this file is rewritten on
//! every run; edit the stack parameters rather than the output.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const OUTPUT_DIR: &str = "cdktf.out";
pub const STACK_FILE: &str = "cdk.tf.json";

#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("Failed to serialize stack: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Knobs of the generated stack; each becomes a Terraform variable default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AksStackParams {
    pub instance_type: String,
    pub cluster_name: String,
    pub dns_prefix: String,
    pub location: String,
    pub resource_group: String,
    pub cluster_size: u32,
}

impl Default for AksStackParams {
    fn default() -> Self {
        Self {
            instance_type: "Standard_D2_v2".to_string(),
            cluster_name: "gepp-kube-cluster".to_string(),
            dns_prefix: "gepp".to_string(),
            location: "East US".to_string(),
            resource_group: "gepp".to_string(),
            cluster_size: 3,
        }
    }
}

fn variable(description: &str, kind: &str, default: Value) -> Value {
    json!({
        "description": description,
        "type": kind,
        "default": default,
    })
}

/// Terraform JSON document for `stack_name`
pub fn render_stack(stack_name: &str, params: &AksStackParams) -> Value {
    let cluster = &params.cluster_name;

    json!({
        "//": {
            "metadata": {
                "stackName": stack_name,
                "generator": format!("gepp {}", crate::VERSION),
            }
        },
        "terraform": {
            "required_providers": {
                "azurerm": { "source": "azurerm" }
            }
        },
        "provider": {
            "azurerm": [{ "features": [{}] }]
        },
        "resource": {
            "azurerm_kubernetes_cluster": {
                cluster.as_str(): {
                    "name": cluster,
                    "dns_prefix": params.dns_prefix,
                    "location": "${var.cluster_location}",
                    "resource_group_name": "${var.resource_group}",
                    "default_node_pool": [{
                        "name": "default",
                        "node_count": 1,
                        "vm_size": "${var.instance_type}",
                    }],
                    "identity": [{ "type": "SystemAssigned" }],
                    "tags": { "generated": "gepp" },
                }
            }
        },
        "output": {
            "kubeconfig": {
                "value": format!("${{azurerm_kubernetes_cluster.{}.kube_config_raw}}", cluster),
                "sensitive": true,
            }
        },
        "variable": {
            "cluster_size": variable(
                "Number of nodes that will be in default pool",
                "number",
                json!(params.cluster_size),
            ),
            "instance_type": variable("Instance type", "string", json!(params.instance_type)),
            "cluster_location": variable(
                "Location of the cluster",
                "string",
                json!(params.location),
            ),
            "resource_group": variable(
                "Azure resource group name for cluster to be created in",
                "string",
                json!(params.resource_group),
            ),
        }
    })
}

/// Where [`write_stack`] puts the stack for `app_name`
pub fn stack_path(project_dir: &Path, app_name: &str) -> PathBuf {
    project_dir
        .join(OUTPUT_DIR)
        .join("stacks")
        .join(app_name)
        .join(STACK_FILE)
}

/// Writes (or overwrites) the stack file and returns its path
pub fn write_stack(
    project_dir: &Path,
    app_name: &str,
    params: &AksStackParams,
) -> Result<PathBuf, TerraformError> {
    let path = stack_path(project_dir, app_name);
    let io_err = |source| TerraformError::Io {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut content = serde_json::to_string_pretty(&render_stack(app_name, params))?;
    content.push('\n');
    fs::write(&path, content).map_err(io_err)?;

    info!(path = %path.display(), cluster = %params.cluster_name, "Wrote Terraform stack");
    Ok(path)
}
