//! Kubeconfig endpoint rewriting
//!
//! The host kubeconfig written by `k3d kubeconfig merge` points at the
//! load balancer's published port on the host. From inside the cluster
//! network that address is meaningless, so the copy inside the deploy
//! container is rewritten to the load balancer's container name and the API
//! port. The host file itself is never modified.

use crate::context::ClusterHandle;
use regex::{NoExpand, Regex};
use serde::Deserialize;

/// Host-facing API server addresses k3d writes into kubeconfigs. Valid as
/// both a POSIX ERE (for `sed -E`) and a Rust regex.
const HOST_SERVER_PATTERN: &str =
    r"https://(0\.0\.0\.0|127\.0\.0\.1|localhost|host\.docker\.internal):[0-9]+";

#[derive(Debug, Deserialize)]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    server: String,
}

/// Every `clusters[].cluster.server` in a kubeconfig document
pub fn server_entries(kubeconfig: &str) -> Result<Vec<String>, serde_yaml::Error> {
    let parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)?;
    Ok(parsed
        .clusters
        .into_iter()
        .map(|c| c.cluster.server)
        .collect())
}

/// Substitution of host-facing server addresses with the in-cluster endpoint
#[derive(Debug, Clone)]
pub struct ServerRewrite {
    pattern: Regex,
    replacement: String,
}

impl ServerRewrite {
    pub fn for_cluster(handle: &ClusterHandle) -> Self {
        Self {
            pattern: Regex::new(HOST_SERVER_PATTERN).expect("static pattern compiles"),
            replacement: handle.internal_api_endpoint(),
        }
    }

    pub fn matches(&self, kubeconfig: &str) -> bool {
        self.pattern.is_match(kubeconfig)
    }

    /// In-process equivalent of [`Self::sed_command`]: the first match on each
    /// line is replaced, everything else is left byte-for-byte intact.
    pub fn apply(&self, kubeconfig: &str) -> String {
        kubeconfig
            .split_inclusive('\n')
            .map(|line| self.pattern.replace(line, NoExpand(&self.replacement)))
            .collect()
    }

    /// Argument vector rewriting `path` in place inside the deploy container
    pub fn sed_command(&self, path: &str) -> Vec<String> {
        vec![
            "sed".to_string(),
            "-i".to_string(),
            "-E".to_string(),
            format!("s#{}#{}#", HOST_SERVER_PATTERN, self.replacement),
            path.to_string(),
        ]
    }
}
