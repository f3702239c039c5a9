//! Cluster Introspector

use crate::context::{ClusterHandle, PortMap};
use crate::runtime::{ContainerRuntime, PortBindings, RuntimeError};
use tracing::debug;

/// Host ports published by the cluster's load-balancer container.
///
/// Read-only. Fails with [`RuntimeError::Unreachable`] when the daemon is
/// down and [`RuntimeError::NotFound`] when the container does not exist.
pub async fn exposed_ports(
    runtime: &dyn ContainerRuntime,
    handle: &ClusterHandle,
) -> Result<PortMap, RuntimeError> {
    let bindings = runtime
        .port_bindings(&handle.load_balancer_container)
        .await?;
    let ports = to_port_map(bindings);
    debug!(container = %handle.load_balancer_container, ports = ?ports, "Exposed ports");
    Ok(ports)
}

/// `"80/tcp" -> ["38080"]` becomes `"80" -> 38080`; unpublished ports are dropped
fn to_port_map(bindings: PortBindings) -> PortMap {
    let mut ports = PortMap::new();
    for (key, host_ports) in bindings {
        let container_port = key.split('/').next().unwrap_or(&key).to_string();
        if let Some(host_port) = host_ports.iter().find_map(|p| p.parse::<u16>().ok()) {
            ports.insert(container_port, host_port);
        }
    }
    ports
}
