//! Local cluster management
//!
//! - [`lifecycle`]: probe/create a k3d cluster, merge its kubeconfig, import images
//! - [`introspect`]: read the host ports published by the cluster load balancer

pub mod introspect;
pub mod lifecycle;

pub use introspect::exposed_ports;
pub use lifecycle::{ClusterError, ClusterManager, ClusterReady, K3dCli};
