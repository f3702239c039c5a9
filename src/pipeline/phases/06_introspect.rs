use crate::cluster::exposed_ports;
use crate::context::BuildContext;
use crate::pipeline::context::{PipelineContext, RunState};
use crate::pipeline::phase_trait::StagePhase;
use crate::pipeline::stage::{Stage, StageError};
use crate::progress::ProgressEvent;
use async_trait::async_trait;

/// Reports where the ingress is reachable from the host
pub struct IntrospectPhase;

#[async_trait]
impl StagePhase for IntrospectPhase {
    fn stage(&self) -> Stage {
        Stage::Introspect
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        build: &BuildContext,
        state: &mut RunState,
    ) -> Result<(), StageError> {
        let handle = state
            .cluster
            .clone()
            .unwrap_or_else(|| ctx.cluster_handle(build));
        let ports = exposed_ports(ctx.runtime.as_ref(), &handle).await?;

        ctx.emit(ProgressEvent::PortsDiscovered {
            http_url: ports.http_url(),
            https_url: ports.https_url(),
        });
        state.ports = Some(ports);
        Ok(())
    }
}
