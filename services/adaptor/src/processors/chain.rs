//! `infrastructure.service.chain.{configure,deconfigure}`

use crate::decomposer;
use crate::error::CallResult;
use crate::processor::{ProcessorContext, Reply};
use tracing::{info, warn};
use types::{ApiResponse, NetworkConfigurePayload, NetworkDeconfigurePayload, ServicePlatformMessage};

pub async fn configure(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: NetworkConfigurePayload = message.decode()?;
    info!(instance = %payload.service_instance_id, "Configuring service chain");

    let requests = decomposer::decompose(&payload, ctx.bay.as_ref()).await?;
    decomposer::dispatch(&requests, ctx).await?;

    info!(
        instance = %payload.service_instance_id,
        backends = requests.len(),
        "Service chain configured"
    );
    Reply::api(ApiResponse::completed())
}

/// Deconfigure on the network VIM of every compute VIM hosting the service
pub async fn deconfigure(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: NetworkDeconfigurePayload = message.decode()?;
    let instance = payload.service_instance_id.as_str();

    let mut networks = Vec::new();
    for compute in ctx.bay.compute_vims_for_instance(instance).await? {
        match ctx.bay.resolve_network_for_compute(&compute).await? {
            Some(network) if !networks.contains(&network) => networks.push(network),
            Some(_) => {}
            None => warn!(instance, %compute, "Compute VIM has no network VIM, skipping"),
        }
    }

    for uuid in &networks {
        let network = ctx.bay.get_network(uuid).await?;
        ctx.bounded("deconfigure", network.deconfigure(instance))
            .await?;
    }
    info!(instance, backends = networks.len(), "Service chain deconfigured");
    Reply::api(ApiResponse::completed())
}
