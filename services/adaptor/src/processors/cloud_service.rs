//! `infrastructure.cloud_service.deploy`

use crate::error::CallResult;
use crate::processor::{ProcessorContext, Reply};
use bay::PlacementRecord;
use tracing::info;
use types::{CloudServiceDeployPayload, RequestStatus, ServicePlatformMessage};

pub async fn deploy(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: CloudServiceDeployPayload = message.decode()?;
    let compute = ctx.bay.get_compute(&payload.vim_uuid).await?;
    info!(
        vim = %payload.vim_uuid,
        csd = %payload.csd.name,
        service_instance = %payload.service_instance_id,
        "Deploying cloud service"
    );

    let response = ctx
        .bounded("deploy_cloud_service", compute.deploy_cloud_service(&payload))
        .await?;

    if response.request_status == RequestStatus::Completed {
        ctx.bay
            .put_cloud_service_instance(PlacementRecord {
                instance_uuid: payload.csd.instance_uuid.clone(),
                service_instance_uuid: payload.service_instance_id.clone(),
                vim_uuid: payload.vim_uuid.clone(),
            })
            .await?;
    }
    Reply::json(&response)
}
