//! `infrastructure.function.{deploy,scale}`

use crate::error::{CallError, CallResult};
use crate::processor::{ProcessorContext, Reply};
use bay::PlacementRecord;
use tracing::info;
use types::{FunctionDeployPayload, FunctionScalePayload, RequestStatus, ServicePlatformMessage};

pub async fn deploy(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: FunctionDeployPayload = message.decode()?;
    let compute = ctx.bay.get_compute(&payload.vim_uuid).await?;
    info!(
        vim = %payload.vim_uuid,
        vnf = %payload.vnfd.name,
        service_instance = %payload.service_instance_id,
        "Deploying function"
    );

    let response = ctx
        .bounded("deploy_function", compute.deploy_function(&payload))
        .await?;

    if response.request_status == RequestStatus::Completed {
        // Decomposition looks functions up by the descriptor's instance uuid
        let instance_uuid = payload
            .vnfd
            .instance_uuid
            .clone()
            .or_else(|| response.vnfr.as_ref().map(|r| r.id.clone()))
            .ok_or_else(|| CallError::validation("deployed function has no instance uuid"))?;

        ctx.bay
            .put_function_instance(PlacementRecord {
                instance_uuid,
                service_instance_uuid: payload.service_instance_id.clone(),
                vim_uuid: payload.vim_uuid.clone(),
            })
            .await?;
    }
    Reply::json(&response)
}

pub async fn scale(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: FunctionScalePayload = message.decode()?;

    let vim_uuid = match &payload.vim_uuid {
        Some(vim) => vim.clone(),
        None => ctx
            .bay
            .function_instance(&payload.function_instance_id)
            .await?
            .map(|record| record.vim_uuid)
            .ok_or_else(|| {
                CallError::addressing(format!(
                    "no VIM hosts function instance {}",
                    payload.function_instance_id
                ))
            })?,
    };

    let compute = ctx.bay.get_compute(&vim_uuid).await?;
    let response = ctx
        .bounded("scale_function", compute.scale_function(&payload))
        .await?;
    Reply::api(response)
}
