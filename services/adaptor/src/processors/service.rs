//! `infrastructure.service.{deploy,prepare,remove}`

use crate::error::{CallError, CallResult};
use crate::processor::{ProcessorContext, Reply};
use bay::{BayError, PlacementRecord, ServiceInstanceRecord};
use futures::future::join_all;
use tracing::{debug, info, warn};
use types::{
    ApiResponse, RequestStatus, ServiceDeployPayload, ServicePlatformMessage,
    ServicePreparePayload, ServiceRemovePayload, VimPreDeploymentList,
};

/// Whole-service deployment on one compute VIM
pub async fn deploy(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: ServiceDeployPayload = message.decode()?;
    let instance_uuid = payload
        .nsd
        .instance_uuid
        .clone()
        .ok_or_else(|| CallError::validation("nsd.instance_uuid is required"))?;
    let compute = ctx.bay.get_compute(&payload.vim_uuid).await?;
    info!(vim = %payload.vim_uuid, instance = %instance_uuid, functions = payload.vnfds.len(), "Deploying service");

    let response = ctx
        .bounded("deploy_service", compute.deploy_service(&payload))
        .await?;

    if response.request_status == RequestStatus::Completed {
        let stack = response
            .instance_vim_uuid
            .clone()
            .unwrap_or_else(|| instance_uuid.clone());
        ctx.bay
            .put_service_instance(ServiceInstanceRecord {
                instance_uuid: instance_uuid.clone(),
                vim_uuid: payload.vim_uuid.clone(),
                vim_instance_id: stack.clone(),
                vim_instance_name: response.instance_name.clone().unwrap_or(stack),
            })
            .await?;
        for vnfr in &response.vnfrs {
            ctx.bay
                .put_function_instance(PlacementRecord {
                    instance_uuid: vnfr.id.clone(),
                    service_instance_uuid: instance_uuid.clone(),
                    vim_uuid: payload.vim_uuid.clone(),
                })
                .await?;
        }
    }
    Reply::json(&response)
}

async fn prepare_vim(instance_id: &str, vim: &VimPreDeploymentList, ctx: &ProcessorContext) -> CallResult<()> {
    let compute = ctx.bay.get_compute(&vim.uuid).await?;

    if ctx.bay.service_instance(instance_id, &vim.uuid).await?.is_none() {
        let prepared = ctx
            .bounded("prepare_service", compute.prepare_service(instance_id))
            .await?;
        ctx.bay
            .put_service_instance(ServiceInstanceRecord {
                instance_uuid: instance_id.to_string(),
                vim_uuid: vim.uuid.clone(),
                vim_instance_id: prepared.vim_instance_id,
                vim_instance_name: prepared.vim_instance_name,
            })
            .await?;
    } else {
        debug!(instance_id, vim = %vim.uuid, "Service environment already prepared");
    }

    for image in &vim.images {
        let stored = ctx
            .bounded("is_image_stored", compute.is_image_stored(image))
            .await?;
        if !stored {
            info!(vim = %vim.uuid, image = %image.image_uuid, "Uploading image");
            ctx.bounded("upload_image", compute.upload_image(image))
                .await?;
        }
    }
    Ok(())
}

/// Create the service environment and stage images on every listed VIM
pub async fn prepare(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: ServicePreparePayload = message.decode()?;

    for vim in &payload.vim_list {
        // Unknown VIMs are an answer, not a failure of the call
        match ctx.bay.get_compute(&vim.uuid).await {
            Err(BayError::NotFound(uuid)) => {
                warn!(instance = %payload.instance_id, vim = %uuid, "Prepare on unknown VIM");
                return Reply::api(ApiResponse::error("VIM not found"));
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }
        prepare_vim(&payload.instance_id, vim, ctx).await?;
    }
    Reply::api(ApiResponse::completed())
}

async fn remove_on(vim_uuid: &str, instance_uuid: &str, ctx: &ProcessorContext) -> CallResult<()> {
    let compute = ctx.bay.get_compute(vim_uuid).await?;
    ctx.bounded("remove_service", compute.remove_service(instance_uuid))
        .await
}

/// Tear the service down on every VIM hosting part of it
pub async fn remove(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: ServiceRemovePayload = message.decode()?;
    let vims = ctx.bay.compute_vims_for_instance(&payload.instance_uuid).await?;
    if vims.is_empty() {
        return Reply::api(ApiResponse::warning(
            "can't find instance UUID or associated VIMs in Infrastructure repository",
        ));
    }

    let instance = payload.instance_uuid.as_str();
    let outcomes = join_all(vims.iter().map(|vim| remove_on(vim, instance, ctx))).await;

    let failures: Vec<String> = vims
        .iter()
        .zip(outcomes)
        .filter_map(|(vim, outcome)| outcome.err().map(|e| format!("{vim}: {e}")))
        .collect();
    if !failures.is_empty() {
        // Records stay so the removal can be retried
        return Reply::api(ApiResponse::error(failures.join("; ")));
    }

    ctx.bay.remove_service_instance(instance).await?;
    info!(instance, vims = vims.len(), "Service removed");
    Reply::api(ApiResponse::completed())
}
