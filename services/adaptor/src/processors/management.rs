//! `infrastructure.management.<kind>.*`: VIM and WIM registration

use crate::error::{CallError, CallResult};
use crate::processor::{ProcessorContext, Reply};
use crate::routing::ManagementVerb;
use futures::future::join_all;
use tracing::{info, warn};
use types::{
    new_sid, AddVimRequest, ApiResponse, AttachVimRequest, RemoveVimRequest,
    ResourceAvailabilityPayload, ResourceUtilisation, ServicePlatformMessage, Vendor, VimResources,
    WrapperConfiguration, WrapperKind,
};

pub async fn handle(
    kind: WrapperKind,
    verb: ManagementVerb,
    message: &ServicePlatformMessage,
    ctx: &ProcessorContext,
) -> CallResult<Reply> {
    match verb {
        ManagementVerb::Add => add(kind, message, ctx).await,
        ManagementVerb::Remove => remove(kind, message, ctx).await,
        ManagementVerb::List => list(kind, ctx).await,
        ManagementVerb::ResourceAvailability => resource_availability(message, ctx).await,
        ManagementVerb::Attach => attach(message, ctx).await,
    }
}

/// Configuration for a freshly added wrapper. The uuid is always generated here.
fn configuration(kind: WrapperKind, request: AddVimRequest) -> CallResult<WrapperConfiguration> {
    let vendor = Vendor::parse(kind, &request.vim_type)?;
    let configuration = match request.configuration {
        serde_json::Value::Null => serde_json::json!({}),
        value => value,
    };
    Ok(WrapperConfiguration {
        uuid: new_sid(),
        kind,
        vendor,
        endpoint: request.vim_address,
        auth_user: request.username.unwrap_or_default(),
        auth_secret: request.pass,
        configuration,
        name: request.name,
        city: request.city,
        country: request.country,
        domain: request.domain.unwrap_or_default(),
    })
}

async fn add(kind: WrapperKind, message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    if kind == WrapperKind::Storage {
        return Err(CallError::validation("storage VIMs are not supported"));
    }
    let request: AddVimRequest = message.decode()?;
    let config = configuration(kind, request)?;
    info!(uuid = %config.uuid, %kind, vendor = %config.vendor, endpoint = %config.endpoint, "Adding wrapper");

    let response = match kind {
        WrapperKind::Network => {
            let compute_uuid = config.compute_uuid()?.to_string();
            ctx.bay.register_network(config, &compute_uuid).await
        }
        WrapperKind::Wim => ctx.bay.register_wim(config).await,
        _ => ctx.bay.register_compute(config).await,
    };
    Reply::api(response)
}

async fn remove(kind: WrapperKind, message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let request: RemoveVimRequest = message.decode()?;

    if let Some(existing) = ctx.bay.get_configuration(&request.uuid).await? {
        if existing.kind != kind {
            return Err(CallError::validation(format!(
                "{} is a {} wrapper, not {kind}",
                request.uuid, existing.kind
            )));
        }
    }
    ctx.bay.remove(&request.uuid).await?;
    Reply::api(ApiResponse::completed())
}

fn resources(config: &WrapperConfiguration, usage: ResourceUtilisation) -> VimResources {
    VimResources {
        vim_uuid: config.uuid.clone(),
        vim_name: config.name.clone(),
        vim_city: config.city.clone(),
        vim_domain: config.domain.clone(),
        vim_endpoint: config.endpoint.clone(),
        vim_type: config.vendor.as_str().to_string(),
        core_total: usage.tot_cores,
        core_used: usage.used_cores,
        memory_total: usage.tot_memory,
        memory_used: usage.used_memory,
    }
}

async fn query_usage(vim_uuid: &str, ctx: &ProcessorContext) -> CallResult<ResourceUtilisation> {
    let compute = ctx.bay.get_compute(vim_uuid).await?;
    ctx.bounded("resource_utilisation", compute.resource_utilisation())
        .await
}

/// Usage of one compute VIM; any failure reads as unknown
async fn usage_of(config: &WrapperConfiguration, ctx: &ProcessorContext) -> ResourceUtilisation {
    query_usage(&config.uuid, ctx).await.unwrap_or_else(|e| {
        warn!(vim = %config.uuid, error = %e, "Resource utilisation unavailable");
        ResourceUtilisation::UNKNOWN
    })
}

async fn list(kind: WrapperKind, ctx: &ProcessorContext) -> CallResult<Reply> {
    let configs = ctx.bay.list(kind).await?;

    let entries: Vec<VimResources> = if kind == WrapperKind::Compute {
        join_all(configs.iter().map(|config| async move {
            resources(config, usage_of(config, ctx).await)
        }))
        .await
    } else {
        configs
            .iter()
            .map(|config| resources(config, ResourceUtilisation::UNKNOWN))
            .collect()
    };
    Reply::yaml(&entries)
}

async fn resource_availability(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: ResourceAvailabilityPayload = message.decode()?;
    let compute = ctx.bay.get_compute(&payload.vim_uuid).await?;
    let usage = ctx
        .bounded("resource_utilisation", compute.resource_utilisation())
        .await?;

    let request = payload.resource_request;
    let response = if usage.can_host(request.cpu, request.memory) {
        ApiResponse::completed()
    } else {
        ApiResponse::error(format!(
            "VIM {} cannot host {} cores / {} memory",
            payload.vim_uuid, request.cpu, request.memory
        ))
    };
    Reply::api(response)
}

async fn attach(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let request: AttachVimRequest = message.decode()?;
    ctx.bay
        .attach_vim(&request.wim_uuid, &request.vim_uuid, &request.vim_address)
        .await?;
    Reply::api(ApiResponse::completed())
}
