//! Handlers behind each route
//!
//! Every handler decodes its body, talks to the bay and wrappers, and returns
//! the [`Reply`] for the terminal response. Instance records are written here,
//! after the wrapper call succeeded; wrappers never touch the registry.

pub mod chain;
pub mod cloud_service;
pub mod function;
pub mod management;
pub mod monitoring;
pub mod service;
pub mod wan;

use crate::error::CallResult;
use crate::processor::{ProcessorContext, Reply};
use crate::routing::{FunctionVerb, Route, ServiceVerb, WanVerb};
use types::ServicePlatformMessage;

pub async fn handle(
    route: Route,
    message: &ServicePlatformMessage,
    ctx: &ProcessorContext,
) -> CallResult<Reply> {
    match route {
        Route::Management { kind, verb } => management::handle(kind, verb, message, ctx).await,
        Route::Function(FunctionVerb::Deploy) => function::deploy(message, ctx).await,
        Route::Function(FunctionVerb::Scale) => function::scale(message, ctx).await,
        Route::CloudServiceDeploy => cloud_service::deploy(message, ctx).await,
        Route::Service(ServiceVerb::Deploy) => service::deploy(message, ctx).await,
        Route::Service(ServiceVerb::Prepare) => service::prepare(message, ctx).await,
        Route::Service(ServiceVerb::Remove) => service::remove(message, ctx).await,
        Route::Service(ServiceVerb::ChainConfigure) => chain::configure(message, ctx).await,
        Route::Service(ServiceVerb::ChainDeconfigure) => chain::deconfigure(message, ctx).await,
        Route::Wan(WanVerb::Configure) => wan::configure(message, ctx).await,
        Route::Wan(WanVerb::Deconfigure) => wan::deconfigure(message, ctx).await,
        Route::Monitoring => monitoring::handle(message),
    }
}
