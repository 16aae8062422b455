//! `infrastructure.monitoring.*`
//!
//! Monitoring topics are routed so callers get an answer, but no monitoring
//! backend is driven from here.

use crate::error::CallResult;
use crate::processor::Reply;
use tracing::debug;
use types::{ApiResponse, ServicePlatformMessage};

pub fn handle(message: &ServicePlatformMessage) -> CallResult<Reply> {
    debug!(topic = message.topic(), sid = message.sid(), "Monitoring call acknowledged");
    Reply::api(ApiResponse::warning(
        "monitoring calls are not handled by this adaptor",
    ))
}
