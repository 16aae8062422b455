//! Call processor
//!
//! One processor per routed inbound message. It runs once, through
//!
//! ```text
//! Created ──process()──▶ Running ──┬──▶ Succeeded
//!                                  └──▶ Failed
//! ```
//!
//! and always leaves exactly one terminal response on the request's
//! correlation id. Handlers return a [`Reply`] or a [`CallError`]; errors are
//! rendered as `{request_status: ERROR, message}` here, so no failure escapes.

use crate::error::{CallError, CallResult};
use crate::mux::MessageSink;
use crate::processors;
use crate::routing::Route;
use adaptor_config::AdaptorConfig;
use bay::WrapperBay;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use types::{encode_body, ApiResponse, ContentType, ServicePlatformMessage};

/// Shared handles and settings every processor runs against
#[derive(Debug, Clone)]
pub struct ProcessorContext {
    pub bay: Arc<WrapperBay>,
    pub sink: Arc<dyn MessageSink>,
    pub call_timeout: Duration,
    pub compensate_on_failure: bool,
}

impl ProcessorContext {
    pub fn new(bay: Arc<WrapperBay>, sink: Arc<dyn MessageSink>, config: &AdaptorConfig) -> Self {
        Self {
            bay,
            sink,
            call_timeout: config.adaptor.call_timeout(),
            compensate_on_failure: config.chain.compensate_on_failure,
        }
    }

    /// Await a backend call bounded by the call timeout
    pub async fn bounded<T, E, F>(&self, operation: &str, call: F) -> CallResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<CallError>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(CallError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }
}

/// Encoded body of a terminal response
#[derive(Debug, Clone)]
pub struct Reply {
    pub content_type: ContentType,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json<T: Serialize>(value: &T) -> CallResult<Self> {
        Ok(Self {
            content_type: ContentType::Json,
            body: encode_body(&ContentType::Json, value)?,
        })
    }

    pub fn yaml<T: Serialize>(value: &T) -> CallResult<Self> {
        Ok(Self {
            content_type: ContentType::Yaml,
            body: encode_body(&ContentType::Yaml, value)?,
        })
    }

    pub fn api(response: ApiResponse) -> CallResult<Self> {
        Self::json(&response)
    }

    /// Rendering of a failed call. Falls back to a literal body so a failure
    /// response can always be produced.
    pub fn failure(err: &CallError) -> Self {
        let body = encode_body(&ContentType::Json, &ApiResponse::error(err.to_string()))
            .unwrap_or_else(|_| br#"{"request_status":"ERROR"}"#.to_vec());
        Self {
            content_type: ContentType::Json,
            body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Created,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub struct CallProcessor {
    route: Route,
    message: ServicePlatformMessage,
    context: ProcessorContext,
    state: ProcessorState,
}

impl CallProcessor {
    pub fn new(route: Route, message: ServicePlatformMessage, context: ProcessorContext) -> Self {
        Self {
            route,
            message,
            context,
            state: ProcessorState::Created,
        }
    }

    pub fn sid(&self) -> &str {
        self.message.sid()
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Run the call and publish its terminal response. Consumes the processor
    /// so it cannot run twice.
    pub async fn process(mut self) -> ProcessorState {
        self.state = ProcessorState::Running;
        let started = Instant::now();
        debug!(sid = self.sid(), route = %self.route, "Processing call");

        let (reply, state) =
            match processors::handle(self.route, &self.message, &self.context).await {
                Ok(reply) => (reply, ProcessorState::Succeeded),
                Err(err) => {
                    warn!(
                        sid = self.sid(),
                        route = %self.route,
                        category = err.category(),
                        error = %err,
                        "Call failed"
                    );
                    (Reply::failure(&err), ProcessorState::Failed)
                }
            };

        let response = self.message.respond(reply.content_type, reply.body);
        if let Err(e) = self.context.sink.send(response).await {
            error!(sid = self.sid(), route = %self.route, error = %e, "Terminal response could not be sent");
        }

        self.state = state;
        info!(
            sid = self.sid(),
            route = %self.route,
            state = ?self.state,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Call finished"
        );
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::Mux;
    use bay::MemoryRepository;
    use wrappers::WrapperFactory;

    fn context(sink: Arc<dyn MessageSink>) -> ProcessorContext {
        let bay = WrapperBay::new(Arc::new(MemoryRepository::new()), WrapperFactory::default());
        ProcessorContext {
            bay: Arc::new(bay),
            sink,
            call_timeout: Duration::from_millis(50),
            compensate_on_failure: false,
        }
    }

    #[tokio::test]
    async fn test_parse_failure_yields_single_error_response() {
        let (mux, mut rx) = Mux::channel(4);
        let request = ServicePlatformMessage::new(
            "infrastructure.management.compute.remove",
            "sid-7",
            Some("infrastructure.management.compute.remove".into()),
            ContentType::Json,
            "not json",
        );
        let route = Route::parse(request.topic()).unwrap();
        let processor = CallProcessor::new(route, request, context(Arc::new(mux)));
        assert_eq!(processor.state(), ProcessorState::Created);

        assert_eq!(processor.process().await, ProcessorState::Failed);

        let response = rx.recv().await.unwrap();
        assert_eq!(response.sid(), "sid-7");
        assert!(response.reply_to().is_none());
        let body: ApiResponse = response.decode().unwrap();
        assert!(!body.is_completed());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_call_times_out() {
        let (mux, _rx) = Mux::channel(1);
        let ctx = context(Arc::new(mux));
        let err = ctx
            .bounded("slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, CallError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Timeout { timeout_ms: 50, .. }));
    }
}
