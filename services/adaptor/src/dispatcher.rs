//! Inbound dispatcher
//!
//! ```text
//! inbound ──▶ reply_to? ──no──▶ PendingCalls::complete (plugin handshake) or drop
//!                │
//!               yes
//!                ▼
//!          Route::parse ──none──▶ warn + drop
//!                │
//!                ▼
//!        worker permit ──▶ spawn CallProcessor ──▶ one terminal response
//! ```
//!
//! Only requests (messages with a reply-to) are routed. Responses, including
//! the adaptor's own traffic echoed back by the bus, never start a processor,
//! so a response can never trigger another response.

use crate::correlation::PendingCalls;
use crate::error::CallError;
use crate::processor::{CallProcessor, ProcessorContext, ProcessorState, Reply};
use crate::routing::Route;
use adaptor_config::protocol::INFRASTRUCTURE_ROOT;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use types::ServicePlatformMessage;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    context: ProcessorContext,
    pending: Arc<PendingCalls>,
    workers: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(context: ProcessorContext, pending: Arc<PendingCalls>, max_workers: usize) -> Self {
        Self {
            context,
            pending,
            workers: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Free worker slots
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Route one inbound message. Returns the handle of the spawned processor.
    pub async fn dispatch(&self, message: ServicePlatformMessage) -> Option<JoinHandle<ProcessorState>> {
        if message.reply_to().is_none() {
            let sid = message.sid().to_string();
            if self.pending.complete(message) {
                debug!(%sid, "Delivered reply to pending request");
            } else {
                trace!(%sid, "Ignoring response without a waiter");
            }
            return None;
        }

        let Some(route) = Route::parse(message.topic()) else {
            if message.topic().starts_with(INFRASTRUCTURE_ROOT) {
                warn!(topic = message.topic(), sid = message.sid(), "No route for topic, message dropped");
            } else {
                // e.g. our own plugin requests echoed back by the bus
                debug!(topic = message.topic(), sid = message.sid(), "Foreign topic dropped");
            }
            return None;
        };

        let permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(sid = message.sid(), "Worker pool closed, message dropped");
                return None;
            }
        };

        let context = self.context.clone();
        Some(tokio::spawn(async move {
            let _permit = permit;
            let request = message.clone();
            let sink = Arc::clone(&context.sink);

            match tokio::spawn(CallProcessor::new(route, message, context).process()).await {
                Ok(state) => state,
                Err(e) => {
                    // The processor died before answering; answer for it
                    error!(sid = request.sid(), %route, error = %e, "Call processor panicked");
                    let reply = Reply::failure(&CallError::Validation(format!(
                        "internal error while processing {route}"
                    )));
                    if let Err(e) = sink.send(request.respond(reply.content_type, reply.body)).await {
                        error!(sid = request.sid(), error = %e, "Failure response could not be sent");
                    }
                    ProcessorState::Failed
                }
            }
        }))
    }

    /// Dispatch until the inbound channel closes
    pub async fn run(self, mut inbound: mpsc::Receiver<ServicePlatformMessage>) {
        info!(workers = self.available_workers(), "Dispatcher started");
        while let Some(message) = inbound.recv().await {
            self.dispatch(message).await;
        }
        info!("Inbound channel closed, dispatcher stopped");
    }
}
