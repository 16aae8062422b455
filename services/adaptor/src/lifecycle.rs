//! Adaptor core: lifecycle and wiring
//!
//! ```text
//!   READY ──start()──▶ register ──▶ RUNNING ──stop()──▶ deregister ──▶ STOPPED
//!                          │                                │
//!                          └── refused / no answer: logged ─┘── refused: FAILED
//! ```
//!
//! The core owns the dispatcher task, the heartbeat task and the plugin
//! handshake. Inbound messages reach it through a channel fed by the bus
//! transport; everything outbound goes through the shared sink.

use crate::correlation::PendingCalls;
use crate::dispatcher::Dispatcher;
use crate::heartbeat::HeartbeatTask;
use crate::mux::{MessageSink, SinkError};
use crate::processor::ProcessorContext;
use adaptor_config::protocol::plugin;
use adaptor_config::AdaptorConfig;
use bay::WrapperBay;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use types::{new_sid, CodecError, PluginManagerReply, PluginRegistration, ServicePlatformMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptorState {
    Ready,
    Running,
    Failed,
    Stopped,
}

impl fmt::Display for AdaptorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        })
    }
}

/// State and plugin uuid, shared with the heartbeat
#[derive(Debug)]
pub struct PluginStatus {
    state: RwLock<AdaptorState>,
    uuid: RwLock<Option<String>>,
}

impl Default for PluginStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginStatus {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AdaptorState::Ready),
            uuid: RwLock::new(None),
        }
    }

    pub fn state(&self) -> AdaptorState {
        *self.state.read()
    }

    pub fn set_state(&self, state: AdaptorState) {
        *self.state.write() = state;
    }

    /// Uuid assigned by the plugin manager
    pub fn uuid(&self) -> Option<String> {
        self.uuid.read().clone()
    }

    pub fn set_uuid(&self, uuid: impl Into<String>) {
        *self.uuid.write() = Some(uuid.into());
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Plugin manager did not answer {0} in time")]
    NoAnswer(&'static str),

    #[error("Plugin manager refused {operation}: {reason}")]
    Refused {
        operation: &'static str,
        reason: String,
    },

    #[error("Outbound sink unavailable: {0}")]
    Sink(#[from] SinkError),

    #[error("Plugin manager message codec error: {0}")]
    Codec(#[from] CodecError),
}

#[derive(Debug)]
pub struct AdaptorCore {
    config: AdaptorConfig,
    context: ProcessorContext,
    pending: Arc<PendingCalls>,
    status: Arc<PluginStatus>,
    shutdown: watch::Sender<bool>,
    dispatcher_task: Option<JoinHandle<()>>,
    heartbeat_task: Option<JoinHandle<()>>,
}

impl AdaptorCore {
    pub fn new(config: AdaptorConfig, bay: Arc<WrapperBay>, sink: Arc<dyn MessageSink>) -> Self {
        let context = ProcessorContext::new(bay, sink, &config);
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            context,
            pending: Arc::new(PendingCalls::new()),
            status: Arc::new(PluginStatus::new()),
            shutdown,
            dispatcher_task: None,
            heartbeat_task: None,
        }
    }

    pub fn status(&self) -> &Arc<PluginStatus> {
        &self.status
    }

    pub fn bay(&self) -> &Arc<WrapperBay> {
        &self.context.bay
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.context.clone(),
            Arc::clone(&self.pending),
            self.config.adaptor.max_workers,
        )
    }

    /// Start dispatching `inbound`, register with the plugin manager and start
    /// the heartbeat. A failed handshake is logged and the adaptor keeps
    /// serving calls.
    pub async fn start(&mut self, inbound: mpsc::Receiver<ServicePlatformMessage>) -> Result<(), CoreError> {
        self.dispatcher_task = Some(tokio::spawn(self.dispatcher().run(inbound)));

        match self.register().await {
            Ok(uuid) => info!(%uuid, "Registered with the plugin manager"),
            Err(CoreError::Sink(e)) => return Err(CoreError::Sink(e)),
            Err(e) => error!(error = %e, "Plugin registration failed"),
        }
        self.status.set_state(AdaptorState::Running);

        if self.config.heartbeat.enabled {
            let task = HeartbeatTask::new(
                Arc::clone(&self.context.sink),
                Arc::clone(&self.status),
                self.config.heartbeat.interval(),
            );
            self.heartbeat_task = Some(tokio::spawn(task.run(self.shutdown.subscribe())));
        }
        info!(name = %self.config.adaptor.name, "Adaptor running");
        Ok(())
    }

    /// Send a plugin-manager request and wait for its reply
    async fn request<T: Serialize>(
        &self,
        operation: &'static str,
        topic: &str,
        body: &T,
    ) -> Result<PluginManagerReply, CoreError> {
        let sid = new_sid();
        let message = ServicePlatformMessage::json(topic, sid.clone(), Some(topic.to_string()), body)?;
        let waiter = self.pending.expect(sid.clone());

        if let Err(e) = self.context.sink.send(message).await {
            self.pending.cancel(&sid);
            return Err(e.into());
        }

        let Some(reply) = waiter.wait(self.config.adaptor.registration_timeout()).await else {
            self.pending.cancel(&sid);
            return Err(CoreError::NoAnswer(operation));
        };

        let reply: PluginManagerReply = reply.decode()?;
        if !reply.is_ok() {
            return Err(CoreError::Refused {
                operation,
                reason: reply.error.unwrap_or(reply.status),
            });
        }
        Ok(reply)
    }

    /// Register and remember the assigned plugin uuid
    pub async fn register(&self) -> Result<String, CoreError> {
        let settings = &self.config.adaptor;
        let body = PluginRegistration {
            name: settings.name.clone(),
            version: settings.version.clone(),
            description: settings.description.clone(),
        };
        let reply = self.request("register", plugin::REGISTER, &body).await?;
        let uuid = reply.uuid.ok_or_else(|| CoreError::Refused {
            operation: "register",
            reason: "reply carries no uuid".to_string(),
        })?;
        self.status.set_uuid(uuid.clone());
        Ok(uuid)
    }

    /// Deregister. A no-op when registration never succeeded.
    pub async fn deregister(&self) -> Result<(), CoreError> {
        let Some(uuid) = self.status.uuid() else {
            return Ok(());
        };
        self.request("deregister", plugin::DEREGISTER, &serde_json::json!({ "uuid": uuid }))
            .await?;
        Ok(())
    }

    /// Deregister, stop the heartbeat and the dispatcher
    pub async fn stop(&mut self) {
        if let Err(e) = self.deregister().await {
            warn!(error = %e, "Deregistration failed");
            self.status.set_state(AdaptorState::Failed);
        }

        let _ = self.shutdown.send(true);
        if let Some(task) = self.heartbeat_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.dispatcher_task.take() {
            task.abort();
        }

        self.status.set_state(AdaptorState::Stopped);
        info!("Adaptor stopped");
    }
}
