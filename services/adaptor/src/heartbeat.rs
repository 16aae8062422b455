//! Periodic self-announcement to the plugin manager

use crate::lifecycle::PluginStatus;
use crate::mux::MessageSink;
use adaptor_config::protocol::plugin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use types::{new_sid, Heartbeat, ServicePlatformMessage};

#[derive(Debug)]
pub struct HeartbeatTask {
    sink: Arc<dyn MessageSink>,
    status: Arc<PluginStatus>,
    interval: Duration,
}

impl HeartbeatTask {
    pub fn new(sink: Arc<dyn MessageSink>, status: Arc<PluginStatus>, interval: Duration) -> Self {
        Self {
            sink,
            status,
            interval,
        }
    }

    /// Heartbeat for the current state, or `None` before registration
    pub fn beat(&self) -> Option<ServicePlatformMessage> {
        let uuid = self.status.uuid()?;
        let body = Heartbeat {
            uuid: uuid.clone(),
            state: self.status.state().to_string(),
        };
        match ServicePlatformMessage::json(plugin::heartbeat_topic(&uuid), new_sid(), None, &body) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Heartbeat could not be encoded");
                None
            }
        }
    }

    /// Beat every interval until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "Heartbeat started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.beat() {
                        Some(message) => {
                            if self.sink.send(message).await.is_err() {
                                warn!("Outbound sink closed, heartbeat stopped");
                                break;
                            }
                        }
                        None => debug!("Not registered yet, heartbeat skipped"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Heartbeat stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::AdaptorState;
    use crate::mux::Mux;

    #[tokio::test(start_paused = true)]
    async fn test_beats_after_registration() {
        let (mux, mut rx) = Mux::channel(8);
        let status = Arc::new(PluginStatus::new());
        let task = HeartbeatTask::new(Arc::new(mux), Arc::clone(&status), Duration::from_secs(1));
        assert!(task.beat().is_none());

        status.set_uuid("plugin-1");
        status.set_state(AdaptorState::Running);

        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(task.run(shutdown));

        let message = rx.recv().await.unwrap();
        assert_eq!(message.topic(), "platform.management.plugin.plugin-1.heartbeat");
        let body: Heartbeat = message.decode().unwrap();
        assert_eq!(body.state, "RUNNING");
        assert!(message.reply_to().is_none());

        stop.send(true).unwrap();
        handle.await.unwrap();
    }
}
