//! Outbound message mux
//!
//! Every message the adaptor emits (responses, registration requests,
//! heartbeats) leaves through a [`MessageSink`]. The default sink is a bounded
//! channel drained by the bus bridge.

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use types::ServicePlatformMessage;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink closed")]
    Closed,
}

#[async_trait]
pub trait MessageSink: Send + Sync + Debug {
    async fn send(&self, message: ServicePlatformMessage) -> Result<(), SinkError>;
}

/// Channel-backed sink
#[derive(Debug, Clone)]
pub struct Mux {
    tx: mpsc::Sender<ServicePlatformMessage>,
}

impl Mux {
    /// Mux and the receiving end the transport drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServicePlatformMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl MessageSink for Mux {
    async fn send(&self, message: ServicePlatformMessage) -> Result<(), SinkError> {
        debug!(topic = message.topic(), sid = message.sid(), "Enqueuing outbound message");
        self.tx.send(message).await.map_err(|e| {
            warn!(topic = e.0.topic(), sid = e.0.sid(), "Outbound queue closed, message dropped");
            SinkError::Closed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ContentType;

    #[tokio::test]
    async fn test_messages_leave_in_order() {
        let (mux, mut rx) = Mux::channel(4);
        for sid in ["a", "b"] {
            mux.send(ServicePlatformMessage::new("t", sid, None, ContentType::Json, "{}"))
                .await
                .unwrap();
        }
        assert_eq!(rx.recv().await.unwrap().sid(), "a");
        assert_eq!(rx.recv().await.unwrap().sid(), "b");
    }

    #[tokio::test]
    async fn test_closed_receiver_is_an_error() {
        let (mux, rx) = Mux::channel(1);
        drop(rx);
        let err = mux
            .send(ServicePlatformMessage::new("t", "a", None, ContentType::Json, "{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Closed));
        assert!(mux.is_closed());
    }
}
