//! Outstanding self-initiated requests, keyed by correlation id
//!
//! The adaptor is itself a client of the plugin manager. A request registers
//! its sid here before it is published; the dispatcher hands any inbound
//! response carrying that sid back to the waiting caller.

use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;
use types::ServicePlatformMessage;

#[derive(Debug, Default)]
pub struct PendingCalls {
    waiting: DashMap<String, oneshot::Sender<ServicePlatformMessage>>,
}

/// Receiving side of one outstanding request
#[derive(Debug)]
pub struct PendingReply {
    sid: String,
    rx: oneshot::Receiver<ServicePlatformMessage>,
}

impl PendingReply {
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Wait for the reply. `None` on timeout or when the call was abandoned.
    pub async fn wait(self, timeout: Duration) -> Option<ServicePlatformMessage> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(message)) => Some(message),
            _ => None,
        }
    }
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, sid: impl Into<String>) -> PendingReply {
        let sid = sid.into();
        let (tx, rx) = oneshot::channel();
        self.waiting.insert(sid.clone(), tx);
        PendingReply { sid, rx }
    }

    pub fn is_pending(&self, sid: &str) -> bool {
        self.waiting.contains_key(sid)
    }

    /// Deliver `message` to its waiter. Returns false when nobody waits for it.
    pub fn complete(&self, message: ServicePlatformMessage) -> bool {
        match self.waiting.remove(message.sid()) {
            Some((sid, tx)) => {
                debug!(%sid, topic = message.topic(), "Matched pending reply");
                // The waiter may have timed out already
                let _ = tx.send(message);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&self, sid: &str) {
        self.waiting.remove(sid);
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
