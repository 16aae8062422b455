//! Bus bridge
//!
//! Default transport between the adaptor and the service-platform broker: one
//! TCP connection carrying length-prefixed JSON envelopes in both directions.
//!
//! ```text
//!            ┌──────────── reader task ─────────────┐
//! broker ──▶ │ read_frame ─▶ BusEnvelope ─▶ message │ ──▶ inbound channel ──▶ Dispatcher
//!            └──────────────────────────────────────┘
//!            ┌──────────── writer task ─────────────┐
//! broker ◀── │ write_frame ◀─ BusEnvelope ◀─ message│ ◀── outbound channel ◀── Mux
//!            └──────────────────────────────────────┘
//! ```

use adaptor_config::protocol::bus::MAX_ENVELOPE_SIZE;
use adaptor_config::BusConfig;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use types::{ContentType, ServicePlatformMessage};
use wrappers::framing::{read_frame, write_frame};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Failed to connect to bus at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out connecting to bus at {0}")]
    ConnectTimeout(String),
}

/// Wire form of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEnvelope {
    pub topic: String,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub content_type: String,
    pub body: String,
}

impl From<&ServicePlatformMessage> for BusEnvelope {
    fn from(message: &ServicePlatformMessage) -> Self {
        Self {
            topic: message.topic().to_string(),
            correlation_id: message.sid().to_string(),
            reply_to: message.reply_to().map(str::to_string),
            content_type: message.content_type().as_mime().to_string(),
            body: message.body_text(),
        }
    }
}

impl From<BusEnvelope> for ServicePlatformMessage {
    fn from(envelope: BusEnvelope) -> Self {
        ServicePlatformMessage::new(
            envelope.topic,
            envelope.correlation_id,
            envelope.reply_to,
            ContentType::from_mime(&envelope.content_type),
            envelope.body,
        )
    }
}

/// Running bridge; dropping it leaves the tasks running until the connection closes
#[derive(Debug)]
pub struct BusBridge {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl BusBridge {
    /// Connect to the broker and start pumping
    pub async fn connect(
        config: &BusConfig,
        inbound: mpsc::Sender<ServicePlatformMessage>,
        outbound: mpsc::Receiver<ServicePlatformMessage>,
    ) -> Result<Self, BusError> {
        let address = config.address.clone();
        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&address))
            .await
            .map_err(|_| BusError::ConnectTimeout(address.clone()))?
            .map_err(|source| BusError::Connect {
                address: address.clone(),
                source,
            })?;
        let _ = stream.set_nodelay(true);
        info!(%address, "Connected to bus");
        Ok(Self::attach(stream, inbound, outbound))
    }

    /// Pump messages over an established stream
    pub fn attach<S>(
        stream: S,
        inbound: mpsc::Sender<ServicePlatformMessage>,
        outbound: mpsc::Receiver<ServicePlatformMessage>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: tokio::spawn(pump_inbound(read_half, inbound)),
            writer: tokio::spawn(pump_outbound(write_half, outbound)),
        }
    }

    /// Stop reading and let the writer flush what is queued
    pub async fn shutdown(self) {
        self.reader.abort();
        if let Err(e) = self.writer.await {
            if !e.is_cancelled() {
                error!(error = %e, "Bus writer task failed");
            }
        }
    }
}

async fn pump_inbound<R>(mut reader: R, inbound: mpsc::Sender<ServicePlatformMessage>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    loop {
        let frame = match read_frame(&mut reader, &mut buffer, MAX_ENVELOPE_SIZE).await {
            Ok(frame) => frame,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                info!("Bus connection closed by peer");
                break;
            }
            Err(e) => {
                error!(error = %e, "Bus read failed");
                break;
            }
        };

        let envelope: BusEnvelope = match serde_json::from_slice(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, bytes = frame.len(), "Undecodable envelope dropped");
                continue;
            }
        };
        debug!(topic = %envelope.topic, sid = %envelope.correlation_id, "Inbound message");
        if inbound.send(envelope.into()).await.is_err() {
            debug!("Inbound channel closed, bus reader stopped");
            break;
        }
    }
}

async fn pump_outbound<W>(mut writer: W, mut outbound: mpsc::Receiver<ServicePlatformMessage>)
where
    W: AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    while let Some(message) = outbound.recv().await {
        let envelope = BusEnvelope::from(&message);
        let data = match serde_json::to_vec(&envelope) {
            Ok(data) => data,
            Err(e) => {
                error!(topic = %envelope.topic, error = %e, "Envelope encoding failed");
                continue;
            }
        };
        if let Err(e) = write_frame(&mut writer, &mut buffer, &data).await {
            error!(topic = %envelope.topic, sid = %envelope.correlation_id, error = %e, "Bus write failed");
            break;
        }
    }
    debug!("Bus writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_cross_the_bridge() {
        let (adaptor_side, mut broker_side) = tokio::io::duplex(64 * 1024);
        let (inbound_tx, mut inbound_rx) = mpsc::channel(4);
        let (outbound_tx, outbound_rx) = mpsc::channel(4);
        let bridge = BusBridge::attach(adaptor_side, inbound_tx, outbound_rx);

        // broker -> adaptor
        let envelope = BusEnvelope {
            topic: "infrastructure.management.compute.list".into(),
            correlation_id: "sid-1".into(),
            reply_to: Some("infrastructure.management.compute.list".into()),
            content_type: "application/json".into(),
            body: "{}".into(),
        };
        let mut buffer = BytesMut::new();
        write_frame(&mut broker_side, &mut buffer, &serde_json::to_vec(&envelope).unwrap())
            .await
            .unwrap();
        let received = inbound_rx.recv().await.unwrap();
        assert_eq!(received.sid(), "sid-1");
        assert_eq!(received.content_type(), &ContentType::Json);

        // adaptor -> broker
        outbound_tx
            .send(received.respond(ContentType::Yaml, "[]\n"))
            .await
            .unwrap();
        let frame = read_frame(&mut broker_side, &mut buffer, MAX_ENVELOPE_SIZE)
            .await
            .unwrap();
        let answer: BusEnvelope = serde_json::from_slice(&frame).unwrap();
        assert_eq!(answer.topic, "infrastructure.management.compute.list");
        assert_eq!(answer.content_type, "application/x-yaml");
        assert!(answer.reply_to.is_none());

        drop(outbound_tx);
        bridge.shutdown().await;
    }
}
