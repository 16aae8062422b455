//! Service Platform message envelope
//!
//! Every interaction with the adaptor, inbound call or outbound response, is a
//! [`ServicePlatformMessage`]. The envelope is immutable once built; responses
//! are derived from the request they answer so the correlation id and reply
//! topic can never drift apart.

use crate::error::CodecError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// MIME type of a message body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    Yaml,
    Other(String),
}

impl ContentType {
    pub const JSON_MIME: &'static str = "application/json";
    pub const YAML_MIME: &'static str = "application/x-yaml";

    /// Parse a MIME string, tolerating parameters such as `; charset=utf-8`
    pub fn from_mime(mime: &str) -> Self {
        let base = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match base.as_str() {
            "application/json" | "text/json" => Self::Json,
            "application/x-yaml" | "application/yaml" | "text/yaml" | "text/x-yaml" => Self::Yaml,
            _ => Self::Other(mime.to_string()),
        }
    }

    pub fn as_mime(&self) -> &str {
        match self {
            Self::Json => Self::JSON_MIME,
            Self::Yaml => Self::YAML_MIME,
            Self::Other(mime) => mime,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// Envelope exchanged with the service platform bus
#[derive(Debug, Clone, PartialEq)]
pub struct ServicePlatformMessage {
    topic: String,
    sid: String,
    reply_to: Option<String>,
    content_type: ContentType,
    body: Bytes,
}

impl ServicePlatformMessage {
    pub fn new(
        topic: impl Into<String>,
        sid: impl Into<String>,
        reply_to: Option<String>,
        content_type: ContentType,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            sid: sid.into(),
            reply_to,
            content_type,
            body: body.into(),
        }
    }

    /// Build a message whose body is the JSON encoding of `value`
    pub fn json<T: Serialize>(
        topic: impl Into<String>,
        sid: impl Into<String>,
        reply_to: Option<String>,
        value: &T,
    ) -> Result<Self, CodecError> {
        let body = encode_body(&ContentType::Json, value)?;
        Ok(Self::new(topic, sid, reply_to, ContentType::Json, body))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Correlation (session) id
    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text, lossy for diagnostics
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body according to the declared content type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        decode_body(&self.content_type, &self.body)
    }

    /// Topic on which the answer to this message is published.
    ///
    /// Calls without an explicit reply-to are answered on their own topic.
    pub fn response_topic(&self) -> &str {
        self.reply_to.as_deref().unwrap_or(&self.topic)
    }

    /// Build a raw response carrying this message's correlation id
    pub fn respond(&self, content_type: ContentType, body: impl Into<Bytes>) -> Self {
        Self::new(self.response_topic(), self.sid.clone(), None, content_type, body)
    }

    /// Build a response whose body is `value` encoded as `content_type`
    pub fn respond_with<T: Serialize>(
        &self,
        content_type: ContentType,
        value: &T,
    ) -> Result<Self, CodecError> {
        let body = encode_body(&content_type, value)?;
        Ok(self.respond(content_type, body))
    }
}

impl fmt::Display for ServicePlatformMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] sid={} reply_to={} ({}, {}B)",
            self.topic,
            self.sid,
            self.reply_to.as_deref().unwrap_or("-"),
            self.content_type,
            self.body.len()
        )
    }
}

/// Fresh correlation id for self-initiated requests
pub fn new_sid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Decode a body by content type. Unknown fields are ignored.
pub fn decode_body<T: DeserializeOwned>(
    content_type: &ContentType,
    body: &[u8],
) -> Result<T, CodecError> {
    match content_type {
        ContentType::Json => Ok(serde_json::from_slice(body)?),
        ContentType::Yaml => Ok(serde_yaml::from_slice(body)?),
        // YAML is a JSON superset, which makes it the lenient choice for unlabeled bodies
        ContentType::Other(_) => Ok(serde_yaml::from_slice(body)?),
    }
}

/// Encode a value as `content_type`
pub fn encode_body<T: Serialize>(content_type: &ContentType, value: &T) -> Result<Vec<u8>, CodecError> {
    match content_type {
        ContentType::Json => Ok(serde_json::to_vec(value)?),
        ContentType::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
        ContentType::Other(mime) => Err(CodecError::UnsupportedContentType(mime.clone())),
    }
}
