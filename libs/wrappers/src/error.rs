//! Wrapper Error Types
//!
//! Every driver failure is a [`WrapperError`]. Call processors map these onto
//! `ERROR` responses; nothing here is allowed to panic the dispatcher.

use thiserror::Error;
use types::{CodecError, ModelError, Vendor};

/// Main wrapper error type
#[derive(Error, Debug)]
pub enum WrapperError {
    /// The driver does not implement this capability
    #[error("Operation '{operation}' not supported by {vendor} wrapper")]
    Unsupported {
        operation: &'static str,
        vendor: Vendor,
    },

    /// Backend replied with a failure
    #[error("Backend error ({backend}): {message}")]
    Backend {
        backend: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend did not answer in time
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Request content cannot be mapped onto the backend
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Connection or I/O failure
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Wrapper configuration not usable
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type alias for wrapper operations
pub type Result<T> = std::result::Result<T, WrapperError>;

impl WrapperError {
    pub fn unsupported(operation: &'static str, vendor: Vendor) -> Self {
        Self::Unsupported { operation, vendor }
    }

    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn backend_with_source(
        backend: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Whether the failure came from the backend side (reply, timeout, transport)
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. } | Self::Timeout { .. } | Self::Transport { .. }
        )
    }

    /// Map an HTTP client failure, keeping timeouts distinguishable
    pub fn http(operation: &str, timeout: std::time::Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout(operation, timeout.as_millis() as u64);
        }
        Self::transport_with_source(format!("{operation} failed"), err)
    }
}
