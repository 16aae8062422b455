//! Call Error Types
//!
//! Every failure a call processor can meet is a [`CallError`]. The processor
//! turns it into the `ERROR` terminal response; nothing propagates past it.

use bay::BayError;
use thiserror::Error;
use types::{CodecError, ModelError};
use wrappers::WrapperError;

#[derive(Debug, Error)]
pub enum CallError {
    /// A referenced wrapper, record or topic target does not exist
    #[error("{0}")]
    Addressing(String),

    /// Request content is malformed or inconsistent
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A backend refused, failed or did not answer
    #[error("Backend error: {0}")]
    Backend(#[source] WrapperError),

    /// Registry or repository failure
    #[error("Registry error: {0}")]
    Registry(#[source] BayError),

    #[error("Malformed body: {0}")]
    Codec(#[from] CodecError),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

pub type CallResult<T> = std::result::Result<T, CallError>;

impl CallError {
    pub fn addressing(message: impl Into<String>) -> Self {
        Self::Addressing(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short classification used in logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Addressing(_) => "addressing",
            Self::Validation(_) | Self::Codec(_) => "validation",
            Self::Backend(_) | Self::Timeout { .. } => "backend",
            Self::Registry(_) => "registry",
        }
    }
}

impl From<WrapperError> for CallError {
    fn from(err: WrapperError) -> Self {
        match err {
            WrapperError::Validation { message } => Self::Validation(message),
            WrapperError::Model(e) => Self::Validation(e.to_string()),
            WrapperError::Codec(e) => Self::Codec(e),
            other => Self::Backend(other),
        }
    }
}

impl From<BayError> for CallError {
    fn from(err: BayError) -> Self {
        match err {
            BayError::NotFound(uuid) => Self::Addressing(format!("VIM not found: {uuid}")),
            BayError::Wrapper(e) => e.into(),
            BayError::Model(e) => Self::Validation(e.to_string()),
            other => Self::Registry(other),
        }
    }
}

impl From<ModelError> for CallError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_errors_are_classified() {
        let err: CallError = WrapperError::validation("bad cp").into();
        assert_eq!(err.category(), "validation");

        let err: CallError = WrapperError::backend("vim-1", "refused").into();
        assert_eq!(err.category(), "backend");

        let err: CallError = BayError::NotFound("vim-1".into()).into();
        assert_eq!(err.category(), "addressing");
        assert_eq!(err.to_string(), "VIM not found: vim-1");
    }
}
