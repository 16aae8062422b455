//! Error types for body encoding and model validation

use thiserror::Error;

/// Errors raised while encoding or decoding message bodies
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML codec error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Errors raised while interpreting typed payload fields
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Wrapper kind name not recognised
    #[error("Unknown wrapper kind: {0}")]
    UnknownKind(String),

    /// Vendor name not recognised for the given kind
    #[error("Unknown {kind} vendor: {vendor}")]
    UnknownVendor { kind: String, vendor: String },

    /// Required configuration key missing
    #[error("Missing configuration field: {0}")]
    MissingField(String),

    /// Field present but not parseable
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}
