//! Error types for the Sentry client.

use thiserror::Error;

/// Base error type for raven operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("{0}")]
    Other(String),
}

/// Raised while building a client: bad DSN, unsupported scheme, missing credentials.
///
/// No partially configured client is ever returned alongside one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("malformed DSN: {0}")]
    InvalidDsn(String),

    #[error("unsupported scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Raised when an event could not be encoded or handed to a server.
///
/// The client facade swallows these; see [`crate::Client::send`].
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("payload compression failed: {0}")]
    Compress(#[from] std::io::Error),

    #[error("failed to decode payload: {0}")]
    Decode(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("server responded with status {status_code}")]
    Status { status_code: u16 },
}
