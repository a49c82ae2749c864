//! Client error types.

use std::path::PathBuf;
use swarmdb_protocol::{PayloadKind, ProtocolError};
use thiserror::Error;

/// Client errors.
///
/// Socket failures never show up here: they are logged and move the
/// transport to `Closed`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unexpected {0} payload")]
    UnexpectedPayload(PayloadKind),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no tokio runtime: {0}")]
    NoRuntime(String),
}

impl ClientError {
    /// Returns whether this error is a malformed-message defect.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ClientError::Protocol(_) | ClientError::UnexpectedPayload(_)
        )
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    IoError(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}
