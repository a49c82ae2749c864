//! # swarmdb-client
//!
//! Client transport for swarm database nodes.
//!
//! This crate provides:
//! - A WebSocket [`Transport`] with a `CONNECTING → OPEN → CLOSING → CLOSED` lifecycle
//! - Local `CONNECTION NOT OPEN` responses for database requests that cannot be sent
//! - Deferred, opt-in tracing of decoded traffic
//! - Connection configuration from YAML and environment variables

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod synthesize;

pub use config::ConnectionConfig;
pub use connection::{MessageHandler, ReadyState, Transport};
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use error::{ClientError, ConfigError};
