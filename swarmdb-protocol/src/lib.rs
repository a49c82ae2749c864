//! # swarmdb-protocol
//!
//! Wire protocol for talking to swarm database nodes.
//!
//! This crate provides:
//! - The outer envelope and its four payload kinds
//! - Database family messages (`database_msg`, `database_response`)
//! - Status family messages (`status_request`, `status_response`)
//! - Envelope encoding/decoding with protocol violation detection

pub mod codec;
pub mod database;
pub mod envelope;
pub mod error;
pub mod status;

pub use codec::{decode, encode};
pub use database::{DatabaseError, DatabaseHeader, DatabaseMsg, DatabaseResponse};
pub use envelope::{Envelope, Payload, PayloadKind};
pub use error::ProtocolError;
pub use status::{StatusRequest, StatusResponse};
