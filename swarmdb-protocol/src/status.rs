//! Status family messages used for node health polling.

use prost::Message;
use serde::Serialize;

/// Asks a node for its status. Carries no fields.
#[derive(Clone, PartialEq, Eq, Message, Serialize)]
pub struct StatusRequest {}

/// A node's answer to a [`StatusRequest`].
#[derive(Clone, PartialEq, Eq, Message, Serialize)]
pub struct StatusResponse {
    #[prost(string, tag = "1")]
    pub swarm_version: String,
    #[prost(string, tag = "2")]
    pub swarm_git_commit: String,
    #[prost(string, tag = "3")]
    pub uptime: String,
    /// Per-module status, as JSON text produced by the node.
    #[prost(string, tag = "4")]
    pub module_status_json: String,
    #[prost(bool, tag = "5")]
    pub pbft_enabled: bool,
}
