//! Outer envelope carried by every WebSocket message.
//!
//! On the wire the envelope is a protobuf message whose payload is a oneof of
//! serialized inner messages. In memory the payload is the [`Payload`] enum, so
//! "exactly one slot is set" is a property of the type rather than something
//! checked at each call site.

use crate::database::{DatabaseMsg, DatabaseResponse};
use crate::status::{StatusRequest, StatusResponse};
use std::fmt;

/// The four payload slots an envelope can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    DatabaseMsg,
    DatabaseResponse,
    StatusRequest,
    StatusResponse,
}

impl PayloadKind {
    /// Every kind, in wire tag order.
    pub const ALL: [PayloadKind; 4] = [
        PayloadKind::DatabaseMsg,
        PayloadKind::DatabaseResponse,
        PayloadKind::StatusRequest,
        PayloadKind::StatusResponse,
    ];

    /// Name of the envelope slot on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            PayloadKind::DatabaseMsg => "database_msg",
            PayloadKind::DatabaseResponse => "database_response",
            PayloadKind::StatusRequest => "status_request",
            PayloadKind::StatusResponse => "status_response",
        }
    }

    /// `database_msg` or `database_response`.
    pub fn is_database_family(&self) -> bool {
        matches!(
            self,
            PayloadKind::DatabaseMsg | PayloadKind::DatabaseResponse
        )
    }

    /// `status_request` or `status_response`.
    pub fn is_status_family(&self) -> bool {
        matches!(
            self,
            PayloadKind::StatusRequest | PayloadKind::StatusResponse
        )
    }

    /// Whether a client sends this kind (as opposed to receiving it).
    pub fn is_request(&self) -> bool {
        matches!(self, PayloadKind::DatabaseMsg | PayloadKind::StatusRequest)
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The decoded inner message of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    DatabaseMsg(DatabaseMsg),
    DatabaseResponse(DatabaseResponse),
    StatusRequest(StatusRequest),
    StatusResponse(StatusResponse),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::DatabaseMsg(_) => PayloadKind::DatabaseMsg,
            Payload::DatabaseResponse(_) => PayloadKind::DatabaseResponse,
            Payload::StatusRequest(_) => PayloadKind::StatusRequest,
            Payload::StatusResponse(_) => PayloadKind::StatusResponse,
        }
    }
}

impl From<DatabaseMsg> for Payload {
    fn from(msg: DatabaseMsg) -> Self {
        Payload::DatabaseMsg(msg)
    }
}

impl From<DatabaseResponse> for Payload {
    fn from(response: DatabaseResponse) -> Self {
        Payload::DatabaseResponse(response)
    }
}

impl From<StatusRequest> for Payload {
    fn from(request: StatusRequest) -> Self {
        Payload::StatusRequest(request)
    }
}

impl From<StatusResponse> for Payload {
    fn from(response: StatusResponse) -> Self {
        Payload::StatusResponse(response)
    }
}

/// An envelope with exactly one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Identity of the sender. Passed through untouched.
    pub sender: String,
    /// Sender signature over the payload. Passed through untouched.
    pub signature: Vec<u8>,
    /// Sender timestamp. Passed through untouched.
    pub timestamp: u64,
    pub payload: Payload,
}

impl Envelope {
    /// Creates an unsigned envelope around `payload`.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            sender: String::new(),
            signature: Vec::new(),
            timestamp: 0,
            payload: payload.into(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    pub fn is_database_family(&self) -> bool {
        self.kind().is_database_family()
    }

    pub fn is_status_family(&self) -> bool {
        self.kind().is_status_family()
    }

    pub fn as_database_msg(&self) -> Option<&DatabaseMsg> {
        match &self.payload {
            Payload::DatabaseMsg(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_database_response(&self) -> Option<&DatabaseResponse> {
        match &self.payload {
            Payload::DatabaseResponse(response) => Some(response),
            _ => None,
        }
    }

    pub fn as_status_request(&self) -> Option<&StatusRequest> {
        match &self.payload {
            Payload::StatusRequest(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_status_response(&self) -> Option<&StatusResponse> {
        match &self.payload {
            Payload::StatusResponse(response) => Some(response),
            _ => None,
        }
    }
}

/// Wire shape of the envelope.
///
/// The payload slots are plain optional fields instead of a prost oneof so
/// that an envelope with several slots set is detected rather than silently
/// resolved to the last one.
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct WireEnvelope {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub database_msg: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub database_response: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "10")]
    pub status_request: Option<Vec<u8>>,
    #[prost(uint64, tag = "11")]
    pub timestamp: u64,
    #[prost(bytes = "vec", optional, tag = "12")]
    pub status_response: Option<Vec<u8>>,
}

impl WireEnvelope {
    /// Returns the raw bytes of every populated slot, in tag order.
    pub(crate) fn populated(&self) -> Vec<(PayloadKind, &[u8])> {
        PayloadKind::ALL
            .into_iter()
            .filter_map(|kind| self.slot(kind).map(|bytes| (kind, bytes)))
            .collect()
    }

    fn slot(&self, kind: PayloadKind) -> Option<&[u8]> {
        match kind {
            PayloadKind::DatabaseMsg => self.database_msg.as_deref(),
            PayloadKind::DatabaseResponse => self.database_response.as_deref(),
            PayloadKind::StatusRequest => self.status_request.as_deref(),
            PayloadKind::StatusResponse => self.status_response.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseError, DatabaseHeader};

    #[test]
    fn test_payload_kind_labels() {
        assert_eq!(PayloadKind::DatabaseMsg.label(), "database_msg");
        assert_eq!(PayloadKind::DatabaseResponse.label(), "database_response");
        assert_eq!(PayloadKind::StatusRequest.label(), "status_request");
        assert_eq!(PayloadKind::StatusResponse.to_string(), "status_response");
    }

    #[test]
    fn test_family_helpers() {
        let request = Envelope::new(DatabaseMsg::read(DatabaseHeader::new("db", 1), "k"));
        assert!(request.is_database_family());
        assert!(!request.is_status_family());

        let response = Envelope::new(DatabaseResponse::error(None, DatabaseError::new("x")));
        assert!(response.is_database_family());

        let status = Envelope::new(StatusRequest {});
        assert!(status.is_status_family());
        assert!(!status.is_database_family());
        assert!(Envelope::new(StatusResponse::default()).is_status_family());
    }

    #[test]
    fn test_request_kinds() {
        assert!(PayloadKind::DatabaseMsg.is_request());
        assert!(PayloadKind::StatusRequest.is_request());
        assert!(!PayloadKind::DatabaseResponse.is_request());
        assert!(!PayloadKind::StatusResponse.is_request());
    }

    #[test]
    fn test_typed_accessors() {
        let envelope = Envelope::new(StatusRequest {}).with_sender("client-1");
        assert_eq!(envelope.sender, "client-1");
        assert!(envelope.as_status_request().is_some());
        assert!(envelope.as_database_msg().is_none());
        assert!(envelope.as_database_response().is_none());
        assert!(envelope.as_status_response().is_none());
    }

    #[test]
    fn test_wire_envelope_populated_in_tag_order() {
        let wire = WireEnvelope {
            status_response: Some(vec![]),
            database_msg: Some(vec![1]),
            ..Default::default()
        };
        let kinds: Vec<_> = wire.populated().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![PayloadKind::DatabaseMsg, PayloadKind::StatusResponse]
        );
    }
}
