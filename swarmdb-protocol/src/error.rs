//! Protocol error types.

use crate::envelope::PayloadKind;
use thiserror::Error;

/// Protocol violations raised while decoding an envelope.
///
/// None of these are expected at runtime against a healthy node. They mean
/// the bytes on hand are not a well-formed swarm message, and callers should
/// treat them as defects rather than retry.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("envelope carries no supported payload")]
    EmptyEnvelope,

    #[error("envelope carries {} payloads ({}), expected exactly one", .0.len(), kinds_list(.0))]
    MultiplePayloads(Vec<PayloadKind>),

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: PayloadKind,
        source: prost::DecodeError,
    },
}

fn kinds_list(kinds: &[PayloadKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.label())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ProtocolError {
    /// Returns the payload kind involved in the violation, if any.
    pub fn kind(&self) -> Option<PayloadKind> {
        match self {
            ProtocolError::InvalidPayload { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusResponse;
    use prost::Message;

    fn decode_error() -> prost::DecodeError {
        // A lone field key with the continuation bit set never terminates.
        StatusResponse::decode(&b"\xff"[..]).unwrap_err()
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::EmptyEnvelope;
        assert!(err.to_string().contains("no supported payload"));

        let err = ProtocolError::MultiplePayloads(vec![
            PayloadKind::DatabaseMsg,
            PayloadKind::StatusRequest,
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 payloads"));
        assert!(msg.contains("database_msg, status_request"));

        let err = ProtocolError::InvalidPayload {
            kind: PayloadKind::StatusResponse,
            source: decode_error(),
        };
        assert!(err.to_string().starts_with("invalid status_response payload"));
    }

    #[test]
    fn test_protocol_error_kind() {
        let err = ProtocolError::InvalidPayload {
            kind: PayloadKind::DatabaseMsg,
            source: decode_error(),
        };
        assert_eq!(err.kind(), Some(PayloadKind::DatabaseMsg));
        assert_eq!(ProtocolError::EmptyEnvelope.kind(), None);
    }
}
