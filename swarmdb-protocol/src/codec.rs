//! Encoder and decoder for envelopes.

use crate::database::{DatabaseMsg, DatabaseResponse};
use crate::envelope::{Envelope, Payload, PayloadKind, WireEnvelope};
use crate::error::ProtocolError;
use crate::status::{StatusRequest, StatusResponse};
use bytes::Bytes;
use prost::Message;

/// Encodes an envelope into its wire bytes.
///
/// Fields are written in tag order, so equal envelopes always produce equal
/// bytes.
pub fn encode(envelope: &Envelope) -> Bytes {
    let inner = encode_payload(&envelope.payload);
    let mut wire = WireEnvelope {
        sender: envelope.sender.clone(),
        signature: envelope.signature.clone(),
        timestamp: envelope.timestamp,
        ..Default::default()
    };

    match envelope.kind() {
        PayloadKind::DatabaseMsg => wire.database_msg = Some(inner),
        PayloadKind::DatabaseResponse => wire.database_response = Some(inner),
        PayloadKind::StatusRequest => wire.status_request = Some(inner),
        PayloadKind::StatusResponse => wire.status_response = Some(inner),
    }

    Bytes::from(wire.encode_to_vec())
}

/// Encodes just the inner message of a payload.
pub fn encode_payload(payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::DatabaseMsg(msg) => msg.encode_to_vec(),
        Payload::DatabaseResponse(response) => response.encode_to_vec(),
        Payload::StatusRequest(request) => request.encode_to_vec(),
        Payload::StatusResponse(response) => response.encode_to_vec(),
    }
}

/// Decodes wire bytes into an envelope.
///
/// Only the populated slot is parsed as its inner message. Fails when the
/// outer frame is malformed, when zero or several slots are populated, or when
/// the populated slot does not parse as its kind.
pub fn decode(bytes: &[u8]) -> Result<Envelope, ProtocolError> {
    let wire = WireEnvelope::decode(bytes)?;

    let payload = {
        let mut populated = wire.populated();
        match populated.len() {
            0 => return Err(ProtocolError::EmptyEnvelope),
            1 => {
                let (kind, inner) = populated.remove(0);
                decode_payload(kind, inner)?
            }
            _ => {
                return Err(ProtocolError::MultiplePayloads(
                    populated.into_iter().map(|(kind, _)| kind).collect(),
                ))
            }
        }
    };

    Ok(Envelope {
        sender: wire.sender,
        signature: wire.signature,
        timestamp: wire.timestamp,
        payload,
    })
}

/// Decodes the inner message of a known payload kind.
pub fn decode_payload(kind: PayloadKind, bytes: &[u8]) -> Result<Payload, ProtocolError> {
    let invalid = |source| ProtocolError::InvalidPayload { kind, source };

    let payload: Payload = match kind {
        PayloadKind::DatabaseMsg => DatabaseMsg::decode(bytes).map_err(invalid)?.into(),
        PayloadKind::DatabaseResponse => DatabaseResponse::decode(bytes).map_err(invalid)?.into(),
        PayloadKind::StatusRequest => StatusRequest::decode(bytes).map_err(invalid)?.into(),
        PayloadKind::StatusResponse => StatusResponse::decode(bytes).map_err(invalid)?.into(),
    };
    Ok(payload)
}
