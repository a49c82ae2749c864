//! Locally manufactured responses for requests that never reached the wire.

use crate::error::ClientError;
use bytes::Bytes;
use swarmdb_protocol::{DatabaseError, DatabaseMsg, DatabaseResponse, Envelope, Payload};

/// Error message carried by responses synthesized while the socket is not open.
pub const CONNECTION_NOT_OPEN: &str = "CONNECTION NOT OPEN";

/// Builds the encoded `database_response` envelope answering `request_bytes`
/// with a [`CONNECTION_NOT_OPEN`] error.
///
/// `request_bytes` must hold a `database_msg` envelope; anything else is
/// rejected with [`ClientError::UnexpectedPayload`].
pub fn connection_not_open(request_bytes: &[u8]) -> Result<Bytes, ClientError> {
    let request = swarmdb_protocol::decode(request_bytes)?;
    match &request.payload {
        Payload::DatabaseMsg(msg) => Ok(error_response(msg, CONNECTION_NOT_OPEN)),
        other => Err(ClientError::UnexpectedPayload(other.kind())),
    }
}

/// Encodes a `database_response` envelope with `message` as its error and the
/// header copied from `request`.
pub fn error_response(request: &DatabaseMsg, message: &str) -> Bytes {
    let response = DatabaseResponse::error(request.header.clone(), DatabaseError::new(message));
    swarmdb_protocol::encode(&Envelope::new(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmdb_protocol::{DatabaseHeader, PayloadKind, StatusRequest};

    fn create_request(nonce: u64) -> Bytes {
        let msg = DatabaseMsg::create(DatabaseHeader::new("db-uuid", nonce), "key", b"v".to_vec());
        swarmdb_protocol::encode(&Envelope::new(msg))
    }

    #[test]
    fn test_connection_not_open_copies_header() {
        let response_bytes = connection_not_open(&create_request(42)).unwrap();
        let envelope = swarmdb_protocol::decode(&response_bytes).unwrap();

        let response = envelope.as_database_response().unwrap();
        let header = response.header.as_ref().unwrap();
        assert_eq!(header.nonce, 42);
        assert_eq!(header.db_uuid, "db-uuid");
        assert_eq!(
            response.as_error().map(|e| e.message.as_str()),
            Some("CONNECTION NOT OPEN")
        );
    }

    #[test]
    fn test_connection_not_open_is_deterministic() {
        let request = create_request(7);
        assert_eq!(
            connection_not_open(&request).unwrap(),
            connection_not_open(&request).unwrap()
        );
    }

    #[test]
    fn test_connection_not_open_without_header() {
        let msg = DatabaseMsg {
            header: None,
            msg: None,
        };
        let bytes = swarmdb_protocol::encode(&Envelope::new(msg));

        let envelope = swarmdb_protocol::decode(&connection_not_open(&bytes).unwrap()).unwrap();
        let response = envelope.as_database_response().unwrap();
        assert!(response.header.is_none());
        assert!(response.is_error());
    }

    #[test]
    fn test_connection_not_open_rejects_status_request() {
        let bytes = swarmdb_protocol::encode(&Envelope::new(StatusRequest {}));
        assert!(matches!(
            connection_not_open(&bytes),
            Err(ClientError::UnexpectedPayload(PayloadKind::StatusRequest))
        ));
    }

    #[test]
    fn test_connection_not_open_rejects_garbage() {
        assert!(matches!(
            connection_not_open(b"\xff"),
            Err(ClientError::Protocol(_))
        ));
    }
}
