//! Database family messages: `database_msg` requests and `database_response` replies.
//!
//! These are hand-written prost messages. Field tags follow the node's
//! `database.proto` so the bytes interoperate with a running swarm.

use prost::Message;
use serde::Serialize;

/// Correlates a database request with its response.
#[derive(Clone, PartialEq, Eq, Hash, Message, Serialize)]
pub struct DatabaseHeader {
    /// Database the request targets.
    #[prost(string, tag = "1")]
    pub db_uuid: String,
    /// Request identifier, echoed back in the response.
    #[prost(uint64, tag = "2")]
    pub nonce: u64,
    /// Node the request was first submitted to.
    #[prost(string, tag = "3")]
    pub point_of_contact: String,
}

impl DatabaseHeader {
    pub fn new(db_uuid: impl Into<String>, nonce: u64) -> Self {
        Self {
            db_uuid: db_uuid.into(),
            nonce,
            point_of_contact: String::new(),
        }
    }
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseCreate {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseRead {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseUpdate {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseDelete {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseHas {
    #[prost(string, tag = "1")]
    pub key: String,
}

/// Request without arguments beyond the header (`keys`, `size`, `create_db`, ...).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseRequest {}

/// A database request.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseMsg {
    #[prost(message, optional, tag = "1")]
    pub header: Option<DatabaseHeader>,
    #[prost(oneof = "database_msg::Msg", tags = "2, 3, 4, 5, 6, 7, 8, 9, 10, 11")]
    #[serde(flatten)]
    pub msg: Option<database_msg::Msg>,
}

pub mod database_msg {
    use serde::Serialize;

    /// The operation carried by a [`DatabaseMsg`](super::DatabaseMsg).
    #[derive(Clone, PartialEq, prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Msg {
        #[prost(message, tag = "2")]
        Create(super::DatabaseCreate),
        #[prost(message, tag = "3")]
        Read(super::DatabaseRead),
        #[prost(message, tag = "4")]
        Update(super::DatabaseUpdate),
        #[prost(message, tag = "5")]
        Delete(super::DatabaseDelete),
        #[prost(message, tag = "6")]
        Has(super::DatabaseHas),
        #[prost(message, tag = "7")]
        Keys(super::DatabaseRequest),
        #[prost(message, tag = "8")]
        Size(super::DatabaseRequest),
        #[prost(message, tag = "9")]
        CreateDb(super::DatabaseRequest),
        #[prost(message, tag = "10")]
        DeleteDb(super::DatabaseRequest),
        #[prost(message, tag = "11")]
        HasDb(super::DatabaseRequest),
    }
}

impl DatabaseMsg {
    pub fn new(header: DatabaseHeader, msg: database_msg::Msg) -> Self {
        Self {
            header: Some(header),
            msg: Some(msg),
        }
    }

    pub fn create(
        header: DatabaseHeader,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(
            header,
            database_msg::Msg::Create(DatabaseCreate {
                key: key.into(),
                value: value.into(),
            }),
        )
    }

    pub fn read(header: DatabaseHeader, key: impl Into<String>) -> Self {
        Self::new(header, database_msg::Msg::Read(DatabaseRead { key: key.into() }))
    }

    pub fn update(
        header: DatabaseHeader,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(
            header,
            database_msg::Msg::Update(DatabaseUpdate {
                key: key.into(),
                value: value.into(),
            }),
        )
    }

    pub fn delete(header: DatabaseHeader, key: impl Into<String>) -> Self {
        Self::new(header, database_msg::Msg::Delete(DatabaseDelete { key: key.into() }))
    }
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseReadResponse {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseHasResponse {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bool, tag = "2")]
    pub has: bool,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseKeysResponse {
    #[prost(string, repeated, tag = "1")]
    pub keys: Vec<String>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseSizeResponse {
    #[prost(int32, tag = "1")]
    pub bytes: i32,
    #[prost(int32, tag = "2")]
    pub keys: i32,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseHasDbResponse {
    #[prost(string, tag = "1")]
    pub uuid: String,
    #[prost(bool, tag = "2")]
    pub has: bool,
}

/// Error reported in place of a successful result.
#[derive(Clone, PartialEq, Eq, Message, Serialize)]
pub struct DatabaseError {
    #[prost(string, tag = "1")]
    pub message: String,
}

impl DatabaseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A database response.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct DatabaseResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<DatabaseHeader>,
    #[prost(oneof = "database_response::Response", tags = "2, 3, 4, 5, 6, 7")]
    #[serde(flatten)]
    pub response: Option<database_response::Response>,
}

pub mod database_response {
    use serde::Serialize;

    /// The outcome carried by a [`DatabaseResponse`](super::DatabaseResponse).
    #[derive(Clone, PartialEq, prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Response {
        #[prost(message, tag = "2")]
        Read(super::DatabaseReadResponse),
        #[prost(message, tag = "3")]
        Has(super::DatabaseHasResponse),
        #[prost(message, tag = "4")]
        Keys(super::DatabaseKeysResponse),
        #[prost(message, tag = "5")]
        Size(super::DatabaseSizeResponse),
        #[prost(message, tag = "6")]
        HasDb(super::DatabaseHasDbResponse),
        #[prost(message, tag = "7")]
        Error(super::DatabaseError),
    }
}

impl DatabaseResponse {
    /// Builds an error response correlated to `header`.
    pub fn error(header: Option<DatabaseHeader>, error: DatabaseError) -> Self {
        Self {
            header,
            response: Some(database_response::Response::Error(error)),
        }
    }

    /// Returns the error carried by this response, if any.
    pub fn as_error(&self) -> Option<&DatabaseError> {
        match &self.response {
            Some(database_response::Response::Error(err)) => Some(err),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.as_error().is_some()
    }

    /// Returns the request identifier from the header, if a header is present.
    pub fn nonce(&self) -> Option<u64> {
        self.header.as_ref().map(|h| h.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_msg_constructors() {
        let msg = DatabaseMsg::create(DatabaseHeader::new("db", 7), "k", b"v".to_vec());
        assert_eq!(msg.header.as_ref().map(|h| h.nonce), Some(7));
        assert!(matches!(
            msg.msg,
            Some(database_msg::Msg::Create(ref c)) if c.key == "k" && c.value == b"v"
        ));

        let msg = DatabaseMsg::delete(DatabaseHeader::new("db", 8), "gone");
        assert!(matches!(msg.msg, Some(database_msg::Msg::Delete(ref d)) if d.key == "gone"));
    }

    #[test]
    fn test_database_response_error_accessors() {
        let response =
            DatabaseResponse::error(Some(DatabaseHeader::new("db", 3)), DatabaseError::new("nope"));
        assert!(response.is_error());
        assert_eq!(response.as_error().map(|e| e.message.as_str()), Some("nope"));
        assert_eq!(response.nonce(), Some(3));

        let ok = DatabaseResponse {
            header: None,
            response: Some(database_response::Response::Has(DatabaseHasResponse {
                key: "k".to_string(),
                has: true,
            })),
        };
        assert!(!ok.is_error());
        assert_eq!(ok.nonce(), None);
    }

    #[test]
    fn test_database_msg_wire_roundtrip() {
        let msg = DatabaseMsg::update(DatabaseHeader::new("uuid-1", 99), "key", vec![1, 2, 3]);
        let bytes = msg.encode_to_vec();
        let decoded = DatabaseMsg::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_database_msg_serializes_operation_by_name() {
        let msg = DatabaseMsg::read(DatabaseHeader::new("db", 1), "k");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["read"]["key"], "k");
        assert_eq!(value["header"]["nonce"], 1);
    }
}
