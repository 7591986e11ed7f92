//! Request and response messages.
//!
//! Requests are JSON objects tagged by `op`:
//!
//! ```json
//! {"op": "put", "key": "user:1", "value": {"name": "Ava"}, "session_id": "…"}
//! ```
//!
//! Every response carries an HTTP-style `status` and a JSON `body`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Registers a new session.
    CreateSession,
    /// Opens a nested transaction.
    Begin {
        /// Target session.
        session_id: String,
    },
    /// Commits the innermost transaction.
    Commit {
        /// Target session.
        session_id: String,
    },
    /// Discards the innermost transaction.
    Rollback {
        /// Target session.
        session_id: String,
    },
    /// Removes a session and its open transactions.
    CloseSession {
        /// Target session.
        session_id: String,
    },
    /// Reads a key.
    Get {
        /// Key to read.
        key: String,
        /// Session to read through; none reads committed state.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Writes a key.
    Put {
        /// Key to write.
        key: String,
        /// New value. `null` is a value; a missing field is an error.
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        value: Option<JsonValue>,
        /// Session to write through; none autocommits.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Deletes a key.
    Delete {
        /// Key to delete.
        key: String,
        /// Session to delete through; none autocommits.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Dumps the committed store (debug view).
    DumpCommitted,
    /// Lists durable applies (debug view).
    CommitHistory {
        /// Only records with a greater sequence number.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since: Option<u64>,
        /// Page size, capped by the server.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
}

impl Request {
    /// Short operation name, as used in logs.
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateSession => "create_session",
            Request::Begin { .. } => "begin",
            Request::Commit { .. } => "commit",
            Request::Rollback { .. } => "rollback",
            Request::CloseSession { .. } => "close_session",
            Request::Get { .. } => "get",
            Request::Put { .. } => "put",
            Request::Delete { .. } => "delete",
            Request::DumpCommitted => "dump_committed",
            Request::CommitHistory { .. } => "commit_history",
        }
    }
}

/// Maps a present field (even `null`) to `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

/// A response to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// JSON body.
    pub body: JsonValue,
}

impl Response {
    /// Creates a 200 response.
    pub fn success(body: JsonValue) -> Self {
        Self { status: 200, body }
    }

    /// Creates `{"ok": true}`.
    pub fn ok() -> Self {
        Self::success(json!({ "ok": true }))
    }

    /// Creates `{"ok": true, "depth": depth}`.
    pub fn depth(depth: usize) -> Self {
        Self::success(json!({ "ok": true, "depth": depth }))
    }

    /// Creates an error response with `{"error": message}`.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_by_op() {
        let request: Request =
            serde_json::from_str(r#"{"op":"begin","session_id":"abc"}"#).unwrap();
        assert_eq!(
            request,
            Request::Begin {
                session_id: "abc".into()
            }
        );
        assert_eq!(request.op(), "begin");
    }

    #[test]
    fn optional_fields_default_to_none() {
        let request: Request = serde_json::from_str(r#"{"op":"get","key":"k"}"#).unwrap();
        assert_eq!(
            request,
            Request::Get {
                key: "k".into(),
                session_id: None
            }
        );
    }

    #[test]
    fn null_value_differs_from_missing_value() {
        let with_null: Request =
            serde_json::from_str(r#"{"op":"put","key":"k","value":null}"#).unwrap();
        let missing: Request = serde_json::from_str(r#"{"op":"put","key":"k"}"#).unwrap();

        assert!(matches!(with_null, Request::Put { value: Some(JsonValue::Null), .. }));
        assert!(matches!(missing, Request::Put { value: None, .. }));
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"op":"explode"}"#).is_err());
    }

    #[test]
    fn response_constructors() {
        assert_eq!(Response::depth(2).body, json!({"ok": true, "depth": 2}));
        assert!(Response::ok().is_success());

        let err = Response::error(404, "key not found: k");
        assert!(!err.is_success());
        assert_eq!(err.body["error"], "key not found: k");
    }
}
