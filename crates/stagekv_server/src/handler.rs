//! Request handlers.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::protocol::{Request, Response};
use serde_json::{json, Value as JsonValue};
use stagekv_core::{CoreError, SequenceNumber, SessionId, StagingEngine, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The engine shared by every handler.
    pub engine: Arc<StagingEngine>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, engine: Arc<StagingEngine>) -> Self {
        Self { config, engine }
    }

    fn check_key(&self, key: &str) -> ServerResult<()> {
        if key.is_empty() {
            return Err(ServerError::InvalidRequest("key must not be empty".into()));
        }
        if key.len() > self.config.max_key_len {
            return Err(ServerError::InvalidRequest(format!(
                "key too long: {} > {} bytes",
                key.len(),
                self.config.max_key_len
            )));
        }
        Ok(())
    }

    fn check_value(&self, value: &Value) -> ServerResult<()> {
        let size = value.encode()?.len();
        if size > self.config.max_value_size {
            return Err(ServerError::InvalidRequest(format!(
                "value too large: {size} > {} bytes",
                self.config.max_value_size
            )));
        }
        Ok(())
    }

    fn check_debug_views(&self) -> ServerResult<()> {
        if self.config.debug_views {
            Ok(())
        } else {
            Err(ServerError::Forbidden("debug views are disabled".into()))
        }
    }
}

/// Parses a client-supplied session ID.
///
/// A string that is not a UUID cannot name any session, so it is reported
/// the same way as an unknown one.
fn parse_session(raw: &str) -> ServerResult<SessionId> {
    raw.parse()
        .map_err(|_| ServerError::UnknownSession(raw.to_string()))
}

fn parse_optional_session(raw: Option<&str>) -> ServerResult<Option<SessionId>> {
    raw.map(parse_session).transpose()
}

/// Handler for client requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles one request. Errors become error responses.
    pub fn handle(&self, request: Request) -> Response {
        let op = request.op();
        match self.dispatch(request) {
            Ok(response) => {
                debug!(op, status = response.status, "request handled");
                response
            }
            Err(err) => {
                let status = err.status();
                if err.is_server_error() {
                    warn!(op, status, error = %err, "request failed");
                } else {
                    debug!(op, status, error = %err, "request rejected");
                }
                Response::error(status, err.to_string())
            }
        }
    }

    /// Handles one JSON-encoded request and returns the JSON response.
    pub fn handle_json(&self, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(err) => Response::error(400, format!("malformed request: {err}")),
        };
        serde_json::to_string(&response).unwrap_or_else(|err| {
            format!(r#"{{"status":500,"body":{{"error":"{err}"}}}}"#)
        })
    }

    fn dispatch(&self, request: Request) -> ServerResult<Response> {
        match request {
            Request::CreateSession => self.handle_create_session(),
            Request::Begin { session_id } => self.handle_begin(&session_id),
            Request::Commit { session_id } => self.handle_commit(&session_id),
            Request::Rollback { session_id } => self.handle_rollback(&session_id),
            Request::CloseSession { session_id } => self.handle_close_session(&session_id),
            Request::Get { key, session_id } => self.handle_get(&key, session_id.as_deref()),
            Request::Put {
                key,
                value,
                session_id,
            } => self.handle_put(key, value, session_id.as_deref()),
            Request::Delete { key, session_id } => self.handle_delete(&key, session_id.as_deref()),
            Request::DumpCommitted => self.handle_dump_committed(),
            Request::CommitHistory { since, limit } => self.handle_commit_history(since, limit),
        }
    }

    /// Handles a create-session request.
    pub fn handle_create_session(&self) -> ServerResult<Response> {
        let id = self.context.engine.create_session();
        Ok(Response::success(json!({ "session_id": id.to_string() })))
    }

    /// Handles a begin request.
    pub fn handle_begin(&self, session_id: &str) -> ServerResult<Response> {
        let id = parse_session(session_id)?;
        Ok(Response::depth(self.context.engine.begin(&id)?))
    }

    /// Handles a commit request.
    pub fn handle_commit(&self, session_id: &str) -> ServerResult<Response> {
        let id = parse_session(session_id)?;
        Ok(Response::depth(self.context.engine.commit(&id)?))
    }

    /// Handles a rollback request.
    pub fn handle_rollback(&self, session_id: &str) -> ServerResult<Response> {
        let id = parse_session(session_id)?;
        Ok(Response::depth(self.context.engine.rollback(&id)?))
    }

    /// Handles a close-session request.
    pub fn handle_close_session(&self, session_id: &str) -> ServerResult<Response> {
        let id = parse_session(session_id)?;
        self.context.engine.close_session(&id)?;
        Ok(Response::ok())
    }

    /// Handles a get request.
    ///
    /// A missing key is answered with status 404 and `found: false`.
    pub fn handle_get(&self, key: &str, session_id: Option<&str>) -> ServerResult<Response> {
        self.context.check_key(key)?;
        let id = parse_optional_session(session_id)?;

        match self.context.engine.get(id.as_ref(), key) {
            Ok(value) => Ok(Response::success(json!({
                "key": key,
                "value": value.into_json(),
                "found": true,
            }))),
            Err(CoreError::NotFound { .. }) => Ok(Response {
                status: 404,
                body: json!({ "key": key, "value": null, "found": false }),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Handles a put request.
    pub fn handle_put(
        &self,
        key: String,
        value: Option<JsonValue>,
        session_id: Option<&str>,
    ) -> ServerResult<Response> {
        self.context.check_key(&key)?;
        let value = value
            .map(Value::new)
            .ok_or_else(|| ServerError::InvalidRequest("missing 'value'".into()))?;
        self.context.check_value(&value)?;
        let id = parse_optional_session(session_id)?;

        self.context.engine.put(id.as_ref(), key, value)?;
        Ok(Response::ok())
    }

    /// Handles a delete request.
    pub fn handle_delete(&self, key: &str, session_id: Option<&str>) -> ServerResult<Response> {
        self.context.check_key(key)?;
        let id = parse_optional_session(session_id)?;

        self.context.engine.delete(id.as_ref(), key)?;
        Ok(Response::ok())
    }

    /// Handles a dump request (debug view).
    pub fn handle_dump_committed(&self) -> ServerResult<Response> {
        self.context.check_debug_views()?;
        let data: serde_json::Map<String, JsonValue> = self
            .context
            .engine
            .dump_committed()?
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect();
        Ok(Response::success(json!({ "data": data })))
    }

    /// Handles a history request (debug view).
    pub fn handle_commit_history(
        &self,
        since: Option<u64>,
        limit: Option<usize>,
    ) -> ServerResult<Response> {
        self.context.check_debug_views()?;
        let max = self.context.config.max_history_entries;
        let limit = limit.unwrap_or(max).min(max);
        let after = SequenceNumber::new(since.unwrap_or(0));

        let engine = &self.context.engine;
        let records = engine.commit_history_since(after, limit);
        let latest = engine.history().latest_sequence();
        let records = serde_json::to_value(records)
            .map_err(|e| ServerError::Core(CoreError::codec(e.to_string())))?;
        Ok(Response::success(json!({
            "records": records,
            "latest_sequence": latest,
        })))
    }
}
