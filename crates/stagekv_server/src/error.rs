//! Error types for the request handler.

use stagekv_core::CoreError;
use thiserror::Error;

/// Result type for handler operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Session ID that cannot name any session.
    #[error("unknown session id: {0}")]
    UnknownSession(String),

    /// Debug views are disabled.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Error from the staging engine.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ServerError {
    /// HTTP-style status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::UnknownSession(_) => 404,
            ServerError::Forbidden(_) => 403,
            ServerError::Core(err) => match err {
                CoreError::SessionNotFound { .. } | CoreError::NotFound { .. } => 404,
                CoreError::NoOpenTransaction { .. } | CoreError::InvalidArgument { .. } => 400,
                CoreError::FlushFailed { .. } => 503,
                _ => 500,
            },
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagekv_core::SessionId;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Core(CoreError::StoreLocked).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }

    #[test]
    fn core_errors_map_to_statuses() {
        let id = SessionId::new();
        let status = |err: CoreError| ServerError::from(err).status();

        assert_eq!(status(CoreError::session_not_found(id)), 404);
        assert_eq!(status(CoreError::not_found("k")), 404);
        assert_eq!(status(CoreError::no_open_transaction(id)), 400);
        assert_eq!(status(CoreError::invalid_argument("empty key")), 400);
        assert_eq!(status(CoreError::flush_failed(CoreError::StoreLocked)), 503);
        assert_eq!(status(CoreError::codec("bad")), 500);
    }

    #[test]
    fn unknown_session_and_forbidden() {
        assert_eq!(ServerError::UnknownSession("nope".into()).status(), 404);
        assert_eq!(ServerError::Forbidden("debug views".into()).status(), 403);
    }

    #[test]
    fn core_error_display_is_passed_through() {
        let err = ServerError::from(CoreError::not_found("user:1"));
        assert_eq!(err.to_string(), "key not found: user:1");
    }
}
