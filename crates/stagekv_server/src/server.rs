//! Server facade.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::protocol::{Request, Response};
use stagekv_core::{Config, StagingEngine};
use std::path::Path;
use std::sync::Arc;

/// The stagekv server.
///
/// Owns the staging engine and the request handler. A transport front
/// end forwards each decoded request to [`StageServer::handle`] or each
/// raw JSON line to [`StageServer::handle_json`].
///
/// # Example
///
/// ```
/// use stagekv_server::{Request, ServerConfig, StageServer};
///
/// let server = StageServer::in_memory(ServerConfig::default()).unwrap();
/// let response = server.handle(Request::CreateSession);
/// assert_eq!(response.status, 200);
/// ```
pub struct StageServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl StageServer {
    /// Creates a server over an existing engine.
    pub fn new(engine: Arc<StagingEngine>, config: ServerConfig) -> Self {
        let context = Arc::new(HandlerContext::new(config, engine));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Opens the store directory at `path` and serves it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(path: &Path, engine_config: Config, config: ServerConfig) -> ServerResult<Self> {
        let engine = StagingEngine::open(path, engine_config)?;
        Ok(Self::new(Arc::new(engine), config))
    }

    /// Creates a server over an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be created.
    pub fn in_memory(config: ServerConfig) -> ServerResult<Self> {
        let engine = StagingEngine::open_in_memory()?;
        Ok(Self::new(Arc::new(engine), config))
    }

    /// Handles a decoded request.
    pub fn handle(&self, request: Request) -> Response {
        self.handler.handle(request)
    }

    /// Handles one JSON request line.
    pub fn handle_json(&self, line: &str) -> String {
        self.handler.handle_json(line)
    }

    /// The engine behind this server.
    pub fn engine(&self) -> &Arc<StagingEngine> {
        &self.context.engine
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.context.engine.session_count()
    }
}
