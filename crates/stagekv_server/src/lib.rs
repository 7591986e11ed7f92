//! # stagekv server
//!
//! Request handling for the stagekv staging engine.
//!
//! This crate provides:
//! - a JSON request/response protocol covering sessions, transactions
//!   and key operations
//! - status codes and bodies shaped like a REST API, so any transport
//!   (HTTP, stdio, a socket) can forward them unchanged
//! - gated read-only debug views of the committed store and its history
//!
//! # Architecture
//!
//! The handler owns no transport. A front end decodes one [`Request`],
//! passes it to [`RequestHandler::handle`] and writes back the
//! [`Response`]. [`RequestHandler::handle_json`] does the same for a
//! single line of JSON.
//!
//! ```rust
//! use stagekv_server::{ServerConfig, StageServer};
//!
//! let server = StageServer::in_memory(ServerConfig::default()).unwrap();
//! let reply = server.handle_json(r#"{"op":"create_session"}"#);
//! assert!(reply.contains("session_id"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod protocol;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use protocol::{Request, Response};
pub use server::StageServer;
