//! obs-websocket client
//!
//! Handles:
//! - The v5 Hello / Identify / Identified handshake, including authentication
//! - Request / RequestResponse round-trips over one synchronous websocket
//! - The `Connector` / `Session` seam the connection guard is written against

pub mod client;
pub mod protocol;

use serde_json::Value;

pub use client::WsConnector;
pub use protocol::RequestResponse;

use crate::models::ConnectionSettings;

/// Transport and handshake failures
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("invalid websocket address: {0}")]
    InvalidAddress(String),

    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("OBS requires a password but none is configured")]
    AuthRequired,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("connection closed by OBS: {0}")]
    Closed(String),
}

impl From<serde_json::Error> for SocketError {
    fn from(err: serde_json::Error) -> Self {
        SocketError::Malformed(err.to_string())
    }
}

/// One identified obs-websocket session
pub trait Session {
    /// Send a request and wait for its matching response
    fn request(
        &mut self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<RequestResponse, SocketError>;

    /// Close the session; the handle is unusable afterwards
    fn close(&mut self) -> Result<(), SocketError>;
}

/// Opens identified sessions
pub trait Connector {
    fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn Session>, SocketError>;
}
