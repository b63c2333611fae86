//! Connection Manager Module
//!
//! Purpose:
//!     Keep a streaming session to the node alive forever and forward every
//!     pending transaction hash it delivers to the opportunity filter.
//!
//! Created: 2026-10-12
//!
//! Architecture:
//!     mod.rs      : Session / SessionConnector seams, events, errors
//!     state.rs    : per-connection ConnectionState (session + timers)
//!     manager.rs  : supervisor loop (heartbeat, pong deadline, reconnect)
//!     ws.rs       : tokio-tungstenite JSON-RPC session (eth_subscribe)

pub mod manager;
pub mod state;
pub mod ws;

use alloy::primitives::TxHash;
use async_trait::async_trait;
use thiserror::Error;

pub use manager::{ConnectionManager, ConnectionSettings, SessionEnd};
pub use state::{ConnectionPhase, ConnectionState};
pub use ws::{WsConnector, WsSession};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node rejected request: {0}")]
    Rpc(String),
    #[error("connection closed unexpectedly")]
    Closed,
}

/// What an open session can report to its supervisor
#[derive(Debug)]
pub enum SessionEvent {
    PendingTx(TxHash),
    Pong,
    /// Peer closed (optional close reason)
    Closed(Option<String>),
    Error(SessionError),
}

/// One live streaming session
#[async_trait]
pub trait Session: Send {
    /// Request the pending-transaction stream. Hashes then arrive through
    /// `next_event`.
    async fn subscribe_pending(&mut self) -> Result<(), SessionError>;

    /// Send a liveness probe. The answer arrives as `SessionEvent::Pong`.
    async fn ping(&mut self) -> Result<(), SessionError>;

    /// Wait for the next event. Must be cancel-safe: it is raced against
    /// the heartbeat in `select!`.
    async fn next_event(&mut self) -> SessionEvent;

    /// Tear the session down without waiting for the peer
    async fn terminate(&mut self);
}

/// Opens sessions. Called once per (re)connect.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    type Session: Session;

    async fn open(&self, uri: &str) -> Result<Self::Session, SessionError>;
}
