//! MeterHub Server
//!
//! The connection-facing half of the system: the WebSocket accept loop and
//! per-connection lifecycle (frame parsing, heartbeat, error containment),
//! and the event router that dispatches inbound envelopes to the handlers
//! registered at startup.

mod connection;
mod heartbeat;
mod router;

pub use connection::{ServerConfig, WsReplySink, WsServer};
pub use heartbeat::{Heartbeat, HeartbeatTick};
pub use router::{EventRouter, EventRouterBuilder};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
}
