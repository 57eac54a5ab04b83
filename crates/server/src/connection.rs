//! WebSocket accept loop and per-connection lifecycle.
//!
//! Each accepted socket gets its own task: a read loop that parses envelopes
//! and hands them to the router, and a heartbeat task pinging on a fixed
//! interval. A connection that misses a whole heartbeat interval is closed.
//! Per-message failures never terminate the connection; only socket errors
//! and closes do.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{debug, error, info, warn};

use meterhub_core::{InboundEnvelope, MeterHubError, ReplySink};

use crate::heartbeat::{Heartbeat, HeartbeatTick};
use crate::router::{send_error_reply, EventRouter};
use crate::ServerError;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub heartbeat_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8585".to_string(),
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

/// The write half of one connection, shared between the read loop (error
/// replies), the handlers (totals replies), and the heartbeat task (pings).
#[derive(Clone)]
pub struct WsReplySink {
    writer: Arc<Mutex<SplitSink<WebSocketStream<TcpStream>, Message>>>,
}

impl WsReplySink {
    fn new(writer: SplitSink<WebSocketStream<TcpStream>, Message>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    async fn send_message(
        &self,
        message: Message,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        self.writer.lock().await.send(message).await
    }
}

#[async_trait]
impl ReplySink for WsReplySink {
    async fn send(&self, frame: String) -> meterhub_core::Result<()> {
        self.send_message(Message::Text(frame))
            .await
            .map_err(|e| MeterHubError::ReplySendFailed(e.to_string()))
    }
}

/// WebSocket server: accepts node connections and runs one task per
/// connection against the shared router.
pub struct WsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    heartbeat_interval: Duration,
    router: Arc<EventRouter>,
}

impl WsServer {
    pub async fn bind(config: ServerConfig, router: Arc<EventRouter>) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(&config.listen_addr)
                .await
                .map_err(|source| ServerError::Bind {
                    addr: config.listen_addr.clone(),
                    source,
                })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;
        info!(addr = %local_addr, "listening for node connections");

        Ok(Self {
            listener,
            local_addr,
            heartbeat_interval: config.heartbeat_interval,
            router,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the task is dropped. Accept failures are
    /// logged and do not stop the loop.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let router = self.router.clone();
                    let interval = self.heartbeat_interval;
                    tokio::spawn(async move {
                        if let Err(error) = handle_connection(stream, peer, router, interval).await
                        {
                            warn!(%peer, %error, "connection ended with error");
                        }
                    });
                }
                Err(error) => {
                    error!(%error, "accept failed");
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<EventRouter>,
    heartbeat_interval: Duration,
) -> Result<(), ServerError> {
    let socket = accept_async(stream).await?;
    debug!(%peer, "connection open");

    let (writer, mut reader) = socket.split();
    let reply = WsReplySink::new(writer);
    let heartbeat = Arc::new(Heartbeat::new());

    let ping_task = tokio::spawn(heartbeat_loop(
        reply.clone(),
        heartbeat.clone(),
        heartbeat_interval,
        peer,
    ));

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!(%peer, len = text.len(), "got frame");
                match serde_json::from_str::<InboundEnvelope>(&text) {
                    Ok(envelope) => router.dispatch(envelope, &reply).await,
                    Err(error) => {
                        warn!(%peer, %error, "malformed frame");
                        send_error_reply(&reply, format!("malformed frame: {error}")).await;
                    }
                }
            }
            Ok(Message::Pong(_)) => heartbeat.pong_received(),
            // The library answers inbound pings itself.
            Ok(Message::Ping(_)) => {}
            Ok(Message::Close(close_frame)) => {
                warn!(%peer, frame = ?close_frame, "connection closed by peer");
                break;
            }
            Ok(Message::Binary(_)) => debug!(%peer, "ignoring binary frame"),
            Ok(Message::Frame(_)) => {}
            Err(error) => {
                error!(%peer, %error, "socket error");
                break;
            }
        }
    }

    ping_task.abort();
    debug!(%peer, "connection closed");
    Ok(())
}

/// Ping on a fixed interval; a tick without an intervening pong means the
/// peer is gone, so stop pinging and close the connection.
async fn heartbeat_loop(
    reply: WsReplySink,
    heartbeat: Arc<Heartbeat>,
    interval: Duration,
    peer: SocketAddr,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick of a tokio interval fires immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match heartbeat.tick() {
            HeartbeatTick::SendPing => {
                if reply.send_message(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            HeartbeatTick::ConnectionDead => {
                warn!(%peer, "no pong within heartbeat interval, closing connection");
                let _ = reply.send_message(Message::Close(None)).await;
                break;
            }
        }
    }
}
