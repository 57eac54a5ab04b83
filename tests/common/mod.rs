//! Shared harness: a full hub (router + WebSocket server) over the
//! in-memory store, on an ephemeral port.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use meterhub_batch::{BatchConfig, Batcher};
use meterhub_core::{BandwidthEnvelope, UuidSource};
use meterhub_ingest::BandwidthAggregator;
use meterhub_server::{ServerConfig, WsServer};
use meterhub_store::{MemoryStore, UsageStore};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestHub {
    pub store: Arc<MemoryStore>,
    pub batcher: Arc<Batcher<BandwidthEnvelope>>,
    pub addr: std::net::SocketAddr,
}

impl TestHub {
    pub async fn start(max_batch_size: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        let aggregator = Arc::new(BandwidthAggregator::new(
            store.clone() as Arc<dyn UsageStore>,
            Arc::new(UuidSource),
        ));
        let batcher = Arc::new(Batcher::new(
            BatchConfig {
                max_batch_size,
                max_delay: Duration::ZERO,
                max_buffered: 10 * max_batch_size,
            },
            aggregator,
        ));

        let router = Arc::new(meterhub_daemon::build_router(
            batcher.clone(),
            store.clone() as Arc<dyn UsageStore>,
        ));
        let server = WsServer::bind(
            ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
                heartbeat_interval: Duration::from_secs(10),
            },
            router,
        )
        .await
        .expect("bind test server");
        let addr = server.local_addr();
        tokio::spawn(server.run());

        Self {
            store,
            batcher,
            addr,
        }
    }

    pub async fn connect(&self) -> WsClient {
        let (client, _) = connect_async(format!("ws://{}", self.addr))
            .await
            .expect("connect to test server");
        client
    }
}

pub async fn send_json(client: &mut WsClient, value: serde_json::Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("send frame");
}

/// Next text frame from the server, skipping control frames.
pub async fn read_text(client: &mut WsClient) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await.expect("connection open") {
                Ok(Message::Text(text)) => return text,
                Ok(_) => continue,
                Err(error) => panic!("socket error: {error}"),
            }
        }
    })
    .await
    .expect("no reply within timeout")
}

pub async fn wait_until(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn bandwidth_payload(node_id: &str, bytes_count: u64) -> serde_json::Value {
    serde_json::json!({
        "nodeId": node_id,
        "timestamp": 100,
        "contentId": "content-1",
        "bytesCount": bytes_count,
        "ip": "10.0.0.1",
    })
}
