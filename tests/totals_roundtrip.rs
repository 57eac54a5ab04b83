//! Read path and protocol-error containment over a live connection.

mod common;

use common::{bandwidth_payload, read_text, send_json, wait_until, TestHub};

#[tokio::test]
async fn test_totals_query_without_statistics_row_reports_zero() {
    let hub = TestHub::start(1000).await;
    let mut client = hub.connect().await;

    send_json(
        &mut client,
        serde_json::json!({
            "type": "BandwidthUploadTotal",
            "payload": {"nodeId": "n1", "timestamp": 200},
        }),
    )
    .await;

    let reply = read_text(&mut client).await;
    assert_eq!(reply, r#"{"nodeId":"n1","timestamp":200,"bytesCount":0}"#);
}

#[tokio::test]
async fn test_totals_reflect_flushed_statistics() {
    let hub = TestHub::start(1).await;
    let mut client = hub.connect().await;

    send_json(
        &mut client,
        serde_json::json!({
            "type": "bandwidthUploadStatistics",
            "payload": bandwidth_payload("n1", 500),
        }),
    )
    .await;
    wait_until(|| hub.store.statistics_row("n1").is_some()).await;

    send_json(
        &mut client,
        serde_json::json!({
            "type": "BandwidthUploadTotal",
            "payload": {"nodeId": "n1", "timestamp": 300},
        }),
    )
    .await;
    let reply = read_text(&mut client).await;
    assert_eq!(reply, r#"{"nodeId":"n1","timestamp":300,"bytesCount":500}"#);

    // Download total for the same node is independent and still zero.
    send_json(
        &mut client,
        serde_json::json!({
            "type": "BandwidthDownloadTotal",
            "payload": {"nodeId": "n1", "timestamp": 301},
        }),
    )
    .await;
    let reply = read_text(&mut client).await;
    assert_eq!(reply, r#"{"nodeId":"n1","timestamp":301,"bytesCount":0}"#);
}

#[tokio::test]
async fn test_consecutive_totals_queries_are_idempotent() {
    let hub = TestHub::start(1).await;
    let mut client = hub.connect().await;

    send_json(
        &mut client,
        serde_json::json!({
            "type": "bandwidthDownloadStatistics",
            "payload": bandwidth_payload("n2", 128),
        }),
    )
    .await;
    wait_until(|| hub.store.statistics_row("n2").is_some()).await;

    let mut replies = Vec::new();
    for _ in 0..2 {
        send_json(
            &mut client,
            serde_json::json!({
                "type": "BandwidthDownloadTotal",
                "payload": {"nodeId": "n2", "timestamp": 1},
            }),
        )
        .await;
        replies.push(read_text(&mut client).await);
    }
    assert_eq!(replies[0], replies[1]);
    assert!(replies[0].contains("\"bytesCount\":128"));
}

#[tokio::test]
async fn test_unknown_type_gets_error_reply_and_connection_survives() {
    let hub = TestHub::start(1000).await;
    let mut client = hub.connect().await;

    send_json(
        &mut client,
        serde_json::json!({"type": "WhitelistedClients", "payload": {}}),
    )
    .await;

    let reply = read_text(&mut client).await;
    let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert!(value["error"]
        .as_str()
        .unwrap()
        .contains("unknown event type: WhitelistedClients"));

    // Same connection keeps serving.
    send_json(
        &mut client,
        serde_json::json!({
            "type": "BandwidthUploadTotal",
            "payload": {"nodeId": "n1", "timestamp": 5},
        }),
    )
    .await;
    let reply = read_text(&mut client).await;
    assert_eq!(reply, r#"{"nodeId":"n1","timestamp":5,"bytesCount":0}"#);
}

#[tokio::test]
async fn test_malformed_frame_gets_error_reply() {
    let hub = TestHub::start(1000).await;
    let mut client = hub.connect().await;

    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;
    client
        .send(Message::Text("this is not json".to_string()))
        .await
        .unwrap();

    let reply = read_text(&mut client).await;
    let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert!(value["error"].as_str().unwrap().contains("malformed frame"));
}

#[tokio::test]
async fn test_handler_payload_mismatch_is_swallowed() {
    let hub = TestHub::start(1000).await;
    let mut client = hub.connect().await;

    // Well-formed envelope, wrong payload shape: contained at the dispatch
    // boundary, no reply owed, connection stays up.
    send_json(
        &mut client,
        serde_json::json!({"type": "BandwidthUpload", "payload": {"nodeId": "n1"}}),
    )
    .await;

    send_json(
        &mut client,
        serde_json::json!({
            "type": "BandwidthUploadTotal",
            "payload": {"nodeId": "n1", "timestamp": 9},
        }),
    )
    .await;
    let reply = read_text(&mut client).await;
    assert_eq!(reply, r#"{"nodeId":"n1","timestamp":9,"bytesCount":0}"#);
}
