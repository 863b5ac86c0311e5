//! End-to-end signaling over real sockets

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use webrtc_broker::sdp::MediaKind;
use webrtc_broker::{
    Error, SessionDescription, SignalingClient, SignalingMessage, StreamRegistry,
};

use common::{publish_offer, watch_offer, TestServer};

#[tokio::test]
async fn test_publish_then_watch() {
    let server = TestServer::start().await;

    let mut publisher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    let answer = publisher.publish(&publish_offer("cam-1")).await.unwrap();
    let answer = SessionDescription::parse(&answer).unwrap();
    assert!(answer.audio().is_some_and(|m| !m.is_rejected()));
    assert!(answer.video().is_some_and(|m| !m.is_rejected()));
    server.wait_for_streams(1).await;

    let mut watcher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    let answer = watcher.watch(&watch_offer(), "cam-1").await.unwrap();
    let answer = SessionDescription::parse(&answer).unwrap();

    let streams = answer.streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].id, "cam-1");
    assert_eq!(streams[0].kinds(), vec![MediaKind::Audio, MediaKind::Video]);

    let stats = server
        .server
        .registry()
        .get_stream_stats("cam-1")
        .await
        .unwrap();
    assert_eq!(stats.id.as_str(), "cam-1");

    publisher.close().await;
    watcher.close().await;
}

#[tokio::test]
async fn test_watch_unknown_stream() {
    let server = TestServer::start().await;

    let mut watcher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    let answer = watcher.watch(&watch_offer(), "nobody").await.unwrap();
    let answer = SessionDescription::parse(&answer).unwrap();

    assert!(answer.streams().is_empty());
    assert_eq!(answer.media.len(), 2);
}

#[tokio::test]
async fn test_wrong_path_rejected() {
    let server = TestServer::start().await;

    let result = SignalingClient::connect(&server.url("/watch/cam-1")).await;
    assert!(matches!(result, Err(Error::Handshake(_))));

    for _ in 0..50 {
        if server.server.stats().await.failed_handshakes == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("failed handshake was not counted");
}

#[tokio::test]
async fn test_disconnect_removes_published_streams() {
    let server = TestServer::start().await;

    let mut publisher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    publisher.publish(&publish_offer("cam-2")).await.unwrap();
    server.wait_for_streams(1).await;

    publisher.close().await;
    server.wait_for_streams(0).await;

    // Watching after the publisher left yields an empty answer
    let mut watcher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    let answer = watcher.watch(&watch_offer(), "cam-2").await.unwrap();
    assert!(SessionDescription::parse(&answer).unwrap().streams().is_empty());
}

#[tokio::test]
async fn test_replaced_publisher_keeps_newer_entry() {
    let server = TestServer::start().await;

    let mut first = SignalingClient::connect(&server.channel_url()).await.unwrap();
    first.publish(&publish_offer("shared")).await.unwrap();
    let first_owner = server.server.registry().lookup("shared").await.unwrap().owner;

    let mut second = SignalingClient::connect(&server.channel_url()).await.unwrap();
    second.publish(&publish_offer("shared")).await.unwrap();
    let second_owner = server.server.registry().lookup("shared").await.unwrap().owner;
    assert_ne!(first_owner, second_owner);

    first.close().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let entry = server.server.registry().lookup("shared").await.unwrap();
    assert_eq!(entry.owner, second_owner);

    second.close().await;
    server.wait_for_streams(0).await;
}

#[tokio::test]
async fn test_servers_sharing_registry_keep_newer_publisher() {
    let registry = Arc::new(StreamRegistry::new());
    let a = TestServer::start_sharing(Arc::clone(&registry)).await;
    let b = TestServer::start_sharing(Arc::clone(&registry)).await;

    // First session on each server, so both publishers carry the same session id
    let mut first = SignalingClient::connect(&a.channel_url()).await.unwrap();
    first.publish(&publish_offer("shared")).await.unwrap();
    let mut second = SignalingClient::connect(&b.channel_url()).await.unwrap();
    second.publish(&publish_offer("shared")).await.unwrap();
    let newer = registry.lookup("shared").await.unwrap();

    first.close().await;
    for _ in 0..50 {
        if a.server.stats().await.active_connections == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(a.server.stats().await.active_connections, 0);

    let current = registry.lookup("shared").await.unwrap();
    assert!(Arc::ptr_eq(&current, &newer));

    second.close().await;
    b.wait_for_streams(0).await;
}

#[tokio::test]
async fn test_unknown_command_keeps_stream_published() {
    let server = TestServer::start().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.channel_url()).await.unwrap();
    let frame = serde_json::json!({ "cmd": "publish-offer", "sdp": publish_offer("cam") });
    ws.send(Message::Text(frame.to_string())).await.unwrap();
    assert!(matches!(ws.next().await, Some(Ok(Message::Text(_)))));
    server.wait_for_streams(1).await;

    let frame = serde_json::json!({ "cmd": "candidate", "sdp": "" });
    ws.send(Message::Text(frame.to_string())).await.unwrap();

    // Give the session time to read the candidate frame
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.server.registry().contains("cam").await);
    assert_eq!(server.server.stats().await.active_connections, 1);

    let mut watcher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    let answer = watcher.watch(&watch_offer(), "cam").await.unwrap();
    assert_eq!(SessionDescription::parse(&answer).unwrap().streams().len(), 1);
}

#[tokio::test]
async fn test_malformed_offer_closes_only_that_session() {
    let server = TestServer::start().await;

    let mut publisher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    publisher.publish(&publish_offer("steady")).await.unwrap();

    let mut broken = SignalingClient::connect(&server.channel_url()).await.unwrap();
    broken
        .send(&SignalingMessage::publish_offer("this is not sdp"))
        .await
        .unwrap();
    assert!(broken.recv().await.is_err());

    assert!(server.server.registry().contains("steady").await);
    let mut watcher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    let answer = watcher.watch(&watch_offer(), "steady").await.unwrap();
    assert_eq!(SessionDescription::parse(&answer).unwrap().streams().len(), 1);
}

#[tokio::test]
async fn test_legacy_command_names() {
    let server = TestServer::start().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.channel_url()).await.unwrap();
    let frame = serde_json::json!({ "cmd": "publish", "sdp": publish_offer("legacy") });
    ws.send(Message::Text(frame.to_string())).await.unwrap();

    match ws.next().await {
        Some(Ok(Message::Text(text))) => {
            let reply = SignalingMessage::from_json(&text).unwrap();
            assert!(reply.sdp.starts_with("v=0"));
        }
        other => panic!("unexpected frame: {:?}", other),
    }
    assert!(server.server.registry().contains("legacy").await);
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let server = TestServer::start().await;

    let mut publisher = SignalingClient::connect(&server.channel_url()).await.unwrap();
    publisher.publish(&publish_offer("cam-3")).await.unwrap();
    server.wait_for_streams(1).await;

    server.server.shutdown();
    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop")
        .unwrap();

    assert!(publisher.recv().await.is_err());
    assert_eq!(server.server.registry().stream_count().await, 0);
    assert_eq!(server.server.stats().await.active_connections, 0);
}
