//! Shared helpers for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use webrtc_broker::{LocalEndpoint, ServerConfig, SignalServer, StreamRegistry};

/// Build a browser-style publish offer for `stream` with opus audio and
/// VP8 video (plus its RTX companion)
pub fn publish_offer(stream: &str) -> String {
    [
        "v=0",
        "o=- 1209384756 2 IN IP4 127.0.0.1",
        "s=-",
        "t=0 0",
        "a=group:BUNDLE a v",
        format!("a=msid-semantic: WMS {}", stream).as_str(),
        "m=audio 9 UDP/TLS/RTP/SAVPF 111",
        "c=IN IP4 0.0.0.0",
        "a=ice-ufrag:Xk2q",
        "a=ice-pwd:Qm8cTn0pWz4rLs6vHy1bJd3e",
        "a=fingerprint:sha-256 0F:1E:2D:3C:4B:5A:69:78:87:96:A5:B4:C3:D2:E1:F0:0F:1E:2D:3C:4B:5A:69:78:87:96:A5:B4:C3:D2:E1:F0",
        "a=setup:actpass",
        "a=mid:a",
        "a=sendonly",
        format!("a=msid:{} mic", stream).as_str(),
        "a=rtcp-mux",
        "a=rtpmap:111 opus/48000/2",
        "a=ssrc:5001 cname:browser",
        "m=video 9 UDP/TLS/RTP/SAVPF 96 97",
        "c=IN IP4 0.0.0.0",
        "a=ice-ufrag:Xk2q",
        "a=ice-pwd:Qm8cTn0pWz4rLs6vHy1bJd3e",
        "a=fingerprint:sha-256 0F:1E:2D:3C:4B:5A:69:78:87:96:A5:B4:C3:D2:E1:F0:0F:1E:2D:3C:4B:5A:69:78:87:96:A5:B4:C3:D2:E1:F0",
        "a=setup:actpass",
        "a=mid:v",
        "a=sendonly",
        format!("a=msid:{} camera", stream).as_str(),
        "a=rtcp-mux",
        "a=rtpmap:96 VP8/90000",
        "a=rtcp-fb:96 nack pli",
        "a=rtpmap:97 rtx/90000",
        "a=fmtp:97 apt=96",
        "a=ssrc-group:FID 6001 6002",
        "a=ssrc:6001 cname:browser",
        "a=ssrc:6002 cname:browser",
        "",
    ]
    .join("\r\n")
}

/// Receive-only offer for audio and video
pub fn watch_offer() -> String {
    [
        "v=0",
        "o=- 998877 2 IN IP4 127.0.0.1",
        "s=-",
        "t=0 0",
        "a=ice-ufrag:w4tc",
        "a=ice-pwd:Rr5tYy7uIi9oPp1aSs3dFf5g",
        "a=fingerprint:sha-256 AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89",
        "m=audio 9 UDP/TLS/RTP/SAVPF 111",
        "c=IN IP4 0.0.0.0",
        "a=mid:0",
        "a=recvonly",
        "a=rtpmap:111 opus/48000/2",
        "m=video 9 UDP/TLS/RTP/SAVPF 96",
        "c=IN IP4 0.0.0.0",
        "a=mid:1",
        "a=recvonly",
        "a=rtpmap:96 VP8/90000",
        "",
    ]
    .join("\r\n")
}

/// Running server bound to an ephemeral local port
pub struct TestServer {
    pub server: Arc<SignalServer<LocalEndpoint>>,
    pub addr: SocketAddr,
    pub task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        Self::launch(SignalServer::new(
            config.bind("127.0.0.1:0".parse().unwrap()),
            LocalEndpoint::default(),
        ))
        .await
    }

    /// Start a server that publishes into `registry`
    pub async fn start_sharing(registry: Arc<StreamRegistry>) -> Self {
        Self::launch(SignalServer::with_registry(
            ServerConfig::default().bind("127.0.0.1:0".parse().unwrap()),
            LocalEndpoint::default(),
            registry,
        ))
        .await
    }

    async fn launch(server: SignalServer<LocalEndpoint>) -> Self {
        let server = Arc::new(server);
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serving = Arc::clone(&server);
        let task = tokio::spawn(async move {
            serving
                .serve(listener, std::future::pending())
                .await
                .unwrap();
        });

        Self { server, addr, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn channel_url(&self) -> String {
        self.url("/channel")
    }

    /// Poll until the registry holds `count` streams
    pub async fn wait_for_streams(&self, count: usize) {
        for _ in 0..100 {
            if self.server.registry().stream_count().await == count {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!(
            "registry never reached {} streams (has {})",
            count,
            self.server.registry().stream_count().await
        );
    }
}
