//! Signaling server listener
//!
//! Handles the TCP accept loop, upgrades connections on the channel path to
//! WebSocket and runs one [`SignalingSession`] task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::tungstenite::handshake::server::{
    Callback, ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{Error, Result};
use crate::protocol::WsChannel;
use crate::registry::StreamRegistry;
use crate::sdp::Capabilities;
use crate::server::config::ServerConfig;
use crate::session::{SessionContext, SignalingSession};
use crate::stats::{ServerCounters, ServerStats};
use crate::transport::Endpoint;

/// WebSocket signaling server
pub struct SignalServer<E: Endpoint> {
    config: ServerConfig,
    endpoint: Arc<E>,
    registry: Arc<StreamRegistry>,
    capabilities: Arc<Capabilities>,
    counters: Arc<ServerCounters>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl<E: Endpoint> SignalServer<E> {
    /// Create a new server with the given configuration and media endpoint
    pub fn new(config: ServerConfig, endpoint: E) -> Self {
        Self::with_registry(config, endpoint, Arc::new(StreamRegistry::new()))
    }

    /// Create a new server sharing an existing stream registry
    pub fn with_registry(config: ServerConfig, endpoint: E, registry: Arc<StreamRegistry>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            endpoint: Arc::new(endpoint),
            registry,
            capabilities: Arc::new(Capabilities::default()),
            counters: Arc::new(ServerCounters::new()),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the codec capability set used for answers
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Arc::new(capabilities);
        self
    }

    /// Get a reference to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Snapshot of server-wide counters
    pub async fn stats(&self) -> ServerStats {
        self.counters.snapshot(self.registry.stream_count().await)
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Stop accepting and cancel every session
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run the server
    ///
    /// This method blocks until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(Error::from)
    }

    /// Serve connections from an already bound listener
    ///
    /// On shutdown every session is cancelled and awaited before returning.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            path = %self.config.channel_path,
            "Signaling server listening"
        );

        tokio::select! {
            _ = shutdown => tracing::info!("Shutdown signal received"),
            _ = self.cancel.cancelled() => tracing::info!("Shutdown requested"),
            _ = self.accept_loop(&listener) => {}
        }

        drop(listener);
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        tracing::info!(addr = %addr, "Signaling server stopped");
        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.counters.connection_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let connection = Connection {
            ctx: SessionContext::new(session_id, peer_addr),
            config: self.config.clone(),
            endpoint: Arc::clone(&self.endpoint),
            registry: Arc::clone(&self.registry),
            capabilities: Arc::clone(&self.capabilities),
            counters: Arc::clone(&self.counters),
            cancel: self.cancel.child_token(),
            _permit: permit,
        };

        self.tracker.spawn(connection.run(socket));
    }
}

/// Everything a connection task owns
struct Connection<E: Endpoint> {
    ctx: SessionContext,
    config: ServerConfig,
    endpoint: Arc<E>,
    registry: Arc<StreamRegistry>,
    capabilities: Arc<Capabilities>,
    counters: Arc<ServerCounters>,
    cancel: CancellationToken,
    _permit: Option<OwnedSemaphorePermit>,
}

impl<E: Endpoint> Connection<E> {
    async fn run(self, socket: TcpStream) {
        let session_id = self.ctx.session_id;
        let ws_config = WebSocketConfig {
            max_message_size: Some(self.config.max_message_size),
            max_frame_size: Some(self.config.max_message_size),
            ..Default::default()
        };
        let filter = PathFilter {
            path: self.config.channel_path.clone(),
        };

        let upgrade =
            tokio_tungstenite::accept_hdr_async_with_config(socket, filter, Some(ws_config));
        let ws = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = tokio::time::timeout(self.config.handshake_timeout, upgrade) => match result {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    self.counters.handshake_failed();
                    tracing::debug!(
                        session_id = session_id,
                        error = %e,
                        "WebSocket upgrade failed"
                    );
                    return;
                }
                Err(_) => {
                    self.counters.handshake_failed();
                    tracing::debug!(session_id = session_id, "WebSocket upgrade timed out");
                    return;
                }
            },
        };

        self.counters.connection_opened();

        let mut channel = WsChannel::new(ws);
        let mut session =
            SignalingSession::new(self.ctx, self.endpoint, self.registry, self.capabilities);
        session.run(&mut channel, self.cancel).await;

        self.counters.connection_closed();
        tracing::debug!(session_id = session_id, "Connection closed");
    }
}

/// Accepts the upgrade only on the channel path
struct PathFilter {
    path: String,
}

impl Callback for PathFilter {
    fn on_request(
        self,
        request: &Request,
        response: Response,
    ) -> std::result::Result<Response, ErrorResponse> {
        if request.uri().path() == self.path {
            return Ok(response);
        }

        tracing::debug!(path = %request.uri().path(), "Rejecting upgrade on unknown path");
        let mut error = ErrorResponse::new(Some("Not Found".to_string()));
        *error.status_mut() = StatusCode::NOT_FOUND;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_tungstenite::tungstenite::Error as WsError;

    use super::*;
    use crate::transport::LocalEndpoint;

    async fn start(config: ServerConfig) -> (Arc<SignalServer<LocalEndpoint>>, SocketAddr) {
        let server = Arc::new(SignalServer::new(
            config.bind("127.0.0.1:0".parse().unwrap()),
            LocalEndpoint::default(),
        ));
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = Arc::clone(&server);
        tokio::spawn(async move {
            task.serve(listener, std::future::pending()).await.unwrap();
        });
        (server, addr)
    }

    #[tokio::test]
    async fn test_unknown_path_gets_404() {
        let (server, addr) = start(ServerConfig::default()).await;

        let err = tokio_tungstenite::connect_async(format!("ws://{}/other", addr))
            .await
            .unwrap_err();
        match err {
            WsError::Http(response) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(tokio_tungstenite::connect_async(format!("ws://{}/channel", addr))
            .await
            .is_ok());
        server.shutdown();
    }

    #[tokio::test]
    async fn test_handshake_timeout_counts_failure() {
        let config = ServerConfig::default().handshake_timeout(Duration::from_millis(50));
        let (server, addr) = start(config).await;

        // Connect without sending an upgrade request
        let _socket = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let stats = server.stats().await;
        assert_eq!(stats.failed_handshakes, 1);
        assert_eq!(stats.active_connections, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let (server, addr) = start(ServerConfig::default().max_connections(1)).await;

        let (_first, _) = tokio_tungstenite::connect_async(format!("ws://{}/channel", addr))
            .await
            .unwrap();
        assert!(tokio_tungstenite::connect_async(format!("ws://{}/channel", addr))
            .await
            .is_err());

        let stats = server.stats().await;
        assert_eq!(stats.rejected_connections, 1);
        assert_eq!(stats.active_connections, 1);
        server.shutdown();
    }
}
