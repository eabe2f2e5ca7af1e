//! WebSocket push server with fan-out publish.
//!
//! The broadcaster binds one port, accepts clients on the well-known
//! update path, and forwards every published frame to each of them. Frames
//! are serialized once per publish; the per-client forwarding tasks clone
//! out of a broadcast queue.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::endpoint::DEFAULT_PATH;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frames buffered per client before a slow one starts losing updates.
const FANOUT_CAPACITY: usize = 64;

// ============================================================================
// ClientId
// ============================================================================

/// Identifier of one connected client, unique per broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

// ============================================================================
// Fanout
// ============================================================================

/// What the forwarding tasks receive from the publish side.
#[derive(Debug, Clone)]
enum Fanout {
    /// One serialized frame for every client.
    Frame(String),
    /// Close every client connection.
    Shutdown,
}

// ============================================================================
// Broadcaster
// ============================================================================

/// WebSocket push server fanning published state out to every client.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use ws_relay::Broadcaster;
///
/// # async fn example() -> ws_relay::Result<()> {
/// let server = Broadcaster::local().await?;
/// println!("Serving updates on {}", server.ws_url());
///
/// let delivered = server.publish(&json!({"type": "state_update"}))?;
/// println!("Reached {delivered} client(s)");
///
/// server.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Broadcaster {
    /// Port the server is bound to.
    port: u16,

    /// Fan-out queue feeding the per-client forwarding tasks.
    fanout: broadcast::Sender<Fanout>,

    /// Connected clients by id.
    clients: RwLock<FxHashMap<ClientId, SocketAddr>>,

    /// Source of client ids.
    next_client: AtomicU64,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// Broadcaster - Constructor
// ============================================================================

impl Broadcaster {
    /// Creates a broadcaster on `localhost:0` (random available port).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn local() -> Result<Arc<Self>> {
        Self::bind(DEFAULT_BIND_IP, 0).await
    }

    /// Creates a broadcaster bound to a specific IP and port.
    ///
    /// Use port 0 to let the OS assign a random available port. Spawns the
    /// accept loop before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Arc<Self>> {
        let addr = SocketAddr::new(ip, port);
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        debug!(port = actual_port, "Broadcaster bound");

        let (fanout, _) = broadcast::channel(FANOUT_CAPACITY);

        let broadcaster = Arc::new(Self {
            port: actual_port,
            fanout,
            clients: RwLock::new(FxHashMap::default()),
            next_client: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });

        let broadcaster_clone = Arc::clone(&broadcaster);
        tokio::spawn(async move {
            broadcaster_clone.accept_loop(listener).await;
        });

        info!(port = actual_port, "Broadcaster started");

        Ok(broadcaster)
    }
}

// ============================================================================
// Broadcaster - Public API
// ============================================================================

impl Broadcaster {
    /// Returns the WebSocket URL clients should connect to.
    ///
    /// Format: `ws://127.0.0.1:{port}/__ws__`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}{}", self.port, DEFAULT_PATH)
    }

    /// Returns the port the broadcaster is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the number of connected clients.
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Publishes one JSON payload to every connected client.
    ///
    /// Serializes once; returns how many clients were subscribed at publish
    /// time. Zero clients is not an error.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] after [`Broadcaster::shutdown`]
    /// - [`Error::Json`] if the payload fails to serialize
    pub fn publish(&self, payload: &Value) -> Result<usize> {
        let frame = serde_json::to_string(payload)?;
        self.publish_raw(frame)
    }

    /// Publishes one pre-serialized frame verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] after [`Broadcaster::shutdown`].
    pub fn publish_raw(&self, frame: impl Into<String>) -> Result<usize> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }

        Ok(self.fanout.send(Fanout::Frame(frame.into())).unwrap_or(0))
    }

    /// Shuts the broadcaster down.
    ///
    /// Stops accepting, closes every client connection, and fails later
    /// publishes. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        info!(port = self.port, "Broadcaster shutting down");
        let _ = self.fanout.send(Fanout::Shutdown);
    }
}

// ============================================================================
// Broadcaster - Accept Loop
// ============================================================================

impl Broadcaster {
    /// Background task that accepts new clients.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking the shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let broadcaster = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = broadcaster.handle_client(stream, addr).await {
                            warn!(error = %e, ?addr, "Client handling failed");
                        }
                    });
                }

                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }

                Err(_) => {
                    // Timeout - just continue to check shutdown flag
                    continue;
                }
            }
        }

        debug!("Accept loop terminated");
    }

    /// Serves a single client until it disconnects or the broadcaster
    /// shuts down.
    async fn handle_client(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        // Subscribe before registering, so a publisher that observes the
        // registration cannot race past this client's queue.
        let mut fanout_rx = self.fanout.subscribe();

        let id = ClientId(self.next_client.fetch_add(1, Ordering::SeqCst) + 1);
        self.clients.write().insert(id, addr);
        info!(client = %id, ?addr, "Client connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();

        let reason = loop {
            tokio::select! {
                fanout = fanout_rx.recv() => {
                    match fanout {
                        Ok(Fanout::Frame(frame)) => {
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                warn!(client = %id, error = %e, "Forward failed");
                                break "send failed";
                            }
                        }

                        Ok(Fanout::Shutdown) | Err(broadcast::error::RecvError::Closed) => {
                            let _ = ws_write.close().await;
                            break "shutdown";
                        }

                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(client = %id, skipped, "Client lagging, frames dropped");
                        }
                    }
                }

                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Close(_))) | None => break "closed by client",

                        Some(Err(e)) => {
                            warn!(client = %id, error = %e, "Client transport error");
                            break "transport error";
                        }

                        // Inbound frames carry nothing; this is a push-only
                        // endpoint.
                        Some(Ok(_)) => {}
                    }
                }
            }
        };

        self.clients.write().remove(&id);
        debug!(client = %id, reason, "Client disconnected");

        Ok(())
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("port", &self.port)
            .field("clients", &self.client_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::time::sleep;
    use tokio_tungstenite::connect_async;

    async fn wait_for_clients(server: &Broadcaster, count: usize) {
        timeout(Duration::from_secs(5), async {
            while server.client_count() != count {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client count never settled");
    }

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = Broadcaster::local().await.expect("bind");
        assert!(server.port() > 0);
        assert_eq!(server.client_count(), 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_ws_url_format() {
        let server = Broadcaster::local().await.expect("bind");
        let expected = format!("ws://127.0.0.1:{}/__ws__", server.port());
        assert_eq!(server.ws_url(), expected);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_publish_without_clients() {
        let server = Broadcaster::local().await.expect("bind");
        let delivered = server.publish(&json!({"type": "ping"})).expect("publish");
        assert_eq!(delivered, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_fan_out_to_multiple_clients() {
        let server = Broadcaster::local().await.expect("bind");

        let (mut first, _) = connect_async(server.ws_url()).await.expect("connect");
        let (mut second, _) = connect_async(server.ws_url()).await.expect("connect");
        wait_for_clients(&server, 2).await;

        let payload = json!({"type": "state_update", "revision": 3});
        let delivered = server.publish(&payload).expect("publish");
        assert_eq!(delivered, 2);

        for client in [&mut first, &mut second] {
            let message = timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timely frame")
                .expect("open stream")
                .expect("frame");

            let Message::Text(text) = message else {
                panic!("expected text frame, got {message:?}");
            };
            assert_eq!(
                serde_json::from_str::<Value>(text.as_str()).expect("json"),
                payload
            );
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_publish_raw_delivers_verbatim() {
        let server = Broadcaster::local().await.expect("bind");

        let (mut client, _) = connect_async(server.ws_url()).await.expect("connect");
        wait_for_clients(&server, 1).await;

        server.publish_raw("not-json").expect("publish raw");

        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timely frame")
            .expect("open stream")
            .expect("frame");

        let Message::Text(text) = message else {
            panic!("expected text frame, got {message:?}");
        };
        assert_eq!(text.as_str(), "not-json");

        server.shutdown();
    }

    #[tokio::test]
    async fn test_client_count_tracks_disconnects() {
        let server = Broadcaster::local().await.expect("bind");

        let (mut client, _) = connect_async(server.ws_url()).await.expect("connect");
        wait_for_clients(&server, 1).await;

        client.close(None).await.expect("close");
        wait_for_clients(&server, 0).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_fails() {
        let server = Broadcaster::local().await.expect("bind");
        server.shutdown();

        let err = server.publish(&json!({})).unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_clients() {
        let server = Broadcaster::local().await.expect("bind");

        let (mut client, _) = connect_async(server.ws_url()).await.expect("connect");
        wait_for_clients(&server, 1).await;

        server.shutdown();

        // The client sees an orderly close.
        let outcome = timeout(Duration::from_secs(5), async {
            while let Some(message) = client.next().await {
                if matches!(message, Ok(Message::Close(_)) | Err(_)) {
                    break;
                }
            }
        })
        .await;
        assert!(outcome.is_ok(), "client never saw the close");
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let server = Broadcaster::local().await.expect("bind");
        server.shutdown();
        server.shutdown();
    }

    #[test]
    fn test_client_id_display() {
        assert_eq!(ClientId(7).to_string(), "client-7");
        assert_eq!(ClientId(7).get(), 7);
    }
}
