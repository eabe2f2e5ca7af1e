//! Connect/read/retry event loop.
//!
//! The supervisor is a single tokio task that exclusively owns the
//! transport stream: it connects, drives the read loop, and re-arms a
//! cancelable retry timer after every disconnect. Because the loop is
//! strictly sequential, at most one live transport can exist per channel,
//! and a new attempt is only issued after the previous stream is gone.
//!
//! Every failure mode — refused connection, network drop, transport error,
//! server-initiated close — funnels into the same path: transition to
//! `Disconnected`, wait out the retry delay, reconnect. Nothing is surfaced
//! to the caller as an error; availability wins.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::message::{Notification, decode_frame};

use super::core::{ChannelCommand, ChannelShared, Status};
use super::retry::RetryPolicy;

// ============================================================================
// Types
// ============================================================================

/// Client-side transport stream.
type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the read loop ended.
enum Disconnect {
    /// Remote close, transport error, or end of stream: feed the retry path.
    Remote,
    /// Explicit teardown: stop the supervisor.
    Shutdown,
}

// ============================================================================
// Supervisor
// ============================================================================

/// Owns the transport and serializes every state transition of one channel.
pub(crate) struct Supervisor {
    /// Channel identifier, for log correlation.
    id: Uuid,
    /// Endpoint re-resolved on every attempt.
    endpoint: Endpoint,
    /// Delay schedule between attempts.
    retry: RetryPolicy,
    /// State shared with the handle.
    shared: Arc<ChannelShared>,
}

impl Supervisor {
    /// Creates a supervisor for one channel.
    pub(crate) fn new(
        id: Uuid,
        endpoint: Endpoint,
        retry: RetryPolicy,
        shared: Arc<ChannelShared>,
    ) -> Self {
        Self {
            id,
            endpoint,
            retry,
            shared,
        }
    }

    /// Runs until teardown: connect, read, retry.
    pub(crate) async fn run(self, mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>) {
        let mut attempt: u32 = 0;

        loop {
            if self.shared.is_closing() {
                break;
            }

            self.shared.transition(Status::Connecting);

            match self.connect().await {
                Ok(transport) => {
                    if self.shared.is_closing() {
                        // Teardown raced the handshake; discard the fresh stream.
                        let mut transport = transport;
                        let _ = transport.close(None).await;
                        break;
                    }

                    attempt = 0;
                    self.shared.transition(Status::Connected);
                    debug!(channel = %self.id, host = self.endpoint.host(), "Connected");

                    match self.drive(transport, &mut command_rx).await {
                        Disconnect::Shutdown => break,
                        Disconnect::Remote => self.shared.transition(Status::Disconnected),
                    }
                }

                Err(e) => {
                    warn!(channel = %self.id, error = %e, "Connection attempt failed");
                    self.shared.transition(Status::Disconnected);
                }
            }

            if self.shared.is_closing() {
                break;
            }

            attempt = attempt.saturating_add(1);
            let delay = self.retry.delay_for(attempt);
            trace!(
                channel = %self.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retry scheduled"
            );

            // The sleep must lose to Shutdown, or a retry could fire after
            // teardown.
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Shutdown) | None => break,
                    }
                }
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.shared.transition(Status::Closed);
        debug!(channel = %self.id, "Supervisor terminated");
    }

    /// Resolves the endpoint and performs one connection attempt.
    async fn connect(&self) -> Result<Transport> {
        let url = self.endpoint.resolve()?;
        trace!(channel = %self.id, url = %url, "Connecting");

        let (transport, _response) = connect_async(url.as_str()).await?;
        Ok(transport)
    }

    /// Reads frames until disconnect or teardown.
    async fn drive(
        &self,
        transport: Transport,
        command_rx: &mut mpsc::UnboundedReceiver<ChannelCommand>,
    ) -> Disconnect {
        let (mut ws_write, mut ws_read) = transport.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),

                        Some(Ok(Message::Close(_))) => {
                            debug!(channel = %self.id, "Closed by remote");
                            return Disconnect::Remote;
                        }

                        Some(Err(e)) => {
                            warn!(channel = %self.id, error = %e, "Transport error");
                            return Disconnect::Remote;
                        }

                        None => {
                            debug!(channel = %self.id, "Stream ended");
                            return Disconnect::Remote;
                        }

                        // Binary, Ping, Pong carry no state updates
                        Some(Ok(_)) => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Shutdown) | None => {
                            let _ = ws_write.close().await;
                            return Disconnect::Shutdown;
                        }
                    }
                }
            }
        }
    }

    /// Decodes one frame and delivers it, or drops it on decode failure.
    fn dispatch(&self, raw: &str) {
        match decode_frame(raw) {
            Ok(payload) => {
                let handler = self.shared.handler.lock();
                if let Some(ref handler) = *handler {
                    handler(Notification::new(self.shared.event.clone(), payload));
                }
            }

            Err(e) => {
                warn!(channel = %self.id, error = %e, "Dropping malformed frame");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
