//! Channel handle and status machine.
//!
//! A [`Channel`] is a cheap, cloneable handle over the supervisor task that
//! owns the actual transport stream. All state transitions happen on that
//! task; the handle only reads status, requests teardown, and holds the
//! handler slot the supervisor delivers into.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::message::Notification;

use super::retry::RetryPolicy;
use super::supervisor::Supervisor;

// ============================================================================
// Types
// ============================================================================

/// Message handler callback type.
///
/// Called once per decoded inbound message, from the channel's supervisor
/// task. The callback runs while the channel holds its handler lock, which
/// is what lets [`Channel::close`] guarantee no invocation begins after it
/// returns — so the callback must not call `close` on its own channel, and
/// should hand off long-running work rather than block.
pub type MessageHandler = Arc<dyn Fn(Notification) + Send + Sync>;

/// Internal commands for the supervisor task.
pub(crate) enum ChannelCommand {
    /// Tear the channel down.
    Shutdown,
}

// ============================================================================
// Status
// ============================================================================

/// Connection status of a channel.
///
/// `Disconnected -> Connecting -> Connected -> Disconnected` cycles for the
/// life of the channel; `Closing` and the terminal `Closed` are reachable
/// only via [`Channel::close`] (or dropping every handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No live transport; a retry may be pending.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Transport established; messages flow to the handler.
    Connected,
    /// Teardown requested, supervisor winding down.
    Closing,
    /// Terminal: transport closed, no retry pending.
    Closed,
}

impl Status {
    /// Returns the status name for logs.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ChannelShared
// ============================================================================

/// State shared between the handle and the supervisor task.
pub(crate) struct ChannelShared {
    /// Event name stamped on every notification.
    pub(crate) event: String,
    /// Current connection status.
    status: Mutex<Status>,
    /// Handler slot; cleared on close so no delivery can start afterwards.
    pub(crate) handler: Mutex<Option<MessageHandler>>,
    /// Set once teardown is requested; checked before every (re)connect.
    closing: AtomicBool,
}

impl ChannelShared {
    pub(crate) fn new(event: String, handler: MessageHandler) -> Self {
        Self {
            event,
            status: Mutex::new(Status::Disconnected),
            handler: Mutex::new(Some(handler)),
            closing: AtomicBool::new(false),
        }
    }

    /// Returns `true` once teardown has been requested.
    #[inline]
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub(crate) fn request_close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn status(&self) -> Status {
        *self.status.lock()
    }

    /// Applies a supervisor-driven transition.
    ///
    /// Once teardown has been requested only the terminal `Closed` state may
    /// be written, so a racing connect cannot resurrect the status.
    pub(crate) fn transition(&self, next: Status) {
        let mut status = self.status.lock();
        if self.is_closing() && next != Status::Closed {
            return;
        }
        *status = next;
    }

    /// Moves the public status to `Closing` unless already terminal.
    fn transition_to_closing(&self) {
        let mut status = self.status.lock();
        if *status != Status::Closed {
            *status = Status::Closing;
        }
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Handle to a reconnecting WebSocket channel.
///
/// Owns at most one live transport at a time; on any disconnect the channel
/// retries after its policy delay until [`Channel::close`] is called.
/// Cloning the handle is cheap; the channel tears down when `close` is
/// called on any clone, or when the last clone is dropped.
///
/// # Example
///
/// ```no_run
/// use ws_relay::{Channel, Endpoint};
///
/// # async fn example() {
/// let channel = Channel::open(Endpoint::insecure("127.0.0.1:4680"), |notification| {
///     println!("{}", notification.action);
/// });
///
/// // ... later, on unmount:
/// channel.close();
/// # }
/// ```
pub struct Channel {
    /// Unique identifier, for log correlation.
    id: Uuid,
    /// State shared with the supervisor.
    shared: Arc<ChannelShared>,
    /// Command channel into the supervisor.
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
}

impl Clone for Channel {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Arc::clone(&self.shared),
            command_tx: self.command_tx.clone(),
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("event", &self.shared.event)
            .field("status", &self.status())
            .finish()
    }
}

impl Channel {
    /// Opens a channel to `endpoint`, delivering each decoded message to
    /// `on_message`.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// spawned supervisor task, and connection failures surface through the
    /// same retry path as any later disconnect. Never fails synchronously.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn open(
        endpoint: Endpoint,
        on_message: impl Fn(Notification) + Send + Sync + 'static,
    ) -> Self {
        Self::spawn(
            endpoint,
            super::builder::DEFAULT_EVENT.to_string(),
            RetryPolicy::default(),
            Arc::new(on_message),
        )
    }

    /// Spawns the supervisor task and returns the handle.
    pub(crate) fn spawn(
        endpoint: Endpoint,
        event: String,
        retry: RetryPolicy,
        handler: MessageHandler,
    ) -> Self {
        let id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ChannelShared::new(event, handler));

        let supervisor = Supervisor::new(id, endpoint, retry, Arc::clone(&shared));
        tokio::spawn(supervisor.run(command_rx));

        debug!(channel = %id, "Channel opened");

        Self {
            id,
            shared,
            command_tx,
        }
    }

    /// Returns the channel's unique identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the event name stamped on notifications.
    #[inline]
    #[must_use]
    pub fn event(&self) -> &str {
        &self.shared.event
    }

    /// Returns the current connection status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// Returns `true` if the transport is currently established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == Status::Connected
    }

    /// Tears the channel down.
    ///
    /// Closes the live transport if present and cancels any pending retry.
    /// After this returns, no further connection attempts occur and no
    /// handler invocation can begin. Idempotent.
    pub fn close(&self) {
        self.shared.request_close();

        // Clearing the slot under its lock waits out any in-flight delivery.
        self.shared.handler.lock().take();

        self.shared.transition_to_closing();

        let _ = self.command_tx.send(ChannelCommand::Shutdown);
        debug!(channel = %self.id, "Channel close requested");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::time::{sleep, timeout};

    use crate::server::Broadcaster;

    async fn wait_for_status(channel: &Channel, expected: Status) {
        timeout(Duration::from_secs(5), async {
            while channel.status() != expected {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "status never reached {expected}, still {}",
                channel.status()
            )
        });
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Connected.to_string(), "connected");
        assert_eq!(Status::Closed.to_string(), "closed");
    }

    #[tokio::test]
    async fn test_open_reaches_connected() {
        let server = Broadcaster::local().await.expect("bind");
        let endpoint = crate::Endpoint::parse(&server.ws_url()).expect("endpoint");

        let channel = Channel::open(endpoint, |_| {});
        wait_for_status(&channel, Status::Connected).await;

        channel.close();
        wait_for_status(&channel, Status::Closed).await;
        server.shutdown();
    }

    #[tokio::test]
    async fn test_close_immediately_after_open() {
        let server = Broadcaster::local().await.expect("bind");
        let endpoint = crate::Endpoint::parse(&server.ws_url()).expect("endpoint");

        let invoked = Arc::new(AtomicBool::new(false));
        let invoked_flag = Arc::clone(&invoked);

        let channel = Channel::open(endpoint, move |_| {
            invoked_flag.store(true, Ordering::SeqCst);
        });

        // Teardown before the connection has a chance to establish.
        channel.close();
        wait_for_status(&channel, Status::Closed).await;

        // Anything published afterwards must never reach the handler.
        let _ = server.publish(&json!({"type": "ping"}));
        sleep(Duration::from_millis(200)).await;

        assert!(!invoked.load(Ordering::SeqCst), "handler invoked after close");
        assert_eq!(channel.status(), Status::Closed);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let server = Broadcaster::local().await.expect("bind");
        let endpoint = crate::Endpoint::parse(&server.ws_url()).expect("endpoint");

        let channel = Channel::open(endpoint, |_| {});
        wait_for_status(&channel, Status::Connected).await;

        channel.close();
        channel.close();
        wait_for_status(&channel, Status::Closed).await;
        server.shutdown();
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let server = Broadcaster::local().await.expect("bind");
        let endpoint = crate::Endpoint::parse(&server.ws_url()).expect("endpoint");

        let channel = Channel::open(endpoint, |_| {});
        let clone = channel.clone();
        assert_eq!(channel.id(), clone.id());

        wait_for_status(&channel, Status::Connected).await;
        clone.close();
        wait_for_status(&channel, Status::Closed).await;
        server.shutdown();
    }

    #[tokio::test]
    async fn test_dropping_all_handles_tears_down() {
        let server = Broadcaster::local().await.expect("bind");
        let endpoint = crate::Endpoint::parse(&server.ws_url()).expect("endpoint");

        let channel = Channel::open(endpoint, |_| {});
        wait_for_status(&channel, Status::Connected).await;
        drop(channel);

        // The supervisor sees its command channel close and winds down.
        timeout(Duration::from_secs(5), async {
            while server.client_count() > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client never disconnected");
        server.shutdown();
    }
}
