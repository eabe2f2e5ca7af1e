//! ws-relay - Auto-reconnecting WebSocket channel for real-time state updates.
//!
//! This library maintains a best-effort persistent logical connection over a
//! transport primitive that has no built-in retry: a [`Channel`] owns one
//! WebSocket connection at a time, decodes each inbound text frame as JSON,
//! and delivers the payload to a registered handler as a tagged
//! [`Notification`]. On any disconnect it retries after a fixed delay (1 s
//! by default) until explicitly closed.
//!
//! # Architecture
//!
//! The wire has two ends:
//!
//! - **Receiving end**: [`Channel`] - connects to `{ws|wss}://<host>/__ws__`,
//!   forwards decoded messages, auto-reconnects. The transport scheme can
//!   mirror the hosting context's own security level, re-derived on every
//!   attempt.
//! - **Push end**: [`Broadcaster`] - accepts any number of clients and fans
//!   each published JSON payload out to all of them.
//!
//! Key design principles:
//!
//! - At most one live transport per channel, exclusively owned by its
//!   supervisor task and replaced wholesale on reconnect
//! - Every transport failure is a close event feeding the retry policy,
//!   never an error surfaced to the caller
//! - A malformed frame is dropped and logged; it cannot tear the channel
//!   down or reach the handler
//! - Explicit teardown cancels the pending retry and bars further handler
//!   invocations
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_relay::{Channel, Endpoint};
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = Channel::open(
//!         Endpoint::insecure("127.0.0.1:4680"),
//!         |notification| println!("{}: {}", notification.event, notification.action),
//!     );
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     channel.close();
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | Reconnecting channel: [`Channel`], [`ChannelBuilder`], [`ChannelHost`] |
//! | [`endpoint`] | Scheme-relative addressing: [`Endpoint`], [`TransportScheme`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`message`] | Frame decoding and the [`Notification`] shape |
//! | [`server`] | Push server: [`Broadcaster`] |

// ============================================================================
// Modules
// ============================================================================

/// Reconnecting channel over a WebSocket transport.
///
/// The core of the crate: [`Channel`] plus its builder, retry policy, and
/// mount/unmount lifecycle adapter.
pub mod channel;

/// Endpoint addressing.
///
/// Scheme-relative addresses whose `ws`/`wss` variant can be re-derived
/// from the hosting context on every connection attempt.
pub mod endpoint;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire payload decoding and the outbound notification shape.
pub mod message;

/// Push server fanning state updates out to connected clients.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{
    Channel, ChannelBuilder, ChannelHost, DEFAULT_EVENT, DEFAULT_RETRY_DELAY, MessageHandler,
    RetryPolicy, Status,
};

// Endpoint types
pub use endpoint::{DEFAULT_PATH, Endpoint, SchemeProbe, SchemeSource, TransportScheme};

// Error types
pub use error::{Error, Result};

// Message types
pub use message::{Notification, decode_frame};

// Server types
pub use server::{Broadcaster, ClientId};
