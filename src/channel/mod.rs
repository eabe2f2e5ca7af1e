//! Reconnecting channel over a WebSocket transport.
//!
//! A [`Channel`] maintains a best-effort persistent logical connection over
//! a transport primitive that has no built-in retry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌─────────────────┐
//! │  Channel (handle)│   Shutdown command       │  Supervisor     │
//! │                  │─────────────────────────►│  (tokio task)   │
//! │  open / close /  │                          │                 │
//! │  status          │   status + handler       │  connect loop   │
//! │                  │◄───── shared state ─────►│  read loop      │
//! └──────────────────┘                          │  retry timer    │
//!                                               └────────┬────────┘
//!                                                        │ one live
//!                                                        ▼ stream at a time
//!                                               {ws|wss}://host/__ws__
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. [`Channel::open`] (or [`ChannelBuilder::open`]) spawns the supervisor,
//!    which immediately attempts a connection
//! 2. On success: status `Connected`, inbound frames decoded and delivered
//!    to the handler
//! 3. On any disconnect — refused, network drop, server close — status
//!    `Disconnected`, then a retry after the policy delay (1 s fixed by
//!    default), forever
//! 4. [`Channel::close`] tears down: live stream closed, pending retry
//!    canceled, terminal status `Closed`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent channel configuration |
//! | `core` | Channel handle, status machine, shared state |
//! | `host` | `start`/`stop` lifecycle adapter |
//! | `retry` | Reconnection delay policy |
//! | `supervisor` | Connect/read/retry event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent channel configuration.
pub mod builder;

/// Channel handle and status machine.
pub mod core;

/// Mount/unmount-style lifecycle adapter.
pub mod host;

/// Reconnection delay policy.
pub mod retry;

/// Connect/read/retry event loop.
mod supervisor;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ChannelBuilder, DEFAULT_EVENT};
pub use core::{Channel, MessageHandler, Status};
pub use host::ChannelHost;
pub use retry::{DEFAULT_RETRY_DELAY, RetryPolicy};
