//! Push server for real-time state updates.
//!
//! The other end of the wire: a WebSocket server that accepts any number of
//! clients and fans serialized JSON state out to all of them. Channels on
//! the receiving side reconnect on their own, so the server never tracks
//! per-client delivery state — a client that drops simply comes back and
//! picks up from the next update.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Broadcaster                │
//! │              (single port)              │
//! │  ┌─────────────────────────────────┐    │
//! │  │ client-1 → forwarding task      │    │
//! │  │ client-2 → forwarding task      │◄───┼── publish(state)
//! │  │ client-3 → forwarding task      │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `broadcaster` | Accept loop, client registry, fan-out publish |

// ============================================================================
// Submodules
// ============================================================================

/// Accept loop, client registry, fan-out publish.
pub mod broadcaster;

// ============================================================================
// Re-exports
// ============================================================================

pub use broadcaster::{Broadcaster, ClientId};
