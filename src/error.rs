//! Error types for ws-relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_relay::{Result, ChannelBuilder};
//!
//! fn example() -> Result<()> {
//!     let channel = ChannelBuilder::new().open()?; // Error::Config: no endpoint
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidEndpoint`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::WebSocket`] |
//! | Payload | [`Error::Decode`] |
//! | External | [`Error::Io`], [`Error::Json`] |
//!
//! Transport failures observed by a live channel are never surfaced through
//! this type: the channel treats them uniformly as close events and feeds
//! them to its retry policy. A [`Error::Decode`] is isolated to the single
//! frame that produced it; the channel logs it, drops the frame, and stays
//! open.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a builder is missing required configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Endpoint could not be resolved to a connectable URL.
    ///
    /// Returned when the host/path combination does not form a valid
    /// `ws://` or `wss://` address.
    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint {
        /// The offending endpoint text.
        endpoint: String,
        /// Description of what made it invalid.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when a connection or upgrade cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The component has been shut down.
    ///
    /// Returned when an operation is issued after explicit teardown.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Payload Errors
    // ========================================================================
    /// Inbound frame could not be decoded as JSON.
    ///
    /// Isolated per message: the channel drops the frame and stays open.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a decode error.
    #[inline]
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_) | Self::Io(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry; the channel's retry policy
    /// covers exactly this class. Configuration and decode errors do not
    /// become valid by waiting.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::WebSocket(_) | Self::Io(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
