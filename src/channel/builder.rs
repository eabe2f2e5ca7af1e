//! Builder pattern for channel configuration.
//!
//! Provides a fluent API for configuring and opening a [`Channel`].
//!
//! # Example
//!
//! ```no_run
//! use ws_relay::{ChannelBuilder, Endpoint};
//!
//! # async fn example() -> ws_relay::Result<()> {
//! let channel = ChannelBuilder::new()
//!     .endpoint(Endpoint::insecure("127.0.0.1:4680"))
//!     .event("state_update")
//!     .on_message(|notification| println!("{}", notification.action))
//!     .open()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::message::Notification;

use super::core::{Channel, MessageHandler};
use super::retry::RetryPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Default event name stamped on notifications.
pub const DEFAULT_EVENT: &str = "message";

// ============================================================================
// ChannelBuilder
// ============================================================================

/// Builder for configuring a [`Channel`].
///
/// The endpoint and the message handler are required; the event tag and
/// retry policy have defaults ([`DEFAULT_EVENT`], fixed 1 s delay).
///
/// Cloning the builder is cheap, which makes it usable as a reopenable
/// configuration template (see [`super::host::ChannelHost`]).
#[derive(Clone)]
pub struct ChannelBuilder {
    /// Remote endpoint.
    endpoint: Option<Endpoint>,
    /// Message handler.
    handler: Option<MessageHandler>,
    /// Event name stamped on notifications.
    event: String,
    /// Reconnection delay schedule.
    retry: RetryPolicy,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            handler: None,
            event: DEFAULT_EVENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for ChannelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBuilder")
            .field("endpoint", &self.endpoint)
            .field("handler", &self.handler.as_ref().map(|_| ".."))
            .field("event", &self.event)
            .field("retry", &self.retry)
            .finish()
    }
}

// ============================================================================
// ChannelBuilder Implementation
// ============================================================================

impl ChannelBuilder {
    /// Creates a new channel builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the message handler.
    ///
    /// Called once per decoded inbound message. See
    /// [`MessageHandler`] for the constraints on the callback.
    #[inline]
    #[must_use]
    pub fn on_message(mut self, handler: impl Fn(Notification) + Send + Sync + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets the event name stamped on every notification.
    #[inline]
    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Sets the reconnection delay policy.
    #[inline]
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Opens the channel.
    ///
    /// Validation is the only synchronous failure: once this returns `Ok`,
    /// connection establishment and every later failure go through the
    /// channel's asynchronous retry path.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if endpoint or handler is not set.
    pub fn open(self) -> Result<Channel> {
        let endpoint = self.endpoint.ok_or_else(|| {
            Error::config(
                "Endpoint is required. Use .endpoint() to set it.\n\
                 Example: ChannelBuilder::new().endpoint(Endpoint::insecure(\"127.0.0.1:4680\"))",
            )
        })?;

        let handler = self.handler.ok_or_else(|| {
            Error::config(
                "Message handler is required. Use .on_message() to set it.\n\
                 Example: ChannelBuilder::new().on_message(|n| println!(\"{}\", n.action))",
            )
        })?;

        Ok(Channel::spawn(endpoint, self.event, self.retry, handler))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ChannelBuilder::new();
        assert!(builder.endpoint.is_none());
        assert!(builder.handler.is_none());
        assert_eq!(builder.event, DEFAULT_EVENT);
        assert_eq!(builder.retry, RetryPolicy::default());
    }

    #[test]
    fn test_endpoint_sets_value() {
        let builder = ChannelBuilder::new().endpoint(Endpoint::insecure("localhost:9000"));
        assert!(builder.endpoint.is_some());
    }

    #[test]
    fn test_event_overrides_default() {
        let builder = ChannelBuilder::new().event("state_update");
        assert_eq!(builder.event, "state_update");
    }

    #[test]
    fn test_retry_overrides_default() {
        let retry = RetryPolicy::fixed(Duration::from_millis(250));
        let builder = ChannelBuilder::new().retry(retry.clone());
        assert_eq!(builder.retry, retry);
    }

    #[test]
    fn test_open_fails_without_endpoint() {
        let result = ChannelBuilder::new().on_message(|_| {}).open();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Endpoint"));
    }

    #[test]
    fn test_open_fails_without_handler() {
        let result = ChannelBuilder::new()
            .endpoint(Endpoint::insecure("localhost:9000"))
            .open();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("handler"));
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ChannelBuilder::new()
            .endpoint(Endpoint::insecure("localhost:9000"))
            .event("state_update")
            .on_message(|_| {});

        let cloned = builder.clone();
        assert_eq!(cloned.event, builder.event);
        assert!(cloned.handler.is_some());
    }

    #[test]
    fn test_debug_hides_handler() {
        let builder = ChannelBuilder::new().on_message(|_| {});
        let rendered = format!("{builder:?}");
        assert!(rendered.contains(".."));
    }
}
