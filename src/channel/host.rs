//! Mount/unmount-style lifecycle adapter.
//!
//! UI component hosts tend to hand out paired lifecycle hooks: one callback
//! when the component appears, one when it goes away. [`ChannelHost`] maps
//! that shape onto the channel: `start` on mount, `stop` on unmount, with a
//! cloneable [`ChannelBuilder`] as the configuration template so the pair
//! can cycle any number of times.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::Result;

use super::builder::ChannelBuilder;
use super::core::Channel;

// ============================================================================
// ChannelHost
// ============================================================================

/// Owns at most one active [`Channel`], opened and closed on lifecycle
/// boundaries.
///
/// # Example
///
/// ```no_run
/// use ws_relay::{ChannelBuilder, ChannelHost, Endpoint};
///
/// # async fn example() -> ws_relay::Result<()> {
/// let mut host = ChannelHost::new(
///     ChannelBuilder::new()
///         .endpoint(Endpoint::insecure("127.0.0.1:4680"))
///         .on_message(|notification| println!("{}", notification.action)),
/// );
///
/// host.start()?; // on mount
/// // ...
/// host.stop(); // on unmount
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChannelHost {
    /// Configuration template, reused on every start.
    builder: ChannelBuilder,
    /// The active channel, if started.
    active: Option<Channel>,
}

impl ChannelHost {
    /// Creates a host around a configuration template.
    ///
    /// The builder is validated lazily, on the first [`ChannelHost::start`].
    #[inline]
    #[must_use]
    pub fn new(builder: ChannelBuilder) -> Self {
        Self {
            builder,
            active: None,
        }
    }

    /// Opens the channel if none is active. Idempotent.
    ///
    /// Mount hooks can fire more than once in hot-reloading hosts; a second
    /// `start` must not drop a healthy connection, so it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the template is missing its
    /// endpoint or handler.
    pub fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            debug!("Host already started");
            return Ok(());
        }

        let channel = self.builder.clone().open()?;
        debug!(channel = %channel.id(), "Host started");
        self.active = Some(channel);
        Ok(())
    }

    /// Closes and drops the active channel, if any. Idempotent.
    pub fn stop(&mut self) {
        if let Some(channel) = self.active.take() {
            debug!(channel = %channel.id(), "Host stopping");
            channel.close();
        }
    }

    /// Returns `true` while a channel is active.
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.active.is_some()
    }

    /// Returns the active channel, if started.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Option<&Channel> {
        self.active.as_ref()
    }
}

impl Drop for ChannelHost {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
