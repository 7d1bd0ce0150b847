//! Channel transport abstraction for plugin messaging.
//!
//! The host server owns the real transport: frames on a plugin messaging
//! channel ride piggyback on some currently connected player's connection,
//! so delivery is best-effort and sending is impossible while the server is
//! empty. That host capability is modeled as the [`ChannelTransport`]
//! trait.
//!
//! # Testability
//!
//! The trait keeps the bridge independent of any concrete host:
//!
//! - Production hosts implement it over their player connections.
//! - [`mock::MockTransport`] records frames and lets tests deliver inbound
//!   ones by hand.
//! - [`loopback::LoopbackProxy`] simulates the remote proxy for the
//!   headless demo binary and the end-to-end tests.

use std::sync::Arc;

use thiserror::Error;

pub mod loopback;
pub mod mock;

/// Error type for channel-transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connected endpoint exists to carry the frame. This is an expected
    /// idle state (an empty server has nobody to piggyback on), not a
    /// fault; callers skip the send silently.
    #[error("no connected endpoint available to carry the channel message")]
    NoEndpoint,

    /// The transport itself failed.
    #[error("channel transport failure: {0}")]
    Channel(String),
}

/// Receives raw frames delivered on a registered incoming channel.
///
/// The transport may invoke this from any thread, concurrently with sends
/// and with other deliveries; implementations must tolerate arbitrary
/// concurrent callers.
pub trait ChannelListener: Send + Sync {
    /// Called for every frame arriving on any channel the listener is
    /// registered for. `channel` names the channel the frame arrived on.
    fn on_channel_message(&self, channel: &str, payload: &[u8]);
}

/// Host capability for sending and receiving frames on named channels.
pub trait ChannelTransport: Send + Sync {
    /// Sends `payload` on `channel` through one arbitrary currently
    /// connected endpoint. Best-effort: no delivery guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NoEndpoint`] when nothing is connected to
    /// carry the frame.
    fn send(&self, channel: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Declares intent to send on `channel`.
    fn register_outgoing(&self, channel: &str);

    /// Registers `listener` to receive frames arriving on `channel`.
    fn register_incoming(&self, channel: &str, listener: Arc<dyn ChannelListener>);

    /// Revokes the outgoing declaration for `channel`.
    fn unregister_outgoing(&self, channel: &str);

    /// Removes the listener registration for `channel`.
    fn unregister_incoming(&self, channel: &str);
}
