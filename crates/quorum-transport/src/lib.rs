//! # Quorum Transport
//!
//! Transport layer for the Quorum forum bot client:
//!
//! - **Session** ([`session`]): HTTP login flow with cookie jar and cached
//!   forum configuration.
//! - **Channel** ([`channel`]): the realtime WebSocket channel with
//!   id-correlated requests, named event dispatch, keepalive pings, and
//!   lifecycle notifications.
//!
//! The session produces a [`ChannelIdentity`] that carries its cookies and
//! user agent into the channel handshake, which is how the forum ties the
//! realtime connection to the logged-in user.

pub mod channel;
pub mod session;

pub use channel::{
    Channel, ChannelClient, ChannelEvent, ChannelIdentity, EventHandler, HandlerFuture,
};
pub use session::Session;
