//! Domain events published by the forum client.

use crate::model::{ChatMessage, Notification};

/// Events observable through [`Forum::subscribe`](crate::forum::Forum::subscribe).
///
/// The notification's classification is available via
/// [`Notification::kind`](crate::model::Notification::kind); subscribers
/// that only care about replies or mentions filter on it.
#[derive(Debug, Clone)]
pub enum ForumEvent {
    /// Human-readable progress message (activation, keepalive latency).
    Log(String),
    /// The realtime channel came up.
    Connected,
    /// The realtime channel went down.
    Disconnected,
    /// A notification arrived and was hydrated.
    Notification(Notification),
    /// A chat message arrived and was hydrated.
    ChatMessage(ChatMessage),
}
