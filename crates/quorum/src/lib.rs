//! # Quorum
//!
//! A bot client for NodeBB-style realtime forums.
//!
//! Quorum logs in over HTTP, opens the forum's realtime WebSocket channel
//! with the session's identity, hydrates server payloads into typed
//! entities, and routes inbound notifications and chat messages into a
//! pluggable command pipeline.
//!
//! ## Layout
//!
//! - [`quorum_core`]: error taxonomy, payload codec helpers, retry policy.
//! - [`quorum_transport`]: the HTTP session and the realtime channel.
//! - [`quorum_nodebb`]: the NodeBB provider, entities, event routing, and
//!   the plugin host.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quorum::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: ForumConfig = serde_json::from_str(&std::fs::read_to_string("config.json")?)?;
//!     let forum = Forum::new(config, Arc::new(NullDispatch));
//!     forum.login().await?;
//!     forum.activate().await?;
//!
//!     let mut events = forum.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         if let ForumEvent::ChatMessage(message) = event {
//!             println!("<{}> {}", message.from().name(), message.content());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub use quorum_core;
pub use quorum_nodebb;
pub use quorum_transport;

/// Common imports for building a bot.
pub mod prelude {
    pub use quorum_core::{
        ClientError, ClientResult, ParseError, RequestError, TransportError,
    };
    pub use quorum_nodebb::{
        Category, ChatMessage, ChatRoom, Command, CommandContext, CommandDispatch, CoreConfig,
        Forum, ForumConfig, ForumEvent, Notification, NotificationKind, NullDispatch, Plugin,
        PluginFactory, PluginModule, Post, ReplyFn, Topic, User,
    };
    pub use quorum_transport::{ChannelClient, ChannelEvent, Session};
}
