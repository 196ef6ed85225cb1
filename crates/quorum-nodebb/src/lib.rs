//! # Quorum NodeBB provider
//!
//! The NodeBB flavor of the Quorum forum bot client: typed domain
//! entities, event routing for notifications and chat, the command
//! dispatch boundary, and the plugin host.
//!
//! The central type is [`Forum`]: it owns the HTTP session and realtime
//! channel (from `quorum-transport`), caches the bot's own and its
//! owner's user records, hosts plugins, and drives the whole activation
//! lifecycle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use quorum_nodebb::{Forum, ForumConfig, NullDispatch};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config: ForumConfig = serde_json::from_str(r#"{
//!     "core": {
//!         "forum": "https://forum.example.com",
//!         "username": "bot",
//!         "password": "secret",
//!         "owner": "accalia"
//!     }
//! }"#)?;
//! let forum = Forum::new(config, Arc::new(NullDispatch));
//! forum.login().await?;
//! forum.activate().await?;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod commands;
pub mod config;
pub mod events;
pub mod forum;
pub mod model;
pub mod notifications;
pub mod plugin;

pub use commands::{Command, CommandContext, CommandDispatch, NullDispatch, ReplyFn};
pub use config::{CoreConfig, ForumConfig};
pub use events::ForumEvent;
pub use forum::Forum;
pub use model::{Category, ChatMessage, ChatRoom, Notification, NotificationKind, Post, Topic, User};
pub use plugin::{Plugin, PluginFactory, PluginModule};
