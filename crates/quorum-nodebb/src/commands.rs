//! The command-dispatch boundary.
//!
//! The client does not implement commands; it hands hydrated inbound
//! events to a [`CommandDispatch`] implementation which resolves them to
//! executable [`Command`]s. Resolving to a command that does nothing is a
//! valid outcome, not an error.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use quorum_core::ClientResult;

use crate::model::Notification;

/// Sends a reply back into the conversation an event originated from.
///
/// For chat-origin commands this forwards into the originating room, with
/// the client's standard rate-limit retry applied.
pub type ReplyFn = Arc<dyn Fn(String) -> BoxFuture<'static, ClientResult<()>> + Send + Sync>;

/// Routing ids handed to the dispatcher with a chat-origin event.
///
/// `post` and `topic` do not apply to chat messages and are always the
/// sentinel -1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Originating post id, or -1.
    pub post: i64,
    /// Originating topic id, or -1.
    pub topic: i64,
    /// Id of the user who triggered the event.
    pub user: i64,
    /// Id of the room the event arrived in, or -1.
    pub pm: i64,
    /// Id of the chat message, or -1.
    pub chat: i64,
}

impl CommandContext {
    /// Context for a chat-origin event.
    pub fn for_chat(user: i64, room: i64, message: i64) -> Self {
        Self {
            post: -1,
            topic: -1,
            user,
            pm: room,
            chat: message,
        }
    }
}

/// A resolved, executable command. Consumed by execution.
#[async_trait]
pub trait Command: Send {
    /// Runs the command.
    async fn execute(self: Box<Self>) -> ClientResult<()>;
}

/// Resolves inbound events to executable commands.
#[async_trait]
pub trait CommandDispatch: Send + Sync {
    /// Resolves a notification to a command.
    async fn from_notification(
        &self,
        notification: &Notification,
    ) -> ClientResult<Box<dyn Command>>;

    /// Resolves a chat message to a command.
    ///
    /// `content` is the raw message markup; `reply` forwards a response
    /// into the originating room.
    async fn from_chat(
        &self,
        context: CommandContext,
        content: &str,
        reply: ReplyFn,
    ) -> ClientResult<Box<dyn Command>>;
}

/// Dispatcher that resolves every event to a no-op command.
pub struct NullDispatch;

struct NoopCommand;

#[async_trait]
impl Command for NoopCommand {
    async fn execute(self: Box<Self>) -> ClientResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CommandDispatch for NullDispatch {
    async fn from_notification(
        &self,
        _notification: &Notification,
    ) -> ClientResult<Box<dyn Command>> {
        Ok(Box::new(NoopCommand))
    }

    async fn from_chat(
        &self,
        _context: CommandContext,
        _content: &str,
        _reply: ReplyFn,
    ) -> ClientResult<Box<dyn Command>> {
        Ok(Box::new(NoopCommand))
    }
}
