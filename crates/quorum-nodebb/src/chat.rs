//! Chat event routing.
//!
//! Subscribes to the forum's chat-receive event. The event payload wraps
//! the message in a `message` field; a payload without it is rejected
//! outright. Present messages are hydrated, published on the domain event
//! bus, and routed through command dispatch with the chat routing context
//! and a reply adaptor bound to the originating room.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use quorum_core::{ClientError, ClientResult};
use quorum_transport::{EventHandler, HandlerFuture};

use crate::commands::{CommandContext, ReplyFn};
use crate::events::ForumEvent;
use crate::forum::Forum;
use crate::model::{ChatMessage, send_to_room};

/// Channel event carrying received chat messages.
pub const EVENT: &str = "event:chats.receive";

const ACTIVATED: &str = "Chat Messages Activated: Now listening for new chat messages";
const DEACTIVATED: &str = "Chat Messages Deactivated: No longer listening for new chat messages";

/// Starts listening for chat messages.
pub fn activate(forum: &Forum) {
    forum.channel().on(EVENT, Arc::new(ChatHandler { forum: forum.clone() }));
    forum.publish(ForumEvent::Log(ACTIVATED.to_string()));
    info!("{ACTIVATED}");
}

/// Stops listening for chat messages.
pub fn deactivate(forum: &Forum) {
    forum.channel().off(EVENT);
    forum.publish(ForumEvent::Log(DEACTIVATED.to_string()));
    info!("{DEACTIVATED}");
}

struct ChatHandler {
    forum: Forum,
}

impl EventHandler for ChatHandler {
    fn handle(&self, payload: Value) -> ClientResult<HandlerFuture> {
        let wrapped = payload
            .get("message")
            .cloned()
            .filter(|value| !value.is_null())
            .ok_or(ClientError::PayloadShape("chat message"))?;
        let message = ChatMessage::parse(wrapped)?;
        debug!(
            id = message.id(),
            room = message.room(),
            from = message.from().id(),
            "Chat message received"
        );

        let forum = self.forum.clone();
        Ok(Box::pin(async move {
            forum.publish(ForumEvent::ChatMessage(message.clone()));

            let context =
                CommandContext::for_chat(message.from().id(), message.room(), message.id());
            let room = message.room();
            let reply_forum = forum.clone();
            let reply: ReplyFn = Arc::new(move |content: String| {
                let forum = reply_forum.clone();
                Box::pin(async move { send_to_room(&forum, room, &content).await })
            });

            let command = forum
                .dispatch()
                .from_chat(context, message.markup(), reply)
                .await?;
            command.execute().await
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::NullDispatch;
    use crate::config::ForumConfig;
    use serde_json::json;

    fn forum() -> Forum {
        let config: ForumConfig = serde_json::from_value(json!({
            "core": {
                "forum": "https://forum.example.com",
                "username": "bot",
                "password": "secret",
                "owner": "accalia"
            }
        }))
        .unwrap();
        Forum::new(config, Arc::new(NullDispatch))
    }

    fn event_payload() -> Value {
        json!({
            "roomId": 18,
            "message": {
                "messageId": 902,
                "roomId": 18,
                "content": "<p>hi</p>",
                "fromUser": {"uid": 4, "username": "Someone", "userslug": "someone"},
                "timestamp": 1_500_000_000_000_i64,
                "self": 0
            }
        })
    }

    #[tokio::test]
    async fn handler_publishes_hydrated_message() {
        let forum = forum();
        let mut events = forum.subscribe();
        let handler = ChatHandler { forum: forum.clone() };

        handler.handle(event_payload()).unwrap().await.unwrap();

        match events.try_recv().unwrap() {
            ForumEvent::ChatMessage(message) => {
                assert_eq!(message.id(), 902);
                assert_eq!(message.content(), "hi");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn missing_message_field_is_rejected() {
        let forum = forum();
        let handler = ChatHandler { forum };

        let err = handler.handle(json!({"roomId": 18})).err().unwrap();
        assert_eq!(err.to_string(), "Event payload did not include chat message");

        let err = handler
            .handle(json!({"roomId": 18, "message": null}))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Event payload did not include chat message");
    }

    #[test]
    fn malformed_message_fails_as_hydration_error() {
        let forum = forum();
        let handler = ChatHandler { forum };
        let err = handler
            .handle(json!({"message": {"messageId": 1, "roomId": 2, "content": "x"}}))
            .err()
            .unwrap();
        // No fromUser record: the nested sender hydration fails.
        assert_eq!(err.to_string(), "E_USER_NOT_FOUND");
    }
}
