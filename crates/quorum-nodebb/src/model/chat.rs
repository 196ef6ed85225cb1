//! Chat room and chat message entities.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use quorum_core::payload::{self, coerce_for, strip_markup};
use quorum_core::{ClientResult, ParseResult};

use crate::forum::Forum;
use crate::model::User;

/// Delay between attempts when a chat send is rate limited.
const SEND_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Sends `content` into a chat room, retrying rate-limit rejections.
pub(crate) async fn send_to_room(forum: &Forum, room: i64, content: &str) -> ClientResult<()> {
    forum
        .emit_with_retry(
            SEND_RETRY_DELAY,
            "modules.chats.send",
            vec![json!({"roomId": room, "message": content})],
        )
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct RoomValues {
    id: i64,
    name: String,
    owner: Option<User>,
    users: Vec<User>,
}

/// A chat room the logged-in user participates in.
#[derive(Debug, Clone)]
pub struct ChatRoom {
    values: RoomValues,
}

impl ChatRoom {
    /// Hydrates a chat room from a raw or serialized payload.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("CHATROOM", payload)?;
        let owner = match map.get("owner") {
            Some(value) if value.is_object() => Some(User::parse(value.clone())?),
            _ => None,
        };
        let users = match map.get("users").and_then(Value::as_array) {
            Some(list) => list
                .iter()
                .map(|value| User::parse(value.clone()))
                .collect::<ParseResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            values: RoomValues {
                id: payload::int(&map, "roomId"),
                name: payload::string(&map, "roomName"),
                owner,
                users,
            },
        })
    }

    /// Forum id of this room.
    pub fn id(&self) -> i64 {
        self.values.id
    }

    /// Room name.
    pub fn name(&self) -> &str {
        &self.values.name
    }

    /// User who owns the room, when the payload carried one.
    pub fn owner(&self) -> Option<&User> {
        self.values.owner.as_ref()
    }

    /// Users participating in this room.
    pub fn participants(&self) -> &[User] {
        &self.values.users
    }

    /// Direct URL of this room.
    pub fn url(&self, forum: &Forum) -> String {
        format!("{}/chats/{}", forum.url(), self.values.id)
    }

    /// Sends a message into this room, retrying rate-limit rejections.
    pub async fn send(&self, forum: &Forum, content: &str) -> ClientResult<()> {
        send_to_room(forum, self.values.id, content).await
    }
}

#[derive(Debug, Clone)]
struct MessageValues {
    id: i64,
    room: i64,
    content: String,
    markup: String,
    from: User,
    sent: Option<DateTime<Utc>>,
    is_self: bool,
}

/// A message received in a chat room.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    values: MessageValues,
}

impl ChatMessage {
    /// Hydrates a chat message from a raw or serialized payload.
    ///
    /// The sender is hydrated from the nested `fromUser` record; the `self`
    /// flag is coerced strictly, so only boolean `true` or numeric 1 mark
    /// the message as the bot's own.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("CHATMESSAGE", payload)?;
        let markup = payload::string(&map, "content");
        let from = User::parse(map.get("fromUser").cloned().unwrap_or(Value::Null))?;
        Ok(Self {
            values: MessageValues {
                id: payload::int(&map, "messageId"),
                room: payload::int(&map, "roomId"),
                content: strip_markup(&markup).trim().to_string(),
                markup,
                from,
                sent: payload::timestamp(&map, "timestamp"),
                is_self: payload::flag(&map, "self"),
            },
        })
    }

    /// Forum id of this message.
    pub fn id(&self) -> i64 {
        self.values.id
    }

    /// Id of the room the message arrived in.
    pub fn room(&self) -> i64 {
        self.values.room
    }

    /// Message text with markup stripped.
    pub fn content(&self) -> &str {
        &self.values.content
    }

    /// Raw message markup.
    pub fn markup(&self) -> &str {
        &self.values.markup
    }

    /// User who sent the message.
    pub fn from(&self) -> &User {
        &self.values.from
    }

    /// When the message was sent.
    pub fn sent(&self) -> Option<DateTime<Utc>> {
        self.values.sent
    }

    /// Whether the logged-in user sent this message.
    pub fn is_self(&self) -> bool {
        self.values.is_self
    }

    /// Replies into the room this message arrived in, retrying rate-limit
    /// rejections.
    pub async fn reply(&self, forum: &Forum, content: &str) -> ClientResult<()> {
        send_to_room(forum, self.values.room, content).await
    }
}
