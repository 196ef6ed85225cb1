//! Notification entity and classification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use quorum_core::error::ClientError;
use quorum_core::payload::{self, coerce_for, unescape_html};
use quorum_core::{ClientResult, ParseResult};

use crate::forum::Forum;
use crate::model::{Post, Topic, User};

/// Classification of a notification, derived from its label tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Someone posted in a watched topic.
    Reply,
    /// The bot was mentioned by name.
    Mention,
    /// Anything else.
    Notification,
}

impl NotificationKind {
    /// Classifies a notification by its label tag (case-insensitive).
    fn classify(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.starts_with("[[notifications:user_posted_to") {
            Self::Reply
        } else if lower.starts_with("[[mentions:user_mentioned_you_in") {
            Self::Mention
        } else {
            Self::Notification
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reply => "reply",
            Self::Mention => "mention",
            Self::Notification => "notification",
        };
        f.write_str(name)
    }
}

/// Leading word run of a label segment (letters, digits, underscore).
fn word_run(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    &text[..end]
}

/// Extracts the subtype from a `[[namespace:subtype...]]` label tag.
/// Labels without such a tag have an empty subtype.
fn subtype_of(label: &str) -> String {
    let Some(rest) = label.strip_prefix("[[") else {
        return String::new();
    };
    let namespace = word_run(rest);
    if namespace.is_empty() {
        return String::new();
    }
    let Some(rest) = rest[namespace.len()..].strip_prefix(':') else {
        return String::new();
    };
    word_run(rest).to_string()
}

#[derive(Debug, Clone)]
struct Values {
    kind: NotificationKind,
    subtype: String,
    label: String,
    body: String,
    id: String,
    post_id: i64,
    topic_id: i64,
    user_id: i64,
    read: bool,
    date: Option<DateTime<Utc>>,
    path: String,
}

/// A notification delivered to the logged-in user.
#[derive(Debug, Clone)]
pub struct Notification {
    values: Values,
}

impl Notification {
    /// Hydrates a notification from a raw or serialized payload.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("NOTIFICATION", payload)?;
        let label = payload::string(&map, "bodyShort");
        Ok(Self {
            values: Values {
                kind: NotificationKind::classify(&label),
                subtype: subtype_of(&label),
                body: unescape_html(&payload::string(&map, "bodyLong")),
                label,
                id: payload::string(&map, "nid"),
                post_id: payload::int(&map, "pid"),
                topic_id: payload::int(&map, "tid"),
                user_id: payload::int(&map, "from"),
                read: payload::flag(&map, "read"),
                date: payload::timestamp(&map, "datetime"),
                path: payload::string(&map, "path"),
            },
        })
    }

    /// Unique notification id.
    pub fn id(&self) -> &str {
        &self.values.id
    }

    /// Id of the post this notification refers to.
    pub fn post_id(&self) -> i64 {
        self.values.post_id
    }

    /// Id of the topic this notification refers to.
    pub fn topic_id(&self) -> i64 {
        self.values.topic_id
    }

    /// Id of the user who generated this notification.
    pub fn user_id(&self) -> i64 {
        self.values.user_id
    }

    /// Classification of this notification.
    pub fn kind(&self) -> NotificationKind {
        self.values.kind
    }

    /// Free-text subtype from the label tag.
    pub fn subtype(&self) -> &str {
        &self.values.subtype
    }

    /// Whether the notification has been read.
    pub fn read(&self) -> bool {
        self.values.read
    }

    /// When the notification was generated.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.values.date
    }

    /// Raw notification label.
    pub fn label(&self) -> &str {
        &self.values.label
    }

    /// Notification body with HTML entities unescaped.
    pub fn body(&self) -> &str {
        &self.values.body
    }

    /// URL of the post the notification points at.
    pub fn url(&self, forum: &Forum) -> String {
        format!("{}/{}", forum.url(), self.values.path)
    }

    /// Fetches the post this notification refers to.
    pub async fn post(&self, forum: &Forum) -> ClientResult<Post> {
        Post::get(forum, self.values.post_id).await
    }

    /// Fetches the topic this notification refers to.
    pub async fn topic(&self, forum: &Forum) -> ClientResult<Topic> {
        Topic::get(forum, self.values.topic_id).await
    }

    /// Fetches the user who generated this notification.
    pub async fn user(&self, forum: &Forum) -> ClientResult<User> {
        User::get(forum, self.values.user_id).await
    }

    /// Fetches a notification by id.
    pub async fn get(forum: &Forum, id: &str) -> ClientResult<Self> {
        let data = forum
            .emit("notifications.get", vec![json!({"nids": [id]})])
            .await?;
        let first = data.get(0).cloned().unwrap_or(Value::Null);
        Ok(Self::parse(first)?)
    }

    /// Walks all of the logged-in user's notifications, page by page,
    /// calling `each` for every notification until the pages run out.
    pub async fn get_notifications<F, Fut>(forum: &Forum, mut each: F) -> ClientResult<()>
    where
        F: FnMut(Notification) -> Fut,
        Fut: Future<Output = ClientResult<()>>,
    {
        let mut after = 0_i64;
        loop {
            let page = forum
                .emit("notifications.loadMore", vec![json!({"after": after})])
                .await?;
            let Some(batch) = page.get("notifications").and_then(Value::as_array) else {
                return Ok(());
            };
            if batch.is_empty() {
                return Ok(());
            }
            let next = page.get("nextStart").and_then(Value::as_i64);
            for data in batch {
                let notification = Self::parse(data.clone())
                    .map_err(ClientError::from)?;
                each(notification).await?;
            }
            // A missing or stuck cursor means the server would serve this
            // same page again; treat it as the end of the pages.
            match next {
                Some(next) if next > after => after = next,
                _ => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(body_short: &str) -> Value {
        json!({
            "nid": "nid_99",
            "pid": 318,
            "tid": 52,
            "from": 4,
            "read": false,
            "datetime": 1_500_000_000_000_i64,
            "path": "topic/52/release-thread/318",
            "bodyShort": body_short,
            "bodyLong": "look: &lt;b&gt;bold&lt;/b&gt; &amp; proud"
        })
    }

    #[test]
    fn maps_wire_fields() {
        let notification = Notification::parse(payload("[[topic:new_reply]]")).unwrap();
        assert_eq!(notification.id(), "nid_99");
        assert_eq!(notification.post_id(), 318);
        assert_eq!(notification.topic_id(), 52);
        assert_eq!(notification.user_id(), 4);
        assert!(!notification.read());
        assert_eq!(notification.date().unwrap().timestamp_millis(), 1_500_000_000_000);
        assert_eq!(notification.label(), "[[topic:new_reply]]");
        assert_eq!(notification.body(), "look: <b>bold</b> & proud");
    }

    #[test]
    fn classifies_reply_and_mention() {
        let reply =
            Notification::parse(payload("[[notifications:user_posted_to, x, y]]")).unwrap();
        assert_eq!(reply.kind(), NotificationKind::Reply);
        assert_eq!(reply.subtype(), "user_posted_to");

        let mention =
            Notification::parse(payload("[[mentions:user_mentioned_you_in, x]]")).unwrap();
        assert_eq!(mention.kind(), NotificationKind::Mention);
        assert_eq!(mention.subtype(), "user_mentioned_you_in");

        // Classification is case-insensitive.
        let shouted =
            Notification::parse(payload("[[Notifications:User_Posted_To, x]]")).unwrap();
        assert_eq!(shouted.kind(), NotificationKind::Reply);
    }

    #[test]
    fn everything_else_is_a_plain_notification() {
        let other = Notification::parse(payload("[[favourites:favourited_your_post]]")).unwrap();
        assert_eq!(other.kind(), NotificationKind::Notification);
        assert_eq!(other.subtype(), "favourited_your_post");

        let untagged = Notification::parse(payload("hello there")).unwrap();
        assert_eq!(untagged.kind(), NotificationKind::Notification);
        assert_eq!(untagged.subtype(), "");
    }

    #[test]
    fn empty_payload_is_not_found() {
        let err = Notification::parse(Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "E_NOTIFICATION_NOT_FOUND");
    }

    #[test]
    fn kind_renders_lowercase() {
        assert_eq!(NotificationKind::Reply.to_string(), "reply");
        assert_eq!(NotificationKind::Mention.to_string(), "mention");
        assert_eq!(NotificationKind::Notification.to_string(), "notification");
    }
}
