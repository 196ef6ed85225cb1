//! Forum post entity.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use quorum_core::payload::{self, coerce_for};
use quorum_core::{ClientResult, ParseResult};

use crate::forum::Forum;
use crate::model::{Topic, User};

#[derive(Debug, Clone)]
struct Values {
    id: i64,
    author_id: i64,
    content: String,
    topic_id: i64,
    posted: Option<DateTime<Utc>>,
}

/// A post in a forum topic.
#[derive(Debug, Clone)]
pub struct Post {
    values: Values,
}

impl Post {
    /// Hydrates a post from a raw or serialized payload.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("POST", payload)?;
        Ok(Self {
            values: Values {
                id: payload::int(&map, "pid"),
                author_id: payload::int(&map, "uid"),
                content: payload::string(&map, "content"),
                topic_id: payload::int(&map, "tid"),
                posted: payload::timestamp(&map, "timestamp"),
            },
        })
    }

    /// Forum id of this post.
    pub fn id(&self) -> i64 {
        self.values.id
    }

    /// Id of the user who authored this post.
    pub fn author_id(&self) -> i64 {
        self.values.author_id
    }

    /// Post content as rendered markup.
    pub fn content(&self) -> &str {
        &self.values.content
    }

    /// Id of the topic this post belongs to.
    pub fn topic_id(&self) -> i64 {
        self.values.topic_id
    }

    /// When this post was made.
    pub fn posted(&self) -> Option<DateTime<Utc>> {
        self.values.posted
    }

    /// Direct URL of this post.
    pub fn url(&self, forum: &Forum) -> String {
        format!("{}/post/{}", forum.url(), self.values.id)
    }

    /// Fetches the author of this post.
    pub async fn author(&self, forum: &Forum) -> ClientResult<User> {
        User::get(forum, self.values.author_id).await
    }

    /// Fetches the topic this post belongs to.
    pub async fn topic(&self, forum: &Forum) -> ClientResult<Topic> {
        Topic::get(forum, self.values.topic_id).await
    }

    /// Fetches a post by id.
    pub async fn get(forum: &Forum, id: i64) -> ClientResult<Self> {
        forum.fetch_object("posts.getPost", json!(id), Self::parse).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::ParseError;

    #[test]
    fn maps_wire_fields() {
        let post = Post::parse(json!({
            "pid": 318,
            "uid": 4,
            "content": "<p>hello</p>",
            "tid": 52,
            "timestamp": 1_400_000_000_000_i64
        }))
        .unwrap();

        assert_eq!(post.id(), 318);
        assert_eq!(post.author_id(), 4);
        assert_eq!(post.content(), "<p>hello</p>");
        assert_eq!(post.topic_id(), 52);
        assert_eq!(post.posted().unwrap().timestamp_millis(), 1_400_000_000_000);
    }

    #[test]
    fn empty_payload_is_not_found() {
        let err = Post::parse(Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "E_POST_NOT_FOUND");
        assert!(matches!(err, ParseError::NotFound { kind: "POST" }));
    }
}
