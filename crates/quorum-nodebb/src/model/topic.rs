//! Forum topic entity.

use serde_json::{Value, json};

use quorum_core::payload::{self, coerce_for};
use quorum_core::{ClientResult, ParseResult};

use crate::forum::Forum;
use crate::model::User;

#[derive(Debug, Clone)]
struct Values {
    id: i64,
    title: String,
    slug: String,
    author_id: i64,
    main_post_id: i64,
    post_count: i64,
}

/// A discussion topic.
#[derive(Debug, Clone)]
pub struct Topic {
    values: Values,
}

impl Topic {
    /// Hydrates a topic from a raw or serialized payload.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("TOPIC", payload)?;
        Ok(Self {
            values: Values {
                id: payload::int(&map, "tid"),
                title: payload::string(&map, "title"),
                slug: payload::string(&map, "slug"),
                author_id: payload::int(&map, "uid"),
                main_post_id: payload::int(&map, "mainPid"),
                post_count: payload::int(&map, "postcount"),
            },
        })
    }

    /// Forum id of this topic.
    pub fn id(&self) -> i64 {
        self.values.id
    }

    /// Topic title.
    pub fn title(&self) -> &str {
        &self.values.title
    }

    /// URL slug of this topic.
    pub fn slug(&self) -> &str {
        &self.values.slug
    }

    /// Id of the user who started this topic.
    pub fn author_id(&self) -> i64 {
        self.values.author_id
    }

    /// Id of the topic's opening post.
    pub fn main_post_id(&self) -> i64 {
        self.values.main_post_id
    }

    /// Number of posts in this topic.
    pub fn post_count(&self) -> i64 {
        self.values.post_count
    }

    /// Direct URL of this topic.
    pub fn url(&self, forum: &Forum) -> String {
        format!("{}/topic/{}", forum.url(), self.values.slug)
    }

    /// Fetches the user who started this topic.
    pub async fn author(&self, forum: &Forum) -> ClientResult<User> {
        User::get(forum, self.values.author_id).await
    }

    /// Fetches a topic by id.
    pub async fn get(forum: &Forum, id: i64) -> ClientResult<Self> {
        forum
            .fetch_object("topics.getTopic", json!(id), Self::parse)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_wire_fields() {
        let topic = Topic::parse(json!({
            "tid": 1000,
            "title": "Release thread",
            "slug": "1000/release-thread",
            "uid": 9,
            "mainPid": 31337,
            "postcount": 12
        }))
        .unwrap();

        assert_eq!(topic.id(), 1000);
        assert_eq!(topic.title(), "Release thread");
        assert_eq!(topic.slug(), "1000/release-thread");
        assert_eq!(topic.author_id(), 9);
        assert_eq!(topic.main_post_id(), 31337);
        assert_eq!(topic.post_count(), 12);
    }

    #[test]
    fn empty_payload_is_not_found() {
        let err = Topic::parse(Value::Bool(false)).unwrap_err();
        assert_eq!(err.to_string(), "E_TOPIC_NOT_FOUND");
    }
}
