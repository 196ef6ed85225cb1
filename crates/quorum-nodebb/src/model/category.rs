//! Forum category entity.

use serde_json::Value;

use quorum_core::payload::{self, coerce_for};
use quorum_core::ParseResult;

use crate::forum::Forum;

#[derive(Debug, Clone)]
struct Values {
    id: i64,
    name: String,
    description: String,
    slug: String,
    parent_id: i64,
    topic_count: i64,
    post_count: i64,
    recent_posts: i64,
}

/// A forum category.
#[derive(Debug, Clone)]
pub struct Category {
    values: Values,
}

impl Category {
    /// Hydrates a category from a raw or serialized payload.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("CATEGORY", payload)?;
        Ok(Self {
            values: Values {
                id: payload::int(&map, "cid"),
                name: payload::string(&map, "name"),
                description: payload::string(&map, "description"),
                slug: payload::string(&map, "slug"),
                parent_id: payload::int(&map, "parentCid"),
                topic_count: payload::int(&map, "topic_count"),
                post_count: payload::int(&map, "post_count"),
                recent_posts: payload::int(&map, "numRecentReplies"),
            },
        })
    }

    /// Forum id of this category.
    pub fn id(&self) -> i64 {
        self.values.id
    }

    /// Category name.
    pub fn name(&self) -> &str {
        &self.values.name
    }

    /// Category description.
    pub fn description(&self) -> &str {
        &self.values.description
    }

    /// URL slug of this category.
    pub fn slug(&self) -> &str {
        &self.values.slug
    }

    /// Id of the parent category, or 0 for top-level categories.
    pub fn parent_id(&self) -> i64 {
        self.values.parent_id
    }

    /// Number of topics in this category.
    pub fn topic_count(&self) -> i64 {
        self.values.topic_count
    }

    /// Number of posts in this category.
    pub fn post_count(&self) -> i64 {
        self.values.post_count
    }

    /// Number of posts shown in the category's recent-activity strip.
    pub fn recent_posts(&self) -> i64 {
        self.values.recent_posts
    }

    /// Direct URL of this category.
    pub fn url(&self, forum: &Forum) -> String {
        format!("{}/category/{}", forum.url(), self.values.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_wire_fields() {
        let category = Category::parse(json!({
            "cid": 12,
            "name": "The Lounge",
            "description": "General discussion",
            "slug": "12/the-lounge",
            "parentCid": 1,
            "topic_count": 300,
            "post_count": 9001,
            "numRecentReplies": 4
        }))
        .unwrap();

        assert_eq!(category.id(), 12);
        assert_eq!(category.name(), "The Lounge");
        assert_eq!(category.description(), "General discussion");
        assert_eq!(category.slug(), "12/the-lounge");
        assert_eq!(category.parent_id(), 1);
        assert_eq!(category.topic_count(), 300);
        assert_eq!(category.post_count(), 9001);
        assert_eq!(category.recent_posts(), 4);
    }

    #[test]
    fn empty_payload_is_not_found() {
        let err = Category::parse(json!("")).unwrap_err();
        assert_eq!(err.to_string(), "E_CATEGORY_NOT_FOUND");
    }
}
