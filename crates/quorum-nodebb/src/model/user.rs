//! Forum user entity.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use quorum_core::payload::{self, coerce_for};
use quorum_core::{ClientResult, ParseResult};

use crate::forum::Forum;

#[derive(Debug, Clone)]
struct Values {
    id: i64,
    name: String,
    username: String,
    email: String,
    avatar: String,
    post_count: i64,
    topic_count: i64,
    reputation: i64,
    last_posted: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
}

/// A forum user.
#[derive(Debug, Clone)]
pub struct User {
    values: Values,
}

impl User {
    /// Hydrates a user from a raw or serialized payload.
    pub fn parse(payload: Value) -> ParseResult<Self> {
        let map = coerce_for("USER", payload)?;
        Ok(Self::from_map(&map))
    }

    pub(crate) fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            values: Values {
                id: payload::int(map, "uid"),
                name: payload::string(map, "username"),
                username: payload::string(map, "userslug"),
                email: payload::string(map, "email"),
                avatar: payload::string(map, "picture"),
                post_count: payload::int(map, "postcount"),
                topic_count: payload::int(map, "topiccount"),
                reputation: payload::int(map, "reputation"),
                last_posted: payload::timestamp(map, "lastposttime"),
                last_seen: payload::timestamp(map, "lastonline"),
            },
        }
    }

    /// Forum id of this user.
    pub fn id(&self) -> i64 {
        self.values.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.values.name
    }

    /// URL slug form of the username.
    pub fn username(&self) -> &str {
        &self.values.username
    }

    /// Email address, if exposed by the forum.
    pub fn email(&self) -> &str {
        &self.values.email
    }

    /// Avatar image URL.
    pub fn avatar(&self) -> &str {
        &self.values.avatar
    }

    /// Number of posts this user has made.
    pub fn post_count(&self) -> i64 {
        self.values.post_count
    }

    /// Number of topics this user has started.
    pub fn topic_count(&self) -> i64 {
        self.values.topic_count
    }

    /// Reputation score.
    pub fn reputation(&self) -> i64 {
        self.values.reputation
    }

    /// When this user last posted.
    pub fn last_posted(&self) -> Option<DateTime<Utc>> {
        self.values.last_posted
    }

    /// When this user was last seen online.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.values.last_seen
    }

    /// Profile URL of this user.
    pub fn url(&self, forum: &Forum) -> String {
        format!("{}/user/{}", forum.url(), self.values.username)
    }

    /// Fetches a user by id.
    pub async fn get(forum: &Forum, id: i64) -> ClientResult<Self> {
        forum
            .fetch_object("user.getUserByUID", json!(id), Self::parse)
            .await
    }

    /// Fetches a user by display name.
    pub async fn get_by_name(forum: &Forum, name: &str) -> ClientResult<Self> {
        forum
            .fetch_object("user.getUserByUsername", json!(name), Self::parse)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::ParseError;

    fn payload() -> Value {
        json!({
            "uid": 42,
            "username": "Accalia",
            "userslug": "accalia",
            "email": "acc@example.com",
            "picture": "/assets/avatar.png",
            "postcount": 100,
            "topiccount": "7",
            "reputation": 9,
            "lastposttime": 1_500_000_000_000_i64,
            "lastonline": 1_500_000_100_000_i64
        })
    }

    #[test]
    fn maps_wire_fields() {
        let user = User::parse(payload()).unwrap();
        assert_eq!(user.id(), 42);
        assert_eq!(user.name(), "Accalia");
        assert_eq!(user.username(), "accalia");
        assert_eq!(user.email(), "acc@example.com");
        assert_eq!(user.avatar(), "/assets/avatar.png");
        assert_eq!(user.post_count(), 100);
        assert_eq!(user.topic_count(), 7);
        assert_eq!(user.reputation(), 9);
        assert_eq!(user.last_posted().unwrap().timestamp_millis(), 1_500_000_000_000);
        assert_eq!(user.last_seen().unwrap().timestamp_millis(), 1_500_000_100_000);
    }

    #[test]
    fn parses_serialized_payload_identically() {
        let direct = User::parse(payload()).unwrap();
        let serialized = User::parse(Value::String(payload().to_string())).unwrap();
        assert_eq!(direct.id(), serialized.id());
        assert_eq!(direct.name(), serialized.name());
        assert_eq!(direct.last_posted(), serialized.last_posted());
    }

    #[test]
    fn empty_payload_is_not_found() {
        let err = User::parse(Value::Null).unwrap_err();
        assert!(matches!(err, ParseError::NotFound { kind: "USER" }));
        assert_eq!(err.to_string(), "E_USER_NOT_FOUND");
    }
}
