//! HTTP session management.
//!
//! The forum authenticates over plain HTTP before the realtime channel is
//! opened: fetch `/api/config` for the CSRF token, POST the login form,
//! and carry the resulting session cookie into the channel handshake. The
//! session owns the cookie jar so the handshake can present the exact
//! cookies the login produced.

use parking_lot::Mutex;
use reqwest::cookie::{CookieStore, Jar};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use quorum_core::{TransportError, TransportResult};

use crate::channel::ChannelIdentity;

#[derive(Clone)]
struct HttpState {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

/// An HTTP session against one forum.
pub struct Session {
    forum_url: String,
    user_agent: String,
    http: Mutex<Option<HttpState>>,
    config: Mutex<Option<Value>>,
}

impl Session {
    /// Creates a session for the given forum. No request is made until the
    /// first operation.
    pub fn new(forum_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        let forum_url: String = forum_url.into();
        Self {
            forum_url: forum_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            http: Mutex::new(None),
            config: Mutex::new(None),
        }
    }

    /// Base URL of the forum this session talks to.
    pub fn forum_url(&self) -> &str {
        &self.forum_url
    }

    /// User agent presented on every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the HTTP client and cookie jar, building them on first use.
    fn http(&self) -> TransportResult<HttpState> {
        let mut slot = self.http.lock();
        if let Some(state) = slot.as_ref() {
            return Ok(state.clone());
        }
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let state = HttpState { client, jar };
        *slot = Some(state.clone());
        Ok(state)
    }

    /// Fetches the forum's client configuration, caching it for the
    /// session's lifetime.
    ///
    /// The configuration carries the CSRF token required by the login
    /// endpoint along with forum metadata (title, version, limits).
    pub async fn configuration(&self) -> TransportResult<Value> {
        if let Some(config) = self.config.lock().clone() {
            return Ok(config);
        }

        let http = self.http()?;
        let url = format!("{}/api/config", self.forum_url);
        debug!(url = %url, "Fetching forum configuration");

        let response = http
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http(format!(
                "configuration fetch failed: {status}"
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let config: Value =
            serde_json::from_str(&body).map_err(|e| TransportError::BadJson(e.to_string()))?;

        *self.config.lock() = Some(config.clone());
        Ok(config)
    }

    /// Logs in with the given credentials.
    ///
    /// Posts the standard login form (`username`, `password`,
    /// `remember=off`, `returnTo=<forum url>`) with the CSRF token from
    /// [`configuration`](Session::configuration). On success the session
    /// cookie lands in the jar and rides along on the channel handshake.
    pub async fn login(&self, username: &str, password: &str) -> TransportResult<()> {
        let config = self.configuration().await?;
        let http = self.http()?;

        let url = format!("{}/login", self.forum_url);
        let form = [
            ("username", username),
            ("password", password),
            ("remember", "off"),
            ("returnTo", self.forum_url.as_str()),
        ];

        debug!(url = %url, username = %username, "Posting login form");
        let mut request = http.client.post(&url).form(&form);
        if let Some(token) = config.get("csrf_token").and_then(Value::as_str) {
            request = request.header("x-csrf-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("login failed: {status}")
            } else {
                body
            };
            return Err(TransportError::Http(message));
        }

        info!(username = %username, "Logged in to forum");
        Ok(())
    }

    /// Serializes the session's cookies for the forum URL into a `Cookie`
    /// header value. Empty before any cookie has been set.
    pub fn cookie_header(&self) -> TransportResult<String> {
        let http = self.http()?;
        let url: reqwest::Url = self
            .forum_url
            .parse()
            .map_err(|e: url::ParseError| TransportError::Http(e.to_string()))?;
        let cookie = http
            .jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .unwrap_or_default();
        Ok(cookie)
    }

    /// Builds the identity the channel handshake must present to be tied
    /// to this session.
    pub fn channel_identity(&self) -> TransportResult<ChannelIdentity> {
        Ok(ChannelIdentity {
            url: self.forum_url.clone(),
            user_agent: self.user_agent.clone(),
            cookie: self.cookie_header()?,
        })
    }
}
