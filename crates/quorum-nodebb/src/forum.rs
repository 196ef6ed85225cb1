//! The forum client: session, channel, plugin host, and lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use quorum_core::{ClientError, ClientResult, ParseResult, RequestResult};
use quorum_transport::{ChannelClient, ChannelEvent, Session};

use crate::chat;
use crate::commands::CommandDispatch;
use crate::config::ForumConfig;
use crate::events::ForumEvent;
use crate::model::User;
use crate::notifications;
use crate::plugin::{Plugin, PluginFactory, PluginModule};

/// Static capability table. Second level lists declared sub-capabilities.
const CAPABILITIES: &[(&str, &[&str])] = &[
    ("Users", &["Avatars"]),
    ("Posts", &[]),
    ("Topics", &[]),
    ("Categories", &[]),
    ("Notifications", &[]),
    ("Chats", &[]),
    ("PrivateMessage", &[]),
    ("Formatting", &[]),
];

struct ForumInner {
    config: ForumConfig,
    session: Session,
    channel: ChannelClient,
    dispatch: Arc<dyn CommandDispatch>,
    events: broadcast::Sender<ForumEvent>,
    plugins: tokio::sync::Mutex<Vec<Box<dyn Plugin>>>,
    self_user: Mutex<Option<User>>,
    owner_user: Mutex<Option<User>>,
    bridge_started: AtomicBool,
}

/// Client for one forum. Cheap to clone; all clones share state.
///
/// Construction performs no I/O. The usual sequence is
/// [`login`](Forum::login) followed by [`activate`](Forum::activate);
/// entity operations and plugins then run against the live channel.
#[derive(Clone)]
pub struct Forum {
    inner: Arc<ForumInner>,
}

impl Forum {
    /// Creates a client from configuration and a command dispatcher.
    pub fn new(config: ForumConfig, dispatch: Arc<dyn CommandDispatch>) -> Self {
        let session = Session::new(&config.core.forum, &config.core.user_agent);
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ForumInner {
                config,
                session,
                channel: ChannelClient::new(),
                dispatch,
                events,
                plugins: tokio::sync::Mutex::new(Vec::new()),
                self_user: Mutex::new(None),
                owner_user: Mutex::new(None),
                bridge_started: AtomicBool::new(false),
            }),
        }
    }

    /// Base URL of the forum.
    pub fn url(&self) -> &str {
        self.inner.session.forum_url()
    }

    /// Account name the bot runs as.
    pub fn username(&self) -> &str {
        &self.inner.config.core.username
    }

    /// Name of the bot's configured owner.
    pub fn owner_name(&self) -> &str {
        &self.inner.config.core.owner
    }

    /// User agent presented to the forum.
    pub fn user_agent(&self) -> &str {
        self.inner.session.user_agent()
    }

    /// The HTTP session.
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The realtime channel client.
    pub fn channel(&self) -> &ChannelClient {
        &self.inner.channel
    }

    /// The command dispatcher events are routed into.
    pub fn dispatch(&self) -> &Arc<dyn CommandDispatch> {
        &self.inner.dispatch
    }

    /// Per-plugin configuration sections.
    pub fn plugin_config(&self, name: &str) -> Option<&Value> {
        self.inner.config.plugins.get(name)
    }

    /// The bot's own user record, cached by [`activate`](Forum::activate).
    pub fn self_user(&self) -> Option<User> {
        self.inner.self_user.lock().clone()
    }

    /// The owner's user record, cached by [`activate`](Forum::activate).
    pub fn owner_user(&self) -> Option<User> {
        self.inner.owner_user.lock().clone()
    }

    /// Subscribes to domain events.
    pub fn subscribe(&self) -> broadcast::Receiver<ForumEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn publish(&self, event: ForumEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Logs in to the forum with the configured credentials.
    pub async fn login(&self) -> ClientResult<()> {
        let core = &self.inner.config.core;
        self.inner.session.login(&core.username, &core.password).await?;
        Ok(())
    }

    /// Opens the realtime channel with the session's identity. Idempotent.
    pub async fn connect(&self) -> ClientResult<()> {
        let identity = self.inner.session.channel_identity()?;
        self.inner.channel.connect(&identity).await?;
        Ok(())
    }

    /// Sends a named request over the channel.
    pub async fn emit(&self, name: &str, args: Vec<Value>) -> RequestResult<Value> {
        self.inner.channel.request(name, args).await
    }

    /// Sends a named request, retrying rate-limit rejections with the
    /// given delay between attempts.
    pub async fn emit_with_retry(
        &self,
        delay: Duration,
        name: &str,
        args: Vec<Value>,
    ) -> RequestResult<Value> {
        self.inner.channel.request_with_retry(delay, name, args).await
    }

    /// Fetches a single object by a named request and hydrates it.
    /// Shared by the entity `get` operations.
    pub async fn fetch_object<T, F>(&self, name: &str, arg: Value, hydrate: F) -> ClientResult<T>
    where
        F: FnOnce(Value) -> ParseResult<T>,
    {
        let data = self.emit(name, vec![arg]).await?;
        Ok(hydrate(data)?)
    }

    /// Builds and registers a plugin.
    ///
    /// The factory runs immediately with this forum and `config`; a
    /// factory failure rejects registration and leaves the plugin list
    /// untouched. Registration order is activation order.
    pub async fn add_plugin<F>(&self, factory: F, config: Value) -> ClientResult<()>
    where
        F: PluginFactory,
    {
        let plugin = factory
            .build(self, &config)
            .map_err(|e| ClientError::PluginContract {
                reason: e.to_string(),
            })?;
        let mut plugins = self.inner.plugins.lock().await;
        plugins.push(plugin);
        debug!(count = plugins.len(), "Plugin registered");
        Ok(())
    }

    /// Registers a plugin through the indirect module-object form.
    pub async fn add_plugin_module<M>(&self, module: M, config: Value) -> ClientResult<()>
    where
        M: PluginModule,
    {
        self.add_plugin(
            |forum: &Forum, config: &Value| module.plugin(forum, config),
            config,
        )
        .await
    }

    /// Number of registered plugins.
    pub async fn plugin_count(&self) -> usize {
        self.inner.plugins.lock().await.len()
    }

    /// Brings the client up: channel, user cache, built-in subsystems,
    /// then plugins in registration order.
    ///
    /// Strictly sequential; the first failure rejects the whole sequence
    /// and later stages do not run.
    pub async fn activate(&self) -> ClientResult<()> {
        info!(forum = %self.url(), "Activating forum client");
        self.start_lifecycle_bridge();
        self.connect().await?;

        let me = User::get_by_name(self, &self.inner.config.core.username).await?;
        debug!(uid = me.id(), "Resolved own user");
        *self.inner.self_user.lock() = Some(me);

        let owner = User::get_by_name(self, &self.inner.config.core.owner).await?;
        debug!(uid = owner.id(), "Resolved owner user");
        *self.inner.owner_user.lock() = Some(owner);

        notifications::activate(self);
        chat::activate(self);

        let plugins = self.inner.plugins.lock().await;
        for plugin in plugins.iter() {
            plugin.activate().await?;
        }
        info!(plugins = plugins.len(), "Forum client activated");
        Ok(())
    }

    /// Takes the client down: built-in subsystems, then plugins in the
    /// same order they were activated in.
    pub async fn deactivate(&self) -> ClientResult<()> {
        notifications::deactivate(self);
        chat::deactivate(self);

        let plugins = self.inner.plugins.lock().await;
        for plugin in plugins.iter() {
            plugin.deactivate().await?;
        }
        info!("Forum client deactivated");
        Ok(())
    }

    /// Whether this provider supports a capability path.
    ///
    /// Paths are one or two dotted levels, e.g. `"Chats"` or
    /// `"Users.Avatars"`; a sub-capability resolves true only when its
    /// parent is also declared.
    pub fn supports(&self, path: &str) -> bool {
        let mut parts = path.split('.');
        let Some(top) = parts.next() else {
            return false;
        };
        let Some((_, subs)) = CAPABILITIES.iter().find(|(name, _)| *name == top) else {
            return false;
        };
        match (parts.next(), parts.next()) {
            (None, _) => true,
            (Some(sub), None) => subs.contains(&sub),
            _ => false,
        }
    }

    /// Whether every capability path in `paths` is supported.
    pub fn supports_all(&self, paths: &[&str]) -> bool {
        paths.iter().all(|path| self.supports(path))
    }

    /// Forwards channel lifecycle events onto the domain event bus.
    /// Started once, before the first connect.
    fn start_lifecycle_bridge(&self) {
        if self.inner.bridge_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut channel_events = self.inner.channel.subscribe();
        let events = self.inner.events.clone();
        tokio::spawn(async move {
            loop {
                match channel_events.recv().await {
                    Ok(ChannelEvent::Connected) => {
                        let _ = events.send(ForumEvent::Connected);
                    }
                    Ok(ChannelEvent::Disconnected) => {
                        let _ = events.send(ForumEvent::Disconnected);
                    }
                    Ok(ChannelEvent::Pong { latency }) => {
                        let _ = events.send(ForumEvent::Log(format!(
                            "Ping exchanged with {}ms latency",
                            latency.as_millis()
                        )));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
