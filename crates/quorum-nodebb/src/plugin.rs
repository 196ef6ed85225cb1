//! Plugin contract and registration.
//!
//! Plugins extend the client with behavior driven by the forum lifecycle.
//! They are built by a factory at registration time and activated or
//! deactivated by the forum client as part of its own lifecycle, in
//! registration order.

use async_trait::async_trait;
use serde_json::Value;

use quorum_core::ClientResult;

use crate::forum::Forum;

/// A registered plugin.
///
/// Both hooks may be called repeatedly over the client's lifetime (the
/// embedding application may bounce the connection); implementations keep
/// their own state behind interior mutability.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Starts the plugin. Called after the channel, user cache, and
    /// built-in subsystems are up.
    async fn activate(&self) -> ClientResult<()>;

    /// Stops the plugin.
    async fn deactivate(&self) -> ClientResult<()>;
}

/// Builds a plugin instance for a forum.
///
/// Implemented for any `FnOnce(&Forum, &Value) -> ClientResult<Box<dyn Plugin>>`
/// closure, which is the common direct form. Providers that expose their
/// factory as a method on a module object implement [`PluginModule`]
/// instead and register through
/// [`Forum::add_plugin_module`](crate::forum::Forum::add_plugin_module).
pub trait PluginFactory {
    /// Builds the plugin from the forum handle and its config section.
    fn build(self, forum: &Forum, config: &Value) -> ClientResult<Box<dyn Plugin>>;
}

impl<F> PluginFactory for F
where
    F: FnOnce(&Forum, &Value) -> ClientResult<Box<dyn Plugin>>,
{
    fn build(self, forum: &Forum, config: &Value) -> ClientResult<Box<dyn Plugin>> {
        self(forum, config)
    }
}

/// The indirect factory form: a module object exposing a `plugin` method.
pub trait PluginModule {
    /// Builds the plugin from the forum handle and its config section.
    fn plugin(&self, forum: &Forum, config: &Value) -> ClientResult<Box<dyn Plugin>>;
}
