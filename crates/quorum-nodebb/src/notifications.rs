//! Notification event routing.
//!
//! Subscribes to the forum's new-notification event, hydrates each
//! payload, publishes it on the domain event bus, and routes it through
//! command dispatch. Activation installs exactly one handler; repeated
//! activate/deactivate cycles replace rather than stack it.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use quorum_core::ClientResult;
use quorum_transport::{EventHandler, HandlerFuture};

use crate::events::ForumEvent;
use crate::forum::Forum;
use crate::model::Notification;

/// Channel event carrying new notifications.
pub const EVENT: &str = "event:new_notification";

const ACTIVATED: &str = "Notifications Activated: Now listening for new notifications";
const DEACTIVATED: &str = "Notifications Deactivated: No longer listening for new notifications";

/// Starts listening for new notifications.
pub fn activate(forum: &Forum) {
    forum.channel().on(EVENT, Arc::new(NotificationHandler { forum: forum.clone() }));
    forum.publish(ForumEvent::Log(ACTIVATED.to_string()));
    info!("{ACTIVATED}");
}

/// Stops listening for new notifications.
pub fn deactivate(forum: &Forum) {
    forum.channel().off(EVENT);
    forum.publish(ForumEvent::Log(DEACTIVATED.to_string()));
    info!("{DEACTIVATED}");
}

struct NotificationHandler {
    forum: Forum,
}

impl EventHandler for NotificationHandler {
    fn handle(&self, payload: Value) -> ClientResult<HandlerFuture> {
        // Hydration failures surface synchronously to the channel loop.
        let notification = Notification::parse(payload)?;
        debug!(
            id = %notification.id(),
            kind = %notification.kind(),
            label = %notification.label(),
            "Notification received"
        );
        let forum = self.forum.clone();
        Ok(Box::pin(async move {
            forum.publish(ForumEvent::Notification(notification.clone()));
            let command = forum.dispatch().from_notification(&notification).await?;
            command.execute().await
        }))
    }
}
