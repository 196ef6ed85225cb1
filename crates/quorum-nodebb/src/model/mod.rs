//! Typed domain entities hydrated from forum payloads.
//!
//! Every entity follows the same discipline: a private `Values` struct
//! holds the canonical fields, a `parse` factory hydrates from a raw or
//! serialized payload (failing `E_<KIND>_NOT_FOUND` on empty input), and
//! only read accessors are public. Derived values (timestamps, stripped
//! markup, nested users) are computed once at construction.

mod category;
mod chat;
mod notification;
mod post;
mod topic;
mod user;

pub use category::Category;
pub use chat::{ChatMessage, ChatRoom};
pub(crate) use chat::send_to_room;
pub use notification::{Notification, NotificationKind};
pub use post::Post;
pub use topic::Topic;
pub use user::User;
