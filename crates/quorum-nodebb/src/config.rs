//! Client configuration schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_user_agent() -> String {
    format!(
        "quorum/{} (https://github.com/quorum-rs/quorum)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Connection and identity settings for one forum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Base URL of the forum, e.g. `https://forum.example.com`.
    pub forum: String,
    /// Account the bot logs in as.
    pub username: String,
    /// Password for the bot account.
    pub password: String,
    /// Username of the human owner of the bot.
    pub owner: String,
    /// User agent presented on HTTP requests and the channel handshake.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Full client configuration: core settings plus per-plugin sections.
///
/// Plugin sections are opaque here; each section is handed verbatim to the
/// plugin factory registered under its name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumConfig {
    /// Core connection settings.
    pub core: CoreConfig,
    /// Per-plugin configuration, keyed by plugin name.
    #[serde(default)]
    pub plugins: Map<String, Value>,
}
