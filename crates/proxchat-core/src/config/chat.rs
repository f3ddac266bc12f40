//! Message log configuration.

use serde::{Deserialize, Serialize};

/// Per-cell message log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// TTL for chat messages in minutes.
    #[serde(default = "default_message_ttl_minutes")]
    pub message_ttl_minutes: u64,
    /// Maximum messages returned by the recent-messages query.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            message_ttl_minutes: default_message_ttl_minutes(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_message_ttl_minutes() -> u64 {
    30
}

fn default_recent_limit() -> usize {
    50
}
