//! Spam gate configuration.

use serde::{Deserialize, Serialize};

/// Content-policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamConfig {
    /// Whether the profanity filter is active.
    #[serde(default = "default_profanity_enabled")]
    pub profanity_enabled: bool,
    /// Window in which an identical message counts as a duplicate, seconds.
    #[serde(default = "default_duplicate_window_seconds")]
    pub duplicate_window_seconds: u64,
    /// Maximum URLs allowed per message.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,
    /// Additional words for the profanity list, merged with the built-ins.
    #[serde(default)]
    pub profanity_words: Vec<String>,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            profanity_enabled: default_profanity_enabled(),
            duplicate_window_seconds: default_duplicate_window_seconds(),
            max_urls: default_max_urls(),
            profanity_words: Vec::new(),
        }
    }
}

fn default_profanity_enabled() -> bool {
    true
}

fn default_duplicate_window_seconds() -> u64 {
    30
}

fn default_max_urls() -> usize {
    2
}
