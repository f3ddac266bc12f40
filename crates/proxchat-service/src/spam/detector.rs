//! The spam gate: length, profanity, URL count, and duplicate checks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::debug;

use proxchat_core::config::SpamConfig;
use proxchat_core::result::AppResult;
use proxchat_core::traits::store::KvStore;
use proxchat_store::{keys, StoreManager};

use super::patterns::spam_score;

/// Maximum raw message length in characters.
const MAX_MESSAGE_LEN: usize = 500;

/// Heuristic score at which a message is worth a log line.
const SCORE_LOG_THRESHOLD: u8 = 60;

/// Why a message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamReason {
    Empty,
    TooLong,
    Profanity,
    UrlSpam,
    Duplicate,
}

impl SpamReason {
    /// The wire code sent in the error frame.
    pub fn as_code(self) -> &'static str {
        match self {
            // Shape problems are format errors, not spam.
            Self::Empty | Self::TooLong => "INVALID_FORMAT",
            Self::Profanity | Self::UrlSpam | Self::Duplicate => "SPAM_DETECTED",
        }
    }

    /// The violation-counter field this rejection increments.
    pub fn violation_kind(self) -> &'static str {
        match self {
            Self::Profanity => "profanity",
            _ => "spam",
        }
    }
}

impl fmt::Display for SpamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "message cannot be empty"),
            Self::TooLong => write!(f, "message too long (max {MAX_MESSAGE_LEN} characters)"),
            Self::Profanity => write!(f, "message contains profanity"),
            Self::UrlSpam => write!(f, "too many URLs in message"),
            Self::Duplicate => write!(f, "duplicate message detected"),
        }
    }
}

/// Content-policy gate over the KV store.
#[derive(Debug, Clone)]
pub struct SpamDetector {
    store: Arc<StoreManager>,
    profanity_enabled: bool,
    duplicate_window: Duration,
    max_urls: usize,
    profanity_words: Vec<String>,
}

impl SpamDetector {
    pub fn new(store: Arc<StoreManager>, config: &SpamConfig) -> Self {
        Self {
            store,
            profanity_enabled: config.profanity_enabled,
            duplicate_window: Duration::from_secs(config.duplicate_window_seconds),
            max_urls: config.max_urls,
            profanity_words: config
                .profanity_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
        }
    }

    /// Run every content check in order. `Ok(None)` means clean; a
    /// rejection reports the first failing rule.
    pub async fn validate(
        &self,
        session_id: &str,
        content: &str,
    ) -> AppResult<Option<SpamReason>> {
        if content.trim().is_empty() {
            return Ok(Some(SpamReason::Empty));
        }
        if content.len() > MAX_MESSAGE_LEN {
            return Ok(Some(SpamReason::TooLong));
        }

        if self.profanity_enabled && self.contains_profanity(content) {
            return Ok(Some(SpamReason::Profanity));
        }

        if url_count(content) > self.max_urls {
            return Ok(Some(SpamReason::UrlSpam));
        }

        if self.is_duplicate(session_id, content).await? {
            return Ok(Some(SpamReason::Duplicate));
        }

        let score = spam_score(content);
        if score >= SCORE_LOG_THRESHOLD {
            debug!(session_id, score, "message passed the gate with a high heuristic score");
        }

        Ok(None)
    }

    fn contains_profanity(&self, content: &str) -> bool {
        let lower = content.to_lowercase();
        self.profanity_words.iter().any(|w| lower.contains(w))
    }

    /// Mark the content digest for this sender; a marker already present
    /// inside the window means a duplicate.
    async fn is_duplicate(&self, session_id: &str, content: &str) -> AppResult<bool> {
        let digest = hex::encode(Sha256::digest(content.as_bytes()));
        let key = keys::spam_digest(session_id, &digest);
        let newly_set = self
            .store
            .set_nx(&key, "1", self.duplicate_window)
            .await?;
        Ok(!newly_set)
    }

    /// Bump a per-session violation counter; counters share a 24h TTL.
    pub async fn increment_violation(&self, session_id: &str, kind: &str) -> AppResult<()> {
        let key = keys::spam_violations(session_id);
        self.store.hincr(&key, kind, 1).await?;
        self.store.expire(&key, Duration::from_secs(24 * 3600)).await?;
        Ok(())
    }

    /// All violation counters for a session.
    pub async fn violation_counts(&self, session_id: &str) -> AppResult<HashMap<String, i64>> {
        let raw = self.store.hgetall(&keys::spam_violations(session_id)).await?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| (k, v.parse().unwrap_or(0)))
            .collect())
    }

    /// Whether this session crossed a ban threshold, and why.
    pub async fn should_ban(&self, session_id: &str) -> AppResult<Option<String>> {
        let violations = self.violation_counts(session_id).await?;

        if violations.get("profanity").copied().unwrap_or(0) >= 3 {
            return Ok(Some("excessive profanity".to_string()));
        }
        if violations.get("spam").copied().unwrap_or(0) >= 5 {
            return Ok(Some("excessive spam".to_string()));
        }

        let total: i64 = violations.values().sum();
        if total >= 10 {
            return Ok(Some("excessive violations".to_string()));
        }

        Ok(None)
    }
}

/// Count URLs the way `https?://[^\s]+` would: at most one match per
/// whitespace-delimited token.
fn url_count(content: &str) -> usize {
    content
        .split_whitespace()
        .filter(|token| token.contains("http://") || token.contains("https://"))
        .count()
}
