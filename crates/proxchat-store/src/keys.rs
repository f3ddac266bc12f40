//! Key builders for every store entry.
//!
//! Centralising key construction prevents typos and makes it easy to
//! find every key the application uses. The schema is shared by all
//! nodes pointing at the same backend.

/// Key for a session record.
pub fn session(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Key for a location record.
pub fn location(session_id: &str) -> String {
    format!("location:{session_id}")
}

/// Key for the membership set of a cell.
pub fn cell(cell: &str) -> String {
    format!("cell:{cell}")
}

/// Key for the per-cell message log (sorted set scored by send time).
pub fn messages(cell: &str) -> String {
    format!("messages:{cell}")
}

// ── Rate limiting ──────────────────────────────────────────────

/// Sliding window of chat messages for a session.
pub fn ratelimit_messages(session_id: &str) -> String {
    format!("ratelimit:msg:{session_id}")
}

/// Sliding window of location updates for a session.
pub fn ratelimit_location(session_id: &str) -> String {
    format!("ratelimit:location:{session_id}")
}

/// Username-change counter for a session.
pub fn ratelimit_username(session_id: &str) -> String {
    format!("ratelimit:username:{session_id}")
}

/// Session-creation counter for an address.
pub fn ip_sessions(addr: &str) -> String {
    format!("ratelimit:ip:{addr}:sessions")
}

/// Sliding window of HTTP requests for an address.
pub fn ip_requests(addr: &str) -> String {
    format!("ratelimit:ip:{addr}:requests")
}

/// Set of live connection ids for an address.
pub fn ip_connections(addr: &str) -> String {
    format!("ratelimit:ip:{addr}:connections")
}

// ── Spam gate ──────────────────────────────────────────────────

/// Duplicate-content marker for a session and content digest.
pub fn spam_digest(session_id: &str, digest: &str) -> String {
    format!("spam:msg:{session_id}:{digest}")
}

/// Violation counters hash for a session.
pub fn spam_violations(session_id: &str) -> String {
    format!("spam:violations:{session_id}")
}

// ── Realtime ───────────────────────────────────────────────────

/// Set of sessions with a live connection, across all nodes.
pub fn ws_active() -> String {
    "ws:active".to_string()
}

/// Pub/sub channel for a cell's chat traffic.
pub fn chat_channel(cell: &str) -> String {
    format!("chat:{cell}")
}

/// Subscription pattern covering every cell's chat channel.
pub fn chat_pattern() -> String {
    "chat:*".to_string()
}
