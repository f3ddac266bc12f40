//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// WebSocket engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound frame queue capacity per connection. A client whose
    /// queue overflows is evicted rather than awaited.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Inbound read deadline in seconds; refreshed by any inbound frame.
    #[serde(default = "default_read_deadline")]
    pub read_deadline_seconds: u64,
    /// Write deadline per outbound frame in seconds.
    #[serde(default = "default_write_deadline")]
    pub write_deadline_seconds: u64,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl RealtimeConfig {
    /// Keepalive ping period: 90% of the read deadline, so the peer's
    /// deadline is always refreshed before it can fire.
    pub fn ping_period_seconds(&self) -> u64 {
        self.read_deadline_seconds * 9 / 10
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            read_deadline_seconds: default_read_deadline(),
            write_deadline_seconds: default_write_deadline(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_read_deadline() -> u64 {
    60
}

fn default_write_deadline() -> u64 {
    10
}

fn default_max_frame_bytes() -> usize {
    512
}
