//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate, with `PROXCHAT`-prefixed environment variables as the
//! final overlay. Each sub-module represents a logical section.

pub mod app;
pub mod chat;
pub mod geo;
pub mod logging;
pub mod ratelimit;
pub mod realtime;
pub mod session;
pub mod spam;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::chat::ChatConfig;
pub use self::geo::GeoConfig;
pub use self::logging::LoggingConfig;
pub use self::ratelimit::RateLimitConfig;
pub use self::realtime::RealtimeConfig;
pub use self::session::SessionConfig;
pub use self::spam::SpamConfig;
pub use self::store::{MemoryStoreConfig, RedisStoreConfig, StoreConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// The top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// KV store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Message log settings.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Rate-limit windows and caps.
    #[serde(default)]
    pub ratelimit: RateLimitConfig,
    /// Spam gate settings.
    #[serde(default)]
    pub spam: SpamConfig,
    /// Geohash and radius settings.
    #[serde(default)]
    pub geo: GeoConfig,
    /// WebSocket engine settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            session: SessionConfig::default(),
            chat: ChatConfig::default(),
            ratelimit: RateLimitConfig::default(),
            spam: SpamConfig::default(),
            geo: GeoConfig::default(),
            realtime: RealtimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific
    /// overlay and environment variables prefixed with `PROXCHAT`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PROXCHAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
