//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use proxchat_core::config::AppConfig;
use proxchat_realtime::hub::Hub;
use proxchat_service::location::LocationService;
use proxchat_service::message::MessageStore;
use proxchat_service::ratelimit::RateLimiter;
use proxchat_service::session::SessionService;
use proxchat_service::spam::SpamDetector;
use proxchat_store::StoreManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// KV store (Redis or in-memory).
    pub store: Arc<StoreManager>,
    /// Session registry.
    pub sessions: Arc<SessionService>,
    /// Location index.
    pub locations: Arc<LocationService>,
    /// Per-cell message log.
    pub messages: Arc<MessageStore>,
    /// Rate-limit gate.
    pub limiter: Arc<RateLimiter>,
    /// Spam gate.
    pub spam: Arc<SpamDetector>,
    /// Connection hub.
    pub hub: Arc<Hub>,
    /// Process-wide shutdown handle.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the full service graph over a store and a hub.
    pub fn new(
        config: AppConfig,
        store: Arc<StoreManager>,
        hub: Arc<Hub>,
        shutdown: CancellationToken,
    ) -> Self {
        let sessions = Arc::new(SessionService::new(
            store.clone(),
            &config.session,
            &config.ratelimit,
        ));
        let locations = Arc::new(LocationService::new(store.clone(), &config.geo));
        let messages = Arc::new(MessageStore::new(
            store.clone(),
            config.chat.message_ttl_minutes,
        ));
        let limiter = Arc::new(RateLimiter::new(store.clone(), config.ratelimit.clone()));
        let spam = Arc::new(SpamDetector::new(store.clone(), &config.spam));

        Self {
            config: Arc::new(config),
            store,
            sessions,
            locations,
            messages,
            limiter,
            spam,
            hub,
            shutdown,
        }
    }
}
