//! HTTP and WebSocket surface for the proximity chat server.
//!
//! All routes are mounted under `/api` except the duplex stream at
//! `/ws`. The router receives [`state::AppState`] and passes it to all
//! handlers via Axum's `State` extractor.

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
