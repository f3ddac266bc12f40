//! Per-address request rate limiting.
//!
//! Backed by the KV sliding window so the limit holds across sibling
//! nodes, unlike a process-local bucket.

use std::net::SocketAddr;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::error;

use proxchat_core::error::AppError;

use crate::extractors::addr::resolve_addr;
use crate::state::AppState;

/// Deny requests from addresses over their per-minute window.
pub async fn ip_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let addr = resolve_addr(request.headers(), peer);

    match state.limiter.allow_ip_request(&addr).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            AppError::rate_limit("Rate limit exceeded. Please try again later.").into_response()
        }
        Err(e) => {
            error!(error = %e, "rate-limit check failed");
            AppError::internal("Failed to check rate limit").into_response()
        }
    }
}
