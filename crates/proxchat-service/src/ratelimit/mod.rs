//! Sliding-window and counter-based admission checks.

pub mod limiter;

pub use limiter::RateLimiter;
