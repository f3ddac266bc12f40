//! Custom Axum extractors.

pub mod addr;
pub mod json;

pub use addr::ClientAddr;
pub use json::AppJson;
