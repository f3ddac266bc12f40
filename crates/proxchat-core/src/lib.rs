//! # proxchat-core
//!
//! Core crate for the proximity chat server. Contains configuration
//! schemas, the unified error system, API response envelope types, and
//! the `KvStore` trait that every stateful service is written against.
//!
//! This crate has **no** internal dependencies on other proxchat crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
