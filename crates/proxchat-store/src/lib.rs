//! KV store providers for the proximity chat server.
//!
//! Implements the [`KvStore`](proxchat_core::traits::store::KvStore)
//! trait twice, against Redis for production and against an in-memory
//! map for tests and single-node development, and centralizes the key
//! schema shared by every node.

pub mod keys;
pub mod memory;
pub mod provider;
pub mod redis;

pub use provider::StoreManager;
