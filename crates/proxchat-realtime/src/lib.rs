//! Real-time engine for the proximity chat server.
//!
//! Provides:
//! - the connection hub: a single-writer registry of live connections
//!   with cell-scoped fan-out and backpressure eviction
//! - the JSON frame protocol spoken over the duplex stream
//! - the ingress pipeline (rate limit → spam gate → log append →
//!   broadcast)
//! - the cross-node pub/sub bridge

pub mod bridge;
pub mod client;
pub mod hub;
pub mod ingress;
pub mod protocol;

pub use client::ClientHandle;
pub use hub::{Hub, HubLoop};
pub use ingress::IngressPipeline;
