//! Domain services for the proximity chat server.
//!
//! Everything stateful here is written against the `KvStore` trait and
//! owns its slice of the key schema: session records, location records
//! and cell memberships, per-cell message logs, rate-limit windows, and
//! spam-gate state.

pub mod location;
pub mod message;
pub mod ratelimit;
pub mod session;
pub mod spam;
pub mod sweeper;
pub mod validation;
