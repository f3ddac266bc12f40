//! Anonymous session registry.

pub mod service;
pub mod username;

pub use service::{Session, SessionService};
