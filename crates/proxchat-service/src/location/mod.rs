//! Location index: session → cell binding and nearby queries.

pub mod service;

pub use service::{Location, LocationService, NearbyUser};
