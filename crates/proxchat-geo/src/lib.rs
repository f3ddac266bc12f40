//! Spatial codec for the proximity chat server.
//!
//! Fixed-precision geohash over the Morton-interleaved (lon, lat) bit
//! stream, plus great-circle distance math. Cells of identical precision
//! tile the surface; at the default precision 7 a cell is roughly 150 m
//! across.

pub mod distance;
pub mod geohash;

pub use distance::{haversine_m, round_to_50};
pub use geohash::{decode, encode, neighbors, BoundingBox};
