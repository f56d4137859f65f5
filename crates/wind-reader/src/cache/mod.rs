//! Cache implementations for wind reading.

mod bounds_cache;

pub use bounds_cache::{BoundsCache, BoundsKey};
