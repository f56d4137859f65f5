//! Shared test utilities for the scatterometer wind workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers
//! - A skip macro for optional sample products
//! - Approximate float and coordinate assertions
//! - Swath data generators
//! - In-memory fixtures for every instrument family
//! - Tracing setup for tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{require_test_file, fixtures};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber once per process.
///
/// Honours `RUST_LOG`, defaulting to `debug` for the workspace crates. Output
/// goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("wind_reader=debug,wind_container=debug")
        });
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Macro to skip a test if the required file is not found.
///
/// Real satellite products are large and not redistributable, so tests that
/// need one skip cleanly when it is absent.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_test_file;
///
/// #[test]
/// fn test_ascat_sample() {
///     let path = require_test_file!("ascat_sample.nc");
///     // Test code using path...
/// }
/// ```
///
/// If the file is not found, the test will print a skip message and return early.
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Download test data or set TEST_DATA_DIR.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(20.0004_f64, 20.0_f64, 0.01_f64); // passes
/// assert_approx_eq!(20.5_f32, 20.0_f32, 0.01_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of `(lon, lat)` pairs.
///
/// ```ignore
/// use test_utils::assert_coords_approx_eq;
///
/// assert_coords_approx_eq!((101.0001, 11.0001), (101.0, 11.0), 0.001);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (lon1, lat1): (f64, f64) = $left;
        let (lon2, lat2): (f64, f64) = $right;
        $crate::assert_approx_eq!(lon1, lon2, $epsilon);
        $crate::assert_approx_eq!(lat1, lat2, $epsilon);
    }};
}
