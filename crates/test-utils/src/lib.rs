//! Shared test utilities for the gridded-io workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Record and image generators with predictable values
//! - Small grid topologies and configurations
//! - Scratch directories for dataset files
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
//! use test_utils::{create_static_table, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

#[doc(hidden)]
pub use gridded_io;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
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

/// Assert that a `Result` failed with the given `DatasetError` variant.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_dataset_err;
///
/// assert_dataset_err!(store.read(1), ModeMismatch { .. });
/// assert_dataset_err!(dataset.read(99), UnknownGridPoint(99));
/// ```
#[macro_export]
macro_rules! assert_dataset_err {
    ($result:expr, $($variant:tt)+) => {{
        match $result {
            Err($crate::gridded_io::DatasetError::$($variant)+) => {}
            Err(other) => panic!(
                "expected DatasetError::{}, got error: {}",
                stringify!($($variant)+),
                other
            ),
            Ok(_) => panic!("expected DatasetError::{}, got Ok", stringify!($($variant)+)),
        }
    }};
}

#[cfg(test)]
mod tests {
    use gridded_io::DatasetError;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_dataset_err_matches_variant() {
        let result: Result<(), DatasetError> = Err(DatasetError::UnknownGridPoint(7));
        assert_dataset_err!(result, UnknownGridPoint(7));
    }

    #[test]
    #[should_panic(expected = "got Ok")]
    fn test_assert_dataset_err_rejects_ok() {
        let result: Result<(), DatasetError> = Ok(());
        assert_dataset_err!(result, NotOpen(_));
    }
}
