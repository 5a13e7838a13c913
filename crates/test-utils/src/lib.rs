//! Shared test utilities for the system-data workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Component fixtures (generators, loads, buses) with forecast support
//! - Forecast series generators
//! - Registry and descriptor file helpers
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
//! use test_utils::{fixtures::ThermalGenerator, test_registry};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

use std::path::PathBuf;
use std::sync::Arc;

use series_storage::InMemoryStorage;
use system_data::{ComponentRegistry, ValidationDescriptors};
use tempfile::TempDir;

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Registry over a fresh in-memory backend without field validation.
///
/// The backend handle is returned for inspecting its statistics.
pub fn test_registry() -> (ComponentRegistry, Arc<InMemoryStorage>) {
    let storage = Arc::new(InMemoryStorage::new());
    let registry = ComponentRegistry::new(storage.clone(), ValidationDescriptors::default());
    (registry, storage)
}

/// Write a descriptor YAML file into a fresh temporary directory.
///
/// Keep the returned `TempDir` alive while the file is in use.
pub fn write_descriptors_file(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("validation_descriptors.yaml");
    std::fs::write(&path, contents).expect("failed to write descriptors");
    (dir, path)
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f64, 1.0_f64, 0.001_f64);    // fails
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

/// Element-wise approximate equality of two value slices.
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = $left;
        let right: &[f64] = $right;
        assert_eq!(left.len(), right.len(), "value slices differ in length");
        for (l, r) in left.iter().zip(right.iter()) {
            $crate::assert_approx_eq!(*l, *r, $epsilon);
        }
    }};
}
