//! # Orrery Testkit
//!
//! Test utilities for Orrery.
//!
//! This crate provides:
//! - The solar-system schema and record fixtures used across test suites
//! - Property-based operation generators using proptest
//! - Graph invariant checks (relationship symmetry, reverse-index agreement)
//! - A failure-injecting bucket and a scripted action target
//! - Tracing initialisation for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orrery_testkit::prelude::*;
//!
//! #[test]
//! fn moons_follow_their_planet() {
//!     init_tracing();
//!     let mut cache = populated_cache();
//!     // ... apply transforms
//!     assert!(symmetry_violations(&cache).is_empty());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buckets;
pub mod fixtures;
pub mod generators;
pub mod invariants;
pub mod targets;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::buckets::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::invariants::*;
    pub use crate::targets::*;
    pub use crate::init_tracing;
}

pub use buckets::*;
pub use fixtures::*;
pub use generators::*;
pub use invariants::*;
pub use targets::*;

/// Installs a `tracing` subscriber that writes to the test output.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Calling this more
/// than once is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
