//! # Orrery Bucket
//!
//! Async key-value persistence for Orrery.
//!
//! This crate provides the lowest-level durability abstraction used by the
//! transform log and the action queue. Buckets are **opaque byte stores**:
//! they map string keys to byte values and do not interpret what they hold.
//!
//! ## Design Principles
//!
//! - Buckets are simple key-value stores (get, set, remove)
//! - Every call is asynchronous so disk and browser-style stores fit
//! - Must be `Send + Sync` so a bucket can be shared behind an `Arc`
//! - Callers own the encoding; [`get_value`] and [`set_value`] offer CBOR
//!
//! ## Available Buckets
//!
//! - [`InMemoryBucket`] - For testing and ephemeral state
//! - [`FileBucket`] - One file per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use orrery_bucket::{Bucket, InMemoryBucket};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bucket = InMemoryBucket::new();
//! bucket.set_item("greeting", b"hello".to_vec()).await.unwrap();
//! let data = bucket.get_item("greeting").await.unwrap();
//! assert_eq!(data.as_deref(), Some(&b"hello"[..]));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod error;
mod file;
mod memory;

pub use bucket::{get_value, set_value, Bucket};
pub use error::{BucketError, BucketResult};
pub use file::FileBucket;
pub use memory::InMemoryBucket;
