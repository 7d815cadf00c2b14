//! # Orrery Core
//!
//! Record graph, operation processors and transform log for Orrery.
//!
//! This crate provides:
//! - Normalized records keyed by `(type, id)` and a read-only schema lookup
//! - Operations and transforms as plain, serializable data
//! - The record graph ([`Cache`]) with its before/after/finally processor
//!   pipeline and inverse-operation bookkeeping
//! - The two standard processors: relationship consistency and the reverse
//!   index
//! - The per-source [`TransformLog`], optionally persisted to a bucket
//! - Typed event feeds for every component that announces changes
//!
//! ## Key Invariants
//!
//! - Redundant operations are detected and skipped before any hook runs
//! - Declared inverse relationships are symmetric once a transform settles
//! - Every applied transform can be undone from its inverse operations
//! - A failing transform leaves no partial state behind
//! - A transform log never holds the same id twice

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod events;
mod log;
mod operation;
pub mod processor;
mod record;
mod schema;
mod types;
mod value;

pub use cache::{Cache, CacheEvent, InverseLink, InverseLinks, Query, QueryResult, RecordStore};
pub use config::{CacheConfig, LogConfig, ProcessorSet};
pub use error::{CoreError, CoreResult};
pub use events::{EventFeed, Subscription, SubscriptionId};
pub use log::{LogEvent, TransformLog};
pub use operation::{Operation, Transform};
pub use processor::{Processor, ProcessorContext, RelationshipProcessor, ReverseIndexProcessor};
pub use record::{Record, RelationshipState};
pub use schema::{ModelDef, RelationshipDef, RelationshipKind, Schema, SchemaBuilder};
pub use types::{RecordIdentity, TransformId};
pub use value::Value;
