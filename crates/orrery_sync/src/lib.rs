//! # Orrery Sync
//!
//! Sources, log coordination and durable action queues for Orrery.
//!
//! This crate provides:
//! - The [`Source`] trait and [`MemorySource`], a record graph paired with
//!   its transform log
//! - The [`Coordinator`], which prunes history every registered source has
//!   already seen
//! - The [`ActionQueue`], a persisted FIFO of [`Action`]s performed one at a
//!   time against an [`ActionTarget`]
//!
//! ## Key Invariants
//!
//! - A source logs a transform only after applying it successfully
//! - The coordinator only removes log entries shared, at the same positions,
//!   by every registered source
//! - An action queue never runs two actions concurrently
//! - A failed action halts its queue until an operator intervenes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod config;
mod coordinator;
mod error;
mod queue;
mod source;

pub use action::{Action, ActionError, ActionTarget};
pub use config::QueueConfig;
pub use coordinator::Coordinator;
pub use error::{SyncError, SyncResult};
pub use queue::{ActionQueue, ProcessOutcome, QueueEvent};
pub use source::{MemorySource, Source, SourceEvent};
