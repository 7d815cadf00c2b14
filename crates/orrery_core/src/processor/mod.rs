//! Operation processors.
//!
//! A processor observes every effective operation the record graph applies
//! and may answer with further operations at three points:
//!
//! - `before`: applied (recursively) before the operation is patched
//! - `after`: computed against the state *before* the patch, applied after it
//! - `finally`: computed and applied once the operation and its `after`
//!   operations are in place
//!
//! Processors run in registration order. Operations they emit pass through
//! the same pipeline, so a processor sees the consequences of its own
//! output. Redundant emissions are harmless: operations with no effect are
//! dropped before any hook runs.

mod relationship;
mod reverse_index;

pub use relationship::RelationshipProcessor;
pub use reverse_index::ReverseIndexProcessor;

use crate::cache::{InverseLinks, RecordStore};
use crate::error::CoreResult;
use crate::operation::Operation;
use crate::schema::Schema;

/// The view of the record graph handed to processor hooks.
///
/// Records are read-only; processors change them only by emitting
/// operations. The reverse index is writable so that its processor can keep
/// it in step with the records.
pub struct ProcessorContext<'a> {
    schema: &'a Schema,
    records: &'a RecordStore,
    links: &'a mut InverseLinks,
}

impl<'a> ProcessorContext<'a> {
    pub(crate) fn new(schema: &'a Schema, records: &'a RecordStore, links: &'a mut InverseLinks) -> Self {
        Self {
            schema,
            records,
            links,
        }
    }

    /// Returns the schema.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Returns the current records.
    pub fn records(&self) -> &'a RecordStore {
        self.records
    }

    /// Returns the reverse index.
    pub fn links(&self) -> &InverseLinks {
        self.links
    }

    /// Returns the reverse index for mutation.
    pub fn links_mut(&mut self) -> &mut InverseLinks {
        self.links
    }
}

/// A hook into the record graph pipeline.
pub trait Processor: Send {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Operations to apply before `op` is patched.
    fn before(&mut self, _ctx: &mut ProcessorContext<'_>, _op: &Operation) -> CoreResult<Vec<Operation>> {
        Ok(Vec::new())
    }

    /// Operations to apply after `op` is patched, computed before the patch.
    fn after(&mut self, _ctx: &mut ProcessorContext<'_>, _op: &Operation) -> CoreResult<Vec<Operation>> {
        Ok(Vec::new())
    }

    /// Operations to apply once `op` and its `after` operations are in place.
    fn finally(&mut self, _ctx: &mut ProcessorContext<'_>, _op: &Operation) -> CoreResult<Vec<Operation>> {
        Ok(Vec::new())
    }

    /// Rebuilds any derived state after the records were changed outside the
    /// pipeline (reset, rollback, or a failed transform being undone).
    fn reset(&mut self, _ctx: &mut ProcessorContext<'_>) {}
}

/// Returns the standard processors, in registration order.
pub fn standard_processors() -> Vec<Box<dyn Processor>> {
    vec![
        Box::new(RelationshipProcessor::new()),
        Box::new(ReverseIndexProcessor::new()),
    ]
}
