//! Maintains the reverse index of relationship links.

use super::{Processor, ProcessorContext};
use crate::cache::InverseLink;
use crate::error::CoreResult;
use crate::operation::Operation;
use crate::types::RecordIdentity;

/// Keeps [`crate::cache::InverseLinks`] equal to the links held by the
/// records.
///
/// Links an operation may drop are removed in `after`, while the old state
/// is still visible; links that hold once the operation is in place are
/// (re-)added in `finally`.
#[derive(Debug, Default)]
pub struct ReverseIndexProcessor;

impl ReverseIndexProcessor {
    /// Creates the processor.
    pub fn new() -> Self {
        Self
    }
}

impl Processor for ReverseIndexProcessor {
    fn name(&self) -> &'static str {
        "reverse-index"
    }

    fn after(&mut self, ctx: &mut ProcessorContext<'_>, op: &Operation) -> CoreResult<Vec<Operation>> {
        let view: &ProcessorContext<'_> = ctx;
        let owner = op.target();
        let stale = match op {
            Operation::AddRecord { .. } | Operation::RemoveRecord { .. } => outbound(view, owner, None),
            Operation::UpdateRecord { record } => record
                .relationships
                .keys()
                .flat_map(|name| outbound(view, owner, Some(name.as_str())))
                .collect(),
            Operation::RemoveFromRelatedRecords {
                relationship,
                related,
                ..
            } => vec![(related.clone(), InverseLink::new(owner.clone(), relationship.as_str()))],
            Operation::ReplaceRelatedRecord { relationship, .. }
            | Operation::ReplaceRelatedRecords { relationship, .. } => {
                outbound(view, owner, Some(relationship.as_str()))
            }
            Operation::ReplaceAttribute { .. }
            | Operation::ReplaceKey { .. }
            | Operation::AddToRelatedRecords { .. } => Vec::new(),
        };

        for (target, link) in &stale {
            ctx.links_mut().remove(target, link);
        }
        Ok(Vec::new())
    }

    fn finally(&mut self, ctx: &mut ProcessorContext<'_>, op: &Operation) -> CoreResult<Vec<Operation>> {
        let view: &ProcessorContext<'_> = ctx;
        let owner = op.target();
        let current = match op {
            Operation::AddRecord { .. } => outbound(view, owner, None),
            Operation::UpdateRecord { record } => record
                .relationships
                .keys()
                .flat_map(|name| outbound(view, owner, Some(name.as_str())))
                .collect(),
            Operation::AddToRelatedRecords { relationship, .. }
            | Operation::ReplaceRelatedRecord { relationship, .. }
            | Operation::ReplaceRelatedRecords { relationship, .. } => {
                outbound(view, owner, Some(relationship.as_str()))
            }
            _ => Vec::new(),
        };

        for (target, link) in current {
            ctx.links_mut().add(target, link);
        }
        Ok(Vec::new())
    }

    fn reset(&mut self, ctx: &mut ProcessorContext<'_>) {
        let records = ctx.records();
        ctx.links_mut().rebuild(records);
    }
}

/// Links currently held by `owner`, optionally limited to one relationship,
/// as `(target, link)` pairs.
fn outbound(
    ctx: &ProcessorContext<'_>,
    owner: &RecordIdentity,
    relationship: Option<&str>,
) -> Vec<(RecordIdentity, InverseLink)> {
    let Some(record) = ctx.records().get(owner) else {
        return Vec::new();
    };
    record
        .links()
        .filter(|(name, _)| relationship.map_or(true, |only| only == *name))
        .map(|(name, target)| (target.clone(), InverseLink::new(owner.clone(), name)))
        .collect()
}
