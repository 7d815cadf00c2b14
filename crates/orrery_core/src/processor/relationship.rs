//! Keeps both sides of every reciprocal relationship in agreement.

use super::{Processor, ProcessorContext};
use crate::error::CoreResult;
use crate::operation::Operation;
use crate::record::RelationshipState;
use crate::schema::RelationshipKind;
use crate::types::RecordIdentity;
use std::collections::BTreeSet;

/// Mirrors relationship changes onto the inverse side.
///
/// When a link from `owner.rel` to `related` disappears, the owner is
/// removed from `related.inverse`; when one appears, it is added. Removing a
/// record clears every reference to it. Related records that do not exist
/// are left alone.
#[derive(Debug, Default)]
pub struct RelationshipProcessor;

impl RelationshipProcessor {
    /// Creates the processor.
    pub fn new() -> Self {
        Self
    }
}

impl Processor for RelationshipProcessor {
    fn name(&self) -> &'static str {
        "relationship"
    }

    fn after(&mut self, ctx: &mut ProcessorContext<'_>, op: &Operation) -> CoreResult<Vec<Operation>> {
        let mut ops = Vec::new();
        match op {
            Operation::AddRecord { record } | Operation::UpdateRecord { record } => {
                let owner = &record.identity;
                for (name, state) in &record.relationships {
                    let keep: BTreeSet<&RecordIdentity> = state.members().into_iter().collect();
                    for old in current_members(ctx, owner, name) {
                        if !keep.contains(&old) {
                            ops.extend(unlink(ctx, owner, name, &old));
                        }
                    }
                }
                // A replaced record drops relationships the new value omits.
                if matches!(op, Operation::AddRecord { .. }) {
                    if let Some(current) = ctx.records().get(owner) {
                        for name in current.relationships.keys() {
                            if record.relationships.contains_key(name) {
                                continue;
                            }
                            for old in current_members(ctx, owner, name) {
                                ops.extend(unlink(ctx, owner, name, &old));
                            }
                        }
                    }
                }
            }
            Operation::RemoveRecord { record } => {
                for link in ctx.links().links_to(record) {
                    if link.record == *record {
                        continue;
                    }
                    let Some(state) = ctx.records().relationship(&link.record, &link.relationship) else {
                        continue;
                    };
                    ops.extend(drop_reference(state, &link.record, &link.relationship, record));
                }
            }
            Operation::RemoveFromRelatedRecords {
                record,
                relationship,
                related,
            } => {
                ops.extend(unlink(ctx, record, relationship, related));
            }
            Operation::ReplaceRelatedRecord {
                record,
                relationship,
                related,
            } => {
                for old in current_members(ctx, record, relationship) {
                    if Some(&old) != related.as_ref() {
                        ops.extend(unlink(ctx, record, relationship, &old));
                    }
                }
            }
            Operation::ReplaceRelatedRecords {
                record,
                relationship,
                related,
            } => {
                for old in current_members(ctx, record, relationship) {
                    if !related.contains(&old) {
                        ops.extend(unlink(ctx, record, relationship, &old));
                    }
                }
            }
            Operation::ReplaceAttribute { .. }
            | Operation::ReplaceKey { .. }
            | Operation::AddToRelatedRecords { .. } => {}
        }
        Ok(ops)
    }

    fn finally(&mut self, ctx: &mut ProcessorContext<'_>, op: &Operation) -> CoreResult<Vec<Operation>> {
        let mut ops = Vec::new();
        match op {
            Operation::AddRecord { record } | Operation::UpdateRecord { record } => {
                let owner = &record.identity;
                for name in record.relationships.keys() {
                    for member in current_members(ctx, owner, name) {
                        ops.extend(link(ctx, owner, name, &member));
                    }
                }
                if matches!(op, Operation::AddRecord { .. }) {
                    ops.extend(adopt_inbound(ctx, owner));
                }
            }
            Operation::AddToRelatedRecords {
                record,
                relationship,
                related,
            } => {
                ops.extend(link(ctx, record, relationship, related));
            }
            Operation::ReplaceRelatedRecord {
                record,
                relationship,
                related: Some(related),
            } => {
                ops.extend(link(ctx, record, relationship, related));
            }
            Operation::ReplaceRelatedRecords {
                record,
                relationship,
                related,
            } => {
                for member in related {
                    ops.extend(link(ctx, record, relationship, member));
                }
            }
            _ => {}
        }
        Ok(ops)
    }
}

/// Members of `owner.relationship` as currently stored.
fn current_members(ctx: &ProcessorContext<'_>, owner: &RecordIdentity, relationship: &str) -> Vec<RecordIdentity> {
    ctx.records()
        .relationship(owner, relationship)
        .map(|state| state.members().into_iter().cloned().collect())
        .unwrap_or_default()
}

/// The name of the reciprocal of `owner.relationship`, if declared.
fn inverse_name(ctx: &ProcessorContext<'_>, owner: &RecordIdentity, relationship: &str) -> Option<String> {
    ctx.schema()
        .relationship(&owner.kind, relationship)
        .ok()
        .and_then(|def| def.inverse.clone())
}

/// Removes `owner` from the inverse side of `owner.relationship` on `related`.
fn unlink(
    ctx: &ProcessorContext<'_>,
    owner: &RecordIdentity,
    relationship: &str,
    related: &RecordIdentity,
) -> Option<Operation> {
    let inverse = inverse_name(ctx, owner, relationship)?;
    let state = ctx.records().relationship(related, &inverse)?;
    drop_reference(state, related, &inverse, owner)
}

/// Adds `owner` to the inverse side of `owner.relationship` on `related`.
fn link(
    ctx: &ProcessorContext<'_>,
    owner: &RecordIdentity,
    relationship: &str,
    related: &RecordIdentity,
) -> Option<Operation> {
    let inverse = inverse_name(ctx, owner, relationship)?;
    let related_record = ctx.records().get(related)?;
    let def = ctx.schema().relationship(&related.kind, &inverse).ok()?;
    let state = related_record.relationship(&inverse);

    match def.kind {
        RelationshipKind::HasMany => {
            let present = state.is_some_and(|state| state.contains(owner));
            (!present).then(|| Operation::add_to_related_records(related.clone(), inverse, owner.clone()))
        }
        RelationshipKind::HasOne => {
            let present = matches!(state, Some(RelationshipState::HasOne(Some(current))) if current == owner);
            (!present).then(|| Operation::replace_related_record(related.clone(), inverse, Some(owner.clone())))
        }
    }
}

/// Mirrors links that other records already hold to a newly stored `owner`.
///
/// A reference that conflicts with an occupied hasOne on `owner` is dropped
/// from the referrer instead.
fn adopt_inbound(ctx: &ProcessorContext<'_>, owner: &RecordIdentity) -> Vec<Operation> {
    let mut ops = Vec::new();
    for inbound in ctx.links().links_to(owner) {
        if inbound.record == *owner {
            continue;
        }
        let Some(inverse) = inverse_name(ctx, &inbound.record, &inbound.relationship) else {
            continue;
        };
        match ctx.records().relationship(owner, &inverse) {
            Some(RelationshipState::HasOne(Some(current))) if *current != inbound.record => {
                if let Some(state) = ctx.records().relationship(&inbound.record, &inbound.relationship) {
                    ops.extend(drop_reference(state, &inbound.record, &inbound.relationship, owner));
                }
            }
            _ => ops.extend(link(ctx, &inbound.record, &inbound.relationship, owner)),
        }
    }
    ops
}

/// The operation that removes `target` from `holder.relationship`, given
/// the relationship's current `state`.
fn drop_reference(
    state: &RelationshipState,
    holder: &RecordIdentity,
    relationship: &str,
    target: &RecordIdentity,
) -> Option<Operation> {
    match state {
        RelationshipState::HasMany(members) if members.contains(target) => Some(
            Operation::remove_from_related_records(holder.clone(), relationship, target.clone()),
        ),
        RelationshipState::HasOne(Some(current)) if current == target => {
            Some(Operation::replace_related_record(holder.clone(), relationship, None))
        }
        _ => None,
    }
}
