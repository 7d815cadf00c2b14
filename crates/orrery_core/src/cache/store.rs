//! Record storage and primitive patching.
//!
//! The store is the document the pipeline mutates. It knows nothing about
//! processors or schemas: it can compute the inverse of an operation against
//! its current state and apply an operation as a primitive patch.

use crate::error::{CoreError, CoreResult};
use crate::operation::Operation;
use crate::record::{Record, RelationshipState};
use crate::types::RecordIdentity;
use std::collections::{BTreeMap, BTreeSet};

/// Normalized records keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: BTreeMap<RecordIdentity, Record>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a record.
    pub fn get(&self, identity: &RecordIdentity) -> Option<&Record> {
        self.records.get(identity)
    }

    /// Returns true if the record exists.
    pub fn contains(&self, identity: &RecordIdentity) -> bool {
        self.records.contains_key(identity)
    }

    /// Returns every record of one type, ordered by id.
    pub fn of_kind<'s, 'k>(&'s self, kind: &'k str) -> impl Iterator<Item = &'s Record> + 'k
    where
        's: 'k,
    {
        self.records
            .iter()
            .filter(move |(identity, _)| identity.kind == kind)
            .map(|(_, record)| record)
    }

    /// Returns every record.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replaces the whole content of the store.
    pub(crate) fn replace_all(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records = records
            .into_iter()
            .map(|record| (record.identity.clone(), record))
            .collect();
    }

    /// Returns the relationship state of a record, if both exist.
    pub fn relationship(&self, identity: &RecordIdentity, name: &str) -> Option<&RelationshipState> {
        self.get(identity).and_then(|record| record.relationship(name))
    }

    /// Computes the operation that undoes `op` against the current state.
    ///
    /// Returns `None` when `op` would have no observable effect. Fails when a
    /// non-add operation targets a record that does not exist.
    pub fn inverse_of(&self, op: &Operation) -> CoreResult<Option<Operation>> {
        let inverse = match op {
            Operation::AddRecord { record } => match self.get(&record.identity) {
                None => Some(Operation::remove_record(record.identity.clone())),
                Some(current) if current == record => None,
                Some(current) => Some(Operation::add_record(current.clone())),
            },
            Operation::UpdateRecord { record } => {
                let current = self.require(&record.identity)?;
                if merged(current, record) == *current {
                    None
                } else {
                    Some(Operation::add_record(current.clone()))
                }
            }
            Operation::RemoveRecord { record } => self
                .get(record)
                .map(|current| Operation::add_record(current.clone())),
            Operation::ReplaceAttribute {
                record,
                attribute,
                value,
            } => {
                let current = self.require(record)?.attribute(attribute);
                (current != value).then(|| {
                    Operation::replace_attribute(record.clone(), attribute.clone(), current.clone())
                })
            }
            Operation::ReplaceKey { record, key, value } => {
                let current = self.require(record)?.keys.get(key);
                (current != value.as_ref())
                    .then(|| Operation::replace_key(record.clone(), key.clone(), current.cloned()))
            }
            Operation::AddToRelatedRecords {
                record,
                relationship,
                related,
            } => {
                let present = self.member_of(record, relationship, related)?;
                (!present).then(|| {
                    Operation::remove_from_related_records(
                        record.clone(),
                        relationship.clone(),
                        related.clone(),
                    )
                })
            }
            Operation::RemoveFromRelatedRecords {
                record,
                relationship,
                related,
            } => {
                let present = self.member_of(record, relationship, related)?;
                present.then(|| {
                    Operation::add_to_related_records(
                        record.clone(),
                        relationship.clone(),
                        related.clone(),
                    )
                })
            }
            Operation::ReplaceRelatedRecord {
                record,
                relationship,
                related,
            } => {
                let current = match self.require(record)?.relationship(relationship) {
                    Some(RelationshipState::HasOne(current)) => current.clone(),
                    _ => None,
                };
                (current != *related).then(|| {
                    Operation::replace_related_record(record.clone(), relationship.clone(), current)
                })
            }
            Operation::ReplaceRelatedRecords {
                record,
                relationship,
                related,
            } => {
                let current: BTreeSet<RecordIdentity> =
                    match self.require(record)?.relationship(relationship) {
                        Some(RelationshipState::HasMany(current)) => current.clone(),
                        _ => BTreeSet::new(),
                    };
                let target: BTreeSet<RecordIdentity> = related.iter().cloned().collect();
                (current != target).then(|| {
                    Operation::replace_related_records(record.clone(), relationship.clone(), current)
                })
            }
        };
        Ok(inverse)
    }

    /// Applies `op` as a primitive patch.
    pub fn patch(&mut self, op: &Operation) -> CoreResult<()> {
        match op {
            Operation::AddRecord { record } => {
                self.records.insert(record.identity.clone(), record.clone());
            }
            Operation::UpdateRecord { record } => {
                let current = self.require_mut(&record.identity)?;
                *current = merged(current, record);
            }
            Operation::RemoveRecord { record } => {
                self.records.remove(record);
            }
            Operation::ReplaceAttribute {
                record,
                attribute,
                value,
            } => {
                self.require_mut(record)?
                    .set_attribute(attribute.clone(), value.clone());
            }
            Operation::ReplaceKey { record, key, value } => {
                self.require_mut(record)?.set_key(key.clone(), value.clone());
            }
            Operation::AddToRelatedRecords {
                record,
                relationship,
                related,
            } => {
                let state = self
                    .require_mut(record)?
                    .relationships
                    .entry(relationship.clone())
                    .or_insert_with(|| RelationshipState::HasMany(BTreeSet::new()));
                match state {
                    RelationshipState::HasMany(members) => {
                        members.insert(related.clone());
                    }
                    RelationshipState::HasOne(_) => {
                        *state = RelationshipState::many([related.clone()]);
                    }
                }
            }
            Operation::RemoveFromRelatedRecords {
                record,
                relationship,
                related,
            } => {
                if let Some(RelationshipState::HasMany(members)) =
                    self.require_mut(record)?.relationships.get_mut(relationship)
                {
                    members.remove(related);
                }
            }
            Operation::ReplaceRelatedRecord {
                record,
                relationship,
                related,
            } => {
                self.require_mut(record)?
                    .relationships
                    .insert(relationship.clone(), RelationshipState::HasOne(related.clone()));
            }
            Operation::ReplaceRelatedRecords {
                record,
                relationship,
                related,
            } => {
                self.require_mut(record)?.relationships.insert(
                    relationship.clone(),
                    RelationshipState::many(related.iter().cloned()),
                );
            }
        }
        Ok(())
    }

    fn require(&self, identity: &RecordIdentity) -> CoreResult<&Record> {
        self.records
            .get(identity)
            .ok_or_else(|| CoreError::record_not_found(identity))
    }

    fn require_mut(&mut self, identity: &RecordIdentity) -> CoreResult<&mut Record> {
        self.records
            .get_mut(identity)
            .ok_or_else(|| CoreError::record_not_found(identity))
    }

    fn member_of(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
        related: &RecordIdentity,
    ) -> CoreResult<bool> {
        Ok(self
            .require(identity)?
            .relationship(relationship)
            .is_some_and(|state| state.contains(related)))
    }
}

/// Merges the fields present in `update` into a copy of `current`.
fn merged(current: &Record, update: &Record) -> Record {
    let mut result = current.clone();
    for (name, value) in &update.attributes {
        result.set_attribute(name.clone(), value.clone());
    }
    for (name, value) in &update.keys {
        result.keys.insert(name.clone(), value.clone());
    }
    for (name, state) in &update.relationships {
        result.relationships.insert(name.clone(), state.clone());
    }
    result
}
