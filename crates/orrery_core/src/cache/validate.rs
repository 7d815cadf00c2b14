//! Schema validation of operations.

use crate::error::{CoreError, CoreResult};
use crate::operation::Operation;
use crate::record::Record;
use crate::schema::{ModelDef, RelationshipDef, RelationshipKind, Schema};
use crate::types::RecordIdentity;

/// Checks that every model, attribute, key and relationship `op` names is
/// defined, that relationship operations match the declared cardinality, and
/// that related records are of the declared model.
pub(crate) fn validate_operation(schema: &Schema, op: &Operation) -> CoreResult<()> {
    let target = op.target();
    let model = schema.model(&target.kind)?;

    match op {
        Operation::AddRecord { record } | Operation::UpdateRecord { record } => {
            validate_record(model, record)
        }
        Operation::RemoveRecord { .. } => Ok(()),
        Operation::ReplaceAttribute { attribute, .. } => check_attribute(model, &target.kind, attribute),
        Operation::ReplaceKey { key, .. } => check_key(model, &target.kind, key),
        Operation::AddToRelatedRecords {
            relationship,
            related,
            ..
        }
        | Operation::RemoveFromRelatedRecords {
            relationship,
            related,
            ..
        } => {
            let def = check_relationship(model, &target.kind, relationship, RelationshipKind::HasMany)?;
            check_members(def, &target.kind, relationship, [related])
        }
        Operation::ReplaceRelatedRecords {
            relationship,
            related,
            ..
        } => {
            let def = check_relationship(model, &target.kind, relationship, RelationshipKind::HasMany)?;
            check_members(def, &target.kind, relationship, related)
        }
        Operation::ReplaceRelatedRecord {
            relationship,
            related,
            ..
        } => {
            let def = check_relationship(model, &target.kind, relationship, RelationshipKind::HasOne)?;
            check_members(def, &target.kind, relationship, related)
        }
    }
}

/// Checks every field of a whole record.
pub(crate) fn validate_record(model: &ModelDef, record: &Record) -> CoreResult<()> {
    let kind = &record.identity.kind;
    for attribute in record.attributes.keys() {
        check_attribute(model, kind, attribute)?;
    }
    for key in record.keys.keys() {
        check_key(model, kind, key)?;
    }
    for (name, state) in &record.relationships {
        let def = check_relationship(model, kind, name, state.kind())?;
        check_members(def, kind, name, state.members())?;
    }
    Ok(())
}

fn check_attribute(model: &ModelDef, kind: &str, attribute: &str) -> CoreResult<()> {
    if model.attributes.contains(attribute) {
        Ok(())
    } else {
        Err(CoreError::AttributeNotDefined {
            model: kind.to_string(),
            attribute: attribute.to_string(),
        })
    }
}

fn check_key(model: &ModelDef, kind: &str, key: &str) -> CoreResult<()> {
    if model.keys.contains(key) {
        Ok(())
    } else {
        Err(CoreError::KeyNotDefined {
            model: kind.to_string(),
            key: key.to_string(),
        })
    }
}

pub(crate) fn check_relationship<'m>(
    model: &'m ModelDef,
    kind: &str,
    relationship: &str,
    expected: RelationshipKind,
) -> CoreResult<&'m RelationshipDef> {
    let def = model
        .relationships
        .get(relationship)
        .ok_or_else(|| CoreError::RelationshipNotDefined {
            model: kind.to_string(),
            relationship: relationship.to_string(),
        })?;
    if def.kind == expected {
        Ok(def)
    } else {
        Err(CoreError::RelationshipKindMismatch {
            model: kind.to_string(),
            relationship: relationship.to_string(),
            expected: expected.as_str(),
        })
    }
}

fn check_members<'r>(
    def: &RelationshipDef,
    kind: &str,
    relationship: &str,
    members: impl IntoIterator<Item = &'r RecordIdentity>,
) -> CoreResult<()> {
    match members.into_iter().find(|member| member.kind != def.model) {
        None => Ok(()),
        Some(member) => Err(CoreError::RelatedModelMismatch {
            model: kind.to_string(),
            relationship: relationship.to_string(),
            expected: def.model.clone(),
            found: member.kind.clone(),
        }),
    }
}
