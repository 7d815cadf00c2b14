//! Normalized records.

use crate::schema::{ModelDef, RelationshipKind};
use crate::types::RecordIdentity;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The current value of one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipState {
    /// hasOne: a nullable single reference.
    HasOne(Option<RecordIdentity>),
    /// hasMany: an unordered set of unique references.
    HasMany(BTreeSet<RecordIdentity>),
}

impl RelationshipState {
    /// Returns the empty state for a relationship kind.
    pub fn empty(kind: RelationshipKind) -> Self {
        match kind {
            RelationshipKind::HasOne => RelationshipState::HasOne(None),
            RelationshipKind::HasMany => RelationshipState::HasMany(BTreeSet::new()),
        }
    }

    /// Builds a hasMany state from identities.
    pub fn many(members: impl IntoIterator<Item = RecordIdentity>) -> Self {
        RelationshipState::HasMany(members.into_iter().collect())
    }

    /// Builds a hasOne state.
    pub fn one(member: Option<RecordIdentity>) -> Self {
        RelationshipState::HasOne(member)
    }

    /// Returns the cardinality of this state.
    pub fn kind(&self) -> RelationshipKind {
        match self {
            RelationshipState::HasOne(_) => RelationshipKind::HasOne,
            RelationshipState::HasMany(_) => RelationshipKind::HasMany,
        }
    }

    /// Returns every referenced identity.
    pub fn members(&self) -> Vec<&RecordIdentity> {
        match self {
            RelationshipState::HasOne(member) => member.iter().collect(),
            RelationshipState::HasMany(members) => members.iter().collect(),
        }
    }

    /// Returns true if `identity` is referenced.
    pub fn contains(&self, identity: &RecordIdentity) -> bool {
        match self {
            RelationshipState::HasOne(member) => member.as_ref() == Some(identity),
            RelationshipState::HasMany(members) => members.contains(identity),
        }
    }
}

/// A normalized graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The record's identity.
    pub identity: RecordIdentity,
    /// Attribute values. `Null` values are never stored.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    /// Relationship values by name.
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipState>,
    /// External ids by key name.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

impl Record {
    /// Creates an empty record.
    pub fn new(identity: RecordIdentity) -> Self {
        Self {
            identity,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }

    /// Sets an attribute (builder style).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name.into(), value.into());
        self
    }

    /// Sets a hasOne relationship (builder style).
    #[must_use]
    pub fn with_has_one(mut self, name: impl Into<String>, member: Option<RecordIdentity>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipState::HasOne(member));
        self
    }

    /// Sets a hasMany relationship (builder style).
    #[must_use]
    pub fn with_has_many(
        mut self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = RecordIdentity>,
    ) -> Self {
        self.relationships
            .insert(name.into(), RelationshipState::many(members));
        self
    }

    /// Sets a key (builder style).
    #[must_use]
    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(name.into(), value.into());
        self
    }

    /// Returns an attribute value, `Null` when absent.
    pub fn attribute(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(name).unwrap_or(&NULL)
    }

    /// Sets an attribute; setting `Null` removes it.
    pub fn set_attribute(&mut self, name: String, value: Value) {
        if value.is_null() {
            self.attributes.remove(&name);
        } else {
            self.attributes.insert(name, value);
        }
    }

    /// Sets a key; `None` removes it.
    pub fn set_key(&mut self, name: String, value: Option<String>) {
        match value {
            Some(value) => {
                self.keys.insert(name, value);
            }
            None => {
                self.keys.remove(&name);
            }
        }
    }

    /// Returns a relationship value.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipState> {
        self.relationships.get(name)
    }

    /// Fills every relationship declared by `model` that this record lacks
    /// with its empty default.
    pub fn normalize(&mut self, model: &ModelDef) {
        for (name, def) in &model.relationships {
            self.relationships
                .entry(name.clone())
                .or_insert_with(|| RelationshipState::empty(def.kind));
        }
    }

    /// Returns every `(relationship, target)` link this record holds.
    pub fn links(&self) -> impl Iterator<Item = (&str, &RecordIdentity)> {
        self.relationships.iter().flat_map(|(name, state)| {
            state
                .members()
                .into_iter()
                .map(move |target| (name.as_str(), target))
        })
    }
}
