//! Read-only model definitions.
//!
//! The schema maps a record type to the attributes, keys and relationships
//! its records may carry. The record graph consults it synchronously to
//! validate operations, normalize records, and find the inverse side of
//! every relationship.

use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// A nullable single reference.
    HasOne,
    /// An unordered set of unique references.
    HasMany,
}

impl RelationshipKind {
    /// Returns the schema name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::HasOne => "hasOne",
            RelationshipKind::HasMany => "hasMany",
        }
    }
}

/// Definition of one relationship on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDef {
    /// Cardinality.
    pub kind: RelationshipKind,
    /// Type of the related records.
    pub model: String,
    /// Name of the reciprocal relationship on the related model, if any.
    pub inverse: Option<String>,
}

/// Definition of one model (record type).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDef {
    /// Declared attribute names.
    pub attributes: BTreeSet<String>,
    /// Declared key names (external-id correlation).
    pub keys: BTreeSet<String>,
    /// Declared relationships by name.
    pub relationships: BTreeMap<String, RelationshipDef>,
}

impl ModelDef {
    /// Declares an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    /// Declares a key.
    #[must_use]
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.insert(name.into());
        self
    }

    /// Declares a hasOne relationship.
    #[must_use]
    pub fn has_one(self, name: impl Into<String>, model: impl Into<String>, inverse: Option<&str>) -> Self {
        self.relationship(name, RelationshipKind::HasOne, model, inverse)
    }

    /// Declares a hasMany relationship.
    #[must_use]
    pub fn has_many(self, name: impl Into<String>, model: impl Into<String>, inverse: Option<&str>) -> Self {
        self.relationship(name, RelationshipKind::HasMany, model, inverse)
    }

    fn relationship(
        mut self,
        name: impl Into<String>,
        kind: RelationshipKind,
        model: impl Into<String>,
        inverse: Option<&str>,
    ) -> Self {
        self.relationships.insert(
            name.into(),
            RelationshipDef {
                kind,
                model: model.into(),
                inverse: inverse.map(str::to_string),
            },
        );
        self
    }
}

/// A validated, immutable set of model definitions.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: BTreeMap<String, ModelDef>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Looks up a model definition.
    pub fn model(&self, kind: &str) -> CoreResult<&ModelDef> {
        self.models
            .get(kind)
            .ok_or_else(|| CoreError::ModelNotDefined {
                model: kind.to_string(),
            })
    }

    /// Looks up a relationship definition.
    pub fn relationship(&self, kind: &str, name: &str) -> CoreResult<&RelationshipDef> {
        self.model(kind)?
            .relationships
            .get(name)
            .ok_or_else(|| CoreError::RelationshipNotDefined {
                model: kind.to_string(),
                relationship: name.to_string(),
            })
    }

    /// Returns true if the model is defined.
    pub fn has_model(&self, kind: &str) -> bool {
        self.models.contains_key(kind)
    }

    /// Returns the defined model names.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Generates a fresh record id.
    #[must_use]
    pub fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    models: BTreeMap<String, ModelDef>,
}

impl SchemaBuilder {
    /// Adds a model, configured by `define`.
    #[must_use]
    pub fn model(mut self, name: impl Into<String>, define: impl FnOnce(ModelDef) -> ModelDef) -> Self {
        self.models.insert(name.into(), define(ModelDef::default()));
        self
    }

    /// Validates and builds the schema.
    ///
    /// Every relationship must point at a defined model, and every declared
    /// inverse must exist on the related model and point back.
    pub fn build(self) -> CoreResult<Schema> {
        for (model_name, model) in &self.models {
            for (rel_name, rel) in &model.relationships {
                let related = self.models.get(&rel.model).ok_or_else(|| {
                    CoreError::invalid_schema(format!(
                        "{model_name}.{rel_name} refers to undefined model {}",
                        rel.model
                    ))
                })?;

                let Some(inverse) = &rel.inverse else {
                    continue;
                };

                let inverse_def = related.relationships.get(inverse).ok_or_else(|| {
                    CoreError::invalid_schema(format!(
                        "{model_name}.{rel_name} declares missing inverse {}.{inverse}",
                        rel.model
                    ))
                })?;

                if inverse_def.model != *model_name
                    || inverse_def.inverse.as_deref() != Some(rel_name.as_str())
                {
                    return Err(CoreError::invalid_schema(format!(
                        "{model_name}.{rel_name} and {}.{inverse} are not reciprocal",
                        rel.model
                    )));
                }
            }
        }

        Ok(Schema {
            models: self.models,
        })
    }
}
