//! The record graph.
//!
//! A [`Cache`] holds normalized records and applies transforms to them
//! through the processor pipeline. Every applied transform yields the list
//! of inverse operations that undo it, which the cache keeps in application
//! order so that later transforms can be rolled back.

mod links;
mod query;
mod store;
mod validate;

pub use links::{InverseLink, InverseLinks};
pub use query::{Query, QueryResult};
pub use store::RecordStore;

use crate::config::{CacheConfig, ProcessorSet};
use crate::error::{CoreError, CoreResult};
use crate::events::{EventFeed, Subscription, SubscriptionId};
use crate::operation::{Operation, Transform};
use crate::processor::{standard_processors, Processor, ProcessorContext};
use crate::record::{Record, RelationshipState};
use crate::schema::{RelationshipKind, Schema};
use crate::types::{RecordIdentity, TransformId};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A change announced by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A primitive patch was applied.
    Patch(Operation),
    /// The whole content was replaced.
    Reset,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Before,
    After,
    Finally,
}

/// The in-memory record graph.
///
/// # Example
///
/// ```rust
/// use orrery_core::{Cache, Operation, Record, RecordIdentity, Schema, Transform};
/// use std::sync::Arc;
///
/// let schema = Schema::builder()
///     .model("planet", |m| m.attribute("name"))
///     .build()
///     .unwrap();
/// let mut cache = Cache::new(Arc::new(schema));
///
/// let earth = RecordIdentity::new("planet", "earth");
/// let add = Transform::new(vec![Operation::add_record(
///     Record::new(earth.clone()).with_attribute("name", "Earth"),
/// )]);
/// let inverse = cache.transform(&add).unwrap();
///
/// assert!(cache.record(&earth).is_some());
/// assert_eq!(inverse, vec![Operation::remove_record(earth)]);
/// ```
pub struct Cache {
    schema: Arc<Schema>,
    config: CacheConfig,
    store: RecordStore,
    links: InverseLinks,
    processors: Vec<Box<dyn Processor>>,
    /// Inverse operations of every applied transform, oldest first.
    history: Vec<(TransformId, Vec<Operation>)>,
    events: EventFeed<CacheEvent>,
}

impl Cache {
    /// Creates an empty cache with the default configuration.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_config(schema, CacheConfig::default())
    }

    /// Creates an empty cache.
    pub fn with_config(schema: Arc<Schema>, config: CacheConfig) -> Self {
        let processors = match config.processors {
            ProcessorSet::Standard => standard_processors(),
            ProcessorSet::None => Vec::new(),
        };
        Self {
            schema,
            config,
            store: RecordStore::new(),
            links: InverseLinks::new(),
            processors,
            history: Vec::new(),
            events: EventFeed::new(),
        }
    }

    /// Appends a processor to the pipeline.
    pub fn register(&mut self, mut processor: Box<dyn Processor>) {
        let mut ctx = ProcessorContext::new(&self.schema, &self.store, &mut self.links);
        processor.reset(&mut ctx);
        debug!(processor = processor.name(), "processor registered");
        self.processors.push(processor);
    }

    /// Returns the registered processor names, in pipeline order.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the reverse index.
    pub fn links(&self) -> &InverseLinks {
        &self.links
    }

    /// Subscribes to cache events.
    pub fn subscribe(&self) -> Subscription<CacheEvent> {
        self.events.subscribe()
    }

    /// Cancels a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Applies a transform and returns its inverse operations.
    ///
    /// The inverse lists one operation per primitive patch, in reverse
    /// order of application, so applying it in order undoes the transform.
    /// A transform whose operations are all redundant yields an empty list.
    ///
    /// If any operation fails, every patch already applied for this
    /// transform is undone and the error is returned.
    pub fn transform(&mut self, transform: &Transform) -> CoreResult<Vec<Operation>> {
        if self.history.iter().any(|(id, _)| *id == transform.id) {
            return Err(CoreError::DuplicateTransform {
                id: transform.id.clone(),
            });
        }

        let mut applied = Vec::new();
        let mut patches = Vec::new();
        for op in &transform.operations {
            if let Err(err) = self.apply(op.clone(), &mut applied, &mut patches) {
                warn!(
                    transform = %transform.id,
                    operation = %op,
                    error = %err,
                    "transform failed; undoing partial patches"
                );
                self.undo(&applied);
                return Err(err);
            }
        }

        for patch in patches {
            self.events.emit(CacheEvent::Patch(patch));
        }

        applied.reverse();
        debug!(
            transform = %transform.id,
            operations = transform.operations.len(),
            inverse = applied.len(),
            "transform applied"
        );
        self.history.push((transform.id.clone(), applied.clone()));
        Ok(applied)
    }

    /// Undoes every transform applied after `id`, newest first.
    ///
    /// Returns the undone transform ids in application order.
    pub fn rollback(&mut self, id: &TransformId) -> CoreResult<Vec<TransformId>> {
        let position = self.position(id)?;
        let undone = self.undo_from(position + 1)?;
        debug!(to = %id, undone = undone.len(), "cache rolled back");
        Ok(undone)
    }

    /// Undoes `id` and every transform applied after it, newest first.
    ///
    /// Returns the undone transform ids in application order.
    pub fn revert(&mut self, id: &TransformId) -> CoreResult<Vec<TransformId>> {
        let position = self.position(id)?;
        let undone = self.undo_from(position)?;
        debug!(transform = %id, undone = undone.len(), "cache reverted");
        Ok(undone)
    }

    /// Replaces the whole content of the cache.
    ///
    /// Records are validated and normalized; stored inverse operations are
    /// discarded.
    pub fn reset(&mut self, records: Vec<Record>) -> CoreResult<()> {
        let mut normalized = Vec::with_capacity(records.len());
        for record in records {
            normalized.push(self.normalize(record)?);
        }
        self.store.replace_all(normalized);
        self.history.clear();
        self.reset_processors();
        self.events.emit(CacheEvent::Reset);
        debug!(records = self.store.len(), "cache reset");
        Ok(())
    }

    /// Returns the inverse operations stored for a transform.
    pub fn inverse_operations(&self, id: &TransformId) -> Option<&[Operation]> {
        self.history
            .iter()
            .find(|(logged, _)| logged == id)
            .map(|(_, inverse)| inverse.as_slice())
    }

    /// Returns the ids of the transforms whose inverses are stored, oldest
    /// first.
    pub fn applied(&self) -> Vec<TransformId> {
        self.history.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Drops the stored inverse operations of the given transforms.
    pub fn forget(&mut self, ids: &[TransformId]) {
        self.history.retain(|(id, _)| !ids.contains(id));
    }

    /// Answers a query.
    pub fn query(&self, query: &Query) -> CoreResult<QueryResult> {
        match query {
            Query::FindRecord { record } => self
                .store
                .get(record)
                .cloned()
                .map(QueryResult::Record)
                .ok_or_else(|| CoreError::record_not_found(record)),
            Query::FindRecords { kind } => {
                if self.config.validate_schema {
                    self.schema.model(kind)?;
                }
                Ok(QueryResult::Records(
                    self.store.of_kind(kind).cloned().collect(),
                ))
            }
            Query::FindRelatedRecord {
                record,
                relationship,
            } => {
                let related = self.related_record(record, relationship)?;
                Ok(QueryResult::RelatedRecord(
                    related.and_then(|identity| self.store.get(&identity).cloned()),
                ))
            }
            Query::FindRelatedRecords {
                record,
                relationship,
            } => {
                let related = self.related_records(record, relationship)?;
                Ok(QueryResult::RelatedRecords(
                    related
                        .iter()
                        .filter_map(|identity| self.store.get(identity).cloned())
                        .collect(),
                ))
            }
        }
    }

    /// Returns a record.
    pub fn record(&self, identity: &RecordIdentity) -> Option<&Record> {
        self.store.get(identity)
    }

    /// Returns every record of a type, ordered by id.
    pub fn records(&self, kind: &str) -> Vec<&Record> {
        self.store.of_kind(kind).collect()
    }

    /// Returns the target of a hasOne relationship.
    pub fn related_record(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
    ) -> CoreResult<Option<RecordIdentity>> {
        match self.related_state(identity, relationship, RelationshipKind::HasOne)? {
            Some(RelationshipState::HasOne(related)) => Ok(related.clone()),
            _ => Ok(None),
        }
    }

    /// Returns the members of a hasMany relationship.
    pub fn related_records(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
    ) -> CoreResult<Vec<RecordIdentity>> {
        match self.related_state(identity, relationship, RelationshipKind::HasMany)? {
            Some(RelationshipState::HasMany(related)) => Ok(related.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Returns the links that refer to a record.
    pub fn inverse_links(&self, identity: &RecordIdentity) -> Vec<InverseLink> {
        self.links.links_to(identity)
    }

    /// Finds a record of `kind` by one of its keys.
    pub fn record_for_key(&self, kind: &str, key: &str, value: &str) -> Option<&Record> {
        self.store
            .of_kind(kind)
            .find(|record| record.keys.get(key).map(String::as_str) == Some(value))
    }

    fn related_state(
        &self,
        identity: &RecordIdentity,
        relationship: &str,
        expected: RelationshipKind,
    ) -> CoreResult<Option<&RelationshipState>> {
        if self.config.validate_schema {
            let model = self.schema.model(&identity.kind)?;
            validate::check_relationship(model, &identity.kind, relationship, expected)?;
        }
        let record = self
            .store
            .get(identity)
            .ok_or_else(|| CoreError::record_not_found(identity))?;
        Ok(record.relationship(relationship))
    }

    /// Runs one operation through the pipeline.
    fn apply(
        &mut self,
        op: Operation,
        applied: &mut Vec<Operation>,
        patches: &mut Vec<Operation>,
    ) -> CoreResult<()> {
        let op = self.prepare(op)?;

        if self.store.inverse_of(&op)?.is_none() {
            trace!(operation = %op, "redundant operation skipped");
            return Ok(());
        }

        for emitted in self.run_phase(Phase::Before, &op)? {
            self.apply(emitted, applied, patches)?;
        }

        let after = self.run_phase(Phase::After, &op)?;

        // `before` operations may have changed the state `op` applies to.
        if let Some(inverse) = self.store.inverse_of(&op)? {
            self.store.patch(&op)?;
            trace!(operation = %op, inverse = %inverse, "patched");
            applied.push(inverse);
            patches.push(op.clone());
        }

        for emitted in after {
            self.apply(emitted, applied, patches)?;
        }

        for emitted in self.run_phase(Phase::Finally, &op)? {
            self.apply(emitted, applied, patches)?;
        }

        Ok(())
    }

    fn run_phase(&mut self, phase: Phase, op: &Operation) -> CoreResult<Vec<Operation>> {
        let mut emitted = Vec::new();
        let mut ctx = ProcessorContext::new(&self.schema, &self.store, &mut self.links);
        for processor in &mut self.processors {
            let ops = match phase {
                Phase::Before => processor.before(&mut ctx, op)?,
                Phase::After => processor.after(&mut ctx, op)?,
                Phase::Finally => processor.finally(&mut ctx, op)?,
            };
            if !ops.is_empty() {
                trace!(
                    processor = processor.name(),
                    phase = ?phase,
                    operation = %op,
                    emitted = ops.len(),
                    "processor emitted operations"
                );
            }
            emitted.extend(ops);
        }
        Ok(emitted)
    }

    /// Validates an operation and normalizes any whole record it carries.
    fn prepare(&self, op: Operation) -> CoreResult<Operation> {
        if self.config.validate_schema {
            validate::validate_operation(&self.schema, &op)?;
        }
        Ok(match op {
            Operation::AddRecord { record } => Operation::AddRecord {
                record: self.normalize(record)?,
            },
            other => other,
        })
    }

    fn normalize(&self, mut record: Record) -> CoreResult<Record> {
        match self.schema.model(&record.identity.kind) {
            Ok(model) => {
                if self.config.validate_schema {
                    validate::validate_record(model, &record)?;
                }
                record.normalize(model);
            }
            Err(err) if self.config.validate_schema => return Err(err),
            Err(_) => {}
        }
        record.attributes.retain(|_, value| !value.is_null());
        Ok(record)
    }

    fn position(&self, id: &TransformId) -> CoreResult<usize> {
        self.history
            .iter()
            .position(|(logged, _)| logged == id)
            .ok_or_else(|| CoreError::TransformNotLogged { id: id.clone() })
    }

    /// Replays the stored inverses of every transform from `position` on,
    /// newest first, as direct patches.
    ///
    /// The history is only truncated once every patch has landed. On failure
    /// the patches already replayed are reverted and nothing is emitted.
    fn undo_from(&mut self, position: usize) -> CoreResult<Vec<TransformId>> {
        let pending: Vec<Operation> = self.history[position..]
            .iter()
            .rev()
            .flat_map(|(_, inverse)| inverse.iter().cloned())
            .collect();

        let mut reverts = Vec::with_capacity(pending.len());
        for op in &pending {
            let revert = match self.replay(op) {
                Ok(revert) => revert,
                Err(err) => {
                    self.undo(&reverts);
                    return Err(err);
                }
            };
            reverts.extend(revert);
        }

        let ids: Vec<TransformId> = self
            .history
            .split_off(position)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        for op in pending {
            self.events.emit(CacheEvent::Patch(op));
        }
        self.reset_processors();
        Ok(ids)
    }

    /// Patches one operation and returns what reverts it.
    fn replay(&mut self, op: &Operation) -> CoreResult<Option<Operation>> {
        let revert = self.store.inverse_of(op)?;
        self.store.patch(op)?;
        Ok(revert)
    }

    /// Reverts the patches of a failed transform.
    fn undo(&mut self, applied: &[Operation]) {
        for inverse in applied.iter().rev() {
            if let Err(err) = self.store.patch(inverse) {
                warn!(operation = %inverse, error = %err, "undo patch failed");
            }
        }
        self.reset_processors();
    }

    fn reset_processors(&mut self) {
        let mut ctx = ProcessorContext::new(&self.schema, &self.store, &mut self.links);
        for processor in &mut self.processors {
            processor.reset(&mut ctx);
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("records", &self.store.len())
            .field("processors", &self.processor_names())
            .field("applied", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .model("planet", |m| {
                    m.attribute("name")
                        .key("remoteId")
                        .has_many("moons", "moon", Some("planet"))
                })
                .model("moon", |m| m.attribute("name").has_one("planet", "planet", Some("moons")))
                .build()
                .unwrap(),
        )
    }

    fn planet(id: &str) -> RecordIdentity {
        RecordIdentity::new("planet", id)
    }

    fn moon(id: &str) -> RecordIdentity {
        RecordIdentity::new("moon", id)
    }

    #[test]
    fn add_record_is_normalized() {
        let mut cache = Cache::new(schema());
        cache
            .transform(&Transform::new(vec![Operation::add_record(Record::new(planet("earth")))]))
            .unwrap();

        let earth = cache.record(&planet("earth")).unwrap();
        assert_eq!(earth.relationship("moons"), Some(&RelationshipState::HasMany(Default::default())));
    }

    #[test]
    fn redundant_transform_has_empty_inverse() {
        let mut cache = Cache::new(schema());
        let op = Operation::add_record(Record::new(planet("earth")).with_attribute("name", "Earth"));
        cache.transform(&Transform::new(vec![op.clone()])).unwrap();

        let inverse = cache.transform(&Transform::new(vec![op])).unwrap();
        assert!(inverse.is_empty());
    }

    #[test]
    fn failed_transform_leaves_no_trace() {
        let mut cache = Cache::new(schema());
        cache
            .transform(&Transform::new(vec![Operation::add_record(Record::new(planet("earth")))]))
            .unwrap();
        let before = cache.store().clone();
        let mut events = cache.subscribe();

        let result = cache.transform(&Transform::new(vec![
            Operation::replace_attribute(planet("earth"), "name", "Terra"),
            Operation::replace_attribute(planet("vulcan"), "name", "Vulcan"),
        ]));

        assert!(matches!(result, Err(CoreError::RecordNotFound { .. })));
        assert_eq!(cache.record(&planet("earth")), before.get(&planet("earth")));
        assert_eq!(cache.applied().len(), 1);
        assert!(events.drain().is_empty());
    }

    #[test]
    fn schema_violations_are_rejected() {
        let mut cache = Cache::new(schema());
        let result = cache.transform(&Transform::new(vec![Operation::add_record(
            Record::new(planet("earth")).with_attribute("mass", 1),
        )]));
        assert!(result.unwrap_err().is_schema_violation());
        assert!(cache.store().is_empty());
    }

    #[test]
    fn duplicate_transform_id_is_rejected() {
        let mut cache = Cache::new(schema());
        let t = Transform::with_id("t1", vec![Operation::add_record(Record::new(planet("earth")))]);
        cache.transform(&t).unwrap();
        assert!(matches!(
            cache.transform(&t),
            Err(CoreError::DuplicateTransform { .. })
        ));
    }

    #[test]
    fn patch_events_follow_application_order() {
        let mut cache = Cache::new(schema());
        let mut events = cache.subscribe();
        cache
            .transform(&Transform::new(vec![
                Operation::add_record(Record::new(planet("saturn"))),
                Operation::replace_attribute(planet("saturn"), "name", "Saturn"),
            ]))
            .unwrap();

        let events = events.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], CacheEvent::Patch(Operation::AddRecord { .. })));
        assert!(matches!(&events[1], CacheEvent::Patch(Operation::ReplaceAttribute { .. })));
    }

    #[test]
    fn rollback_restores_earlier_state() {
        let mut cache = Cache::new(schema());
        let first = Transform::with_id("t1", vec![Operation::add_record(Record::new(planet("saturn")))]);
        cache.transform(&first).unwrap();
        let snapshot = cache.store().clone();
        let snapshot_links = cache.links().clone();

        cache
            .transform(&Transform::with_id(
                "t2",
                vec![Operation::add_record(
                    Record::new(moon("titan")).with_has_one("planet", Some(planet("saturn"))),
                )],
            ))
            .unwrap();
        cache
            .transform(&Transform::with_id(
                "t3",
                vec![Operation::replace_attribute(planet("saturn"), "name", "Saturn")],
            ))
            .unwrap();

        let undone = cache.rollback(&TransformId::from("t1")).unwrap();
        assert_eq!(undone, vec![TransformId::from("t2"), TransformId::from("t3")]);
        assert_eq!(cache.applied(), vec![TransformId::from("t1")]);
        assert_eq!(cache.record(&planet("saturn")), snapshot.get(&planet("saturn")));
        assert!(cache.record(&moon("titan")).is_none());
        assert_eq!(cache.links(), &snapshot_links);
    }

    #[test]
    fn revert_undoes_the_named_transform() {
        let mut cache = Cache::new(schema());
        cache
            .transform(&Transform::with_id("t1", vec![Operation::add_record(Record::new(planet("mars")))]))
            .unwrap();
        cache
            .transform(&Transform::with_id(
                "t2",
                vec![Operation::replace_attribute(planet("mars"), "name", "Mars")],
            ))
            .unwrap();

        let undone = cache.revert(&TransformId::from("t1")).unwrap();
        assert_eq!(undone.len(), 2);
        assert!(cache.store().is_empty());
        assert!(cache.applied().is_empty());
    }

    #[test]
    fn rollback_unknown_transform_fails() {
        let mut cache = Cache::new(schema());
        assert!(matches!(
            cache.rollback(&TransformId::from("missing")),
            Err(CoreError::TransformNotLogged { .. })
        ));
    }

    #[test]
    fn reset_replaces_content_and_rebuilds_index() {
        let mut cache = Cache::new(schema());
        let mut events = cache.subscribe();
        cache
            .reset(vec![
                Record::new(planet("jupiter")).with_has_many("moons", [moon("io")]),
                Record::new(moon("io")).with_has_one("planet", Some(planet("jupiter"))),
            ])
            .unwrap();

        assert_eq!(events.drain(), vec![CacheEvent::Reset]);
        assert_eq!(cache.inverse_links(&moon("io")).len(), 1);
        assert_eq!(cache.inverse_links(&planet("jupiter")).len(), 1);
    }

    #[test]
    fn queries() {
        let mut cache = Cache::new(schema());
        cache
            .reset(vec![
                Record::new(planet("jupiter"))
                    .with_key("remoteId", "p5")
                    .with_has_many("moons", [moon("io"), moon("europa")]),
                Record::new(moon("io")).with_has_one("planet", Some(planet("jupiter"))),
            ])
            .unwrap();

        let found = cache.query(&Query::find_record(planet("jupiter"))).unwrap();
        assert_eq!(found.record().map(|r| &r.identity), Some(&planet("jupiter")));

        let moons = cache.query(&Query::find_records("moon")).unwrap();
        assert_eq!(moons.records().len(), 1);

        // europa is referenced but absent
        let related = cache
            .query(&Query::find_related_records(planet("jupiter"), "moons"))
            .unwrap();
        assert_eq!(related.records().len(), 1);

        let owner = cache
            .query(&Query::find_related_record(moon("io"), "planet"))
            .unwrap();
        assert_eq!(owner.record().map(|r| &r.identity), Some(&planet("jupiter")));

        assert!(matches!(
            cache.query(&Query::find_record(planet("pluto"))),
            Err(CoreError::RecordNotFound { .. })
        ));
        assert!(matches!(
            cache.query(&Query::find_related_record(planet("jupiter"), "moons")),
            Err(CoreError::RelationshipKindMismatch { .. })
        ));

        let keyed = cache.record_for_key("planet", "remoteId", "p5").unwrap();
        assert_eq!(keyed.identity, planet("jupiter"));
        assert_eq!(keyed.attribute("name"), &Value::Null);
    }

    #[test]
    fn failed_revert_keeps_history_and_state() {
        let mut cache = Cache::new(schema());
        for t in [
            Transform::with_id("t1", vec![Operation::add_record(Record::new(planet("saturn")))]),
            Transform::with_id(
                "t2",
                vec![Operation::replace_attribute(planet("saturn"), "name", "Saturn")],
            ),
            Transform::with_id("t3", vec![Operation::remove_record(planet("saturn"))]),
        ] {
            cache.transform(&t).unwrap();
        }
        // without t3's inverse, t2's inverse targets a missing record
        cache.forget(&[TransformId::from("t3")]);
        cache
            .transform(&Transform::with_id("t4", vec![Operation::add_record(Record::new(planet("mars")))]))
            .unwrap();
        let mut events = cache.subscribe();

        let result = cache.revert(&TransformId::from("t1"));

        assert!(matches!(result, Err(CoreError::RecordNotFound { .. })));
        assert!(cache.record(&planet("mars")).is_some());
        assert_eq!(
            cache.applied(),
            vec![TransformId::from("t1"), TransformId::from("t2"), TransformId::from("t4")]
        );
        assert!(events.drain().is_empty());

        // t4 can still be undone on its own
        cache.rollback(&TransformId::from("t2")).unwrap();
        assert!(cache.record(&planet("mars")).is_none());
    }

    #[test]
    fn records_outlive_kind_argument() {
        let mut cache = Cache::new(schema());
        cache
            .reset(vec![Record::new(planet("saturn")).with_key("remoteId", "p6")])
            .unwrap();

        let found = {
            let kind = String::from("planet");
            cache.records(&kind)
        };
        let keyed = {
            let kind = String::from("planet");
            cache.record_for_key(&kind, "remoteId", "p6")
        };

        assert_eq!(found.len(), 1);
        assert_eq!(keyed.map(|r| &r.identity), Some(&planet("saturn")));
    }

    #[test]
    fn unvalidated_cache_accepts_unknown_models() {
        let config = CacheConfig::new()
            .validate_schema(false)
            .processors(ProcessorSet::None);
        let mut cache = Cache::with_config(schema(), config);
        cache
            .transform(&Transform::new(vec![Operation::add_record(
                Record::new(RecordIdentity::new("comet", "halley")).with_attribute("period", 76),
            )]))
            .unwrap();
        assert_eq!(cache.records("comet").len(), 1);
        assert!(cache.processor_names().is_empty());
    }
}
