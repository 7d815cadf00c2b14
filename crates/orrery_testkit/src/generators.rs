//! Property-based test generators using proptest.
//!
//! Operations are drawn over the identities of
//! [`crate::fixtures::populated_records`] plus a few that the fixtures lack
//! (`NEW_PLANETS`, `NEW_MOONS`, `NEW_HUMANS`). Operations on those fail until
//! a generated `AddRecord` brings them in, and links to them stay dangling
//! until then, which exercises adoption of inbound links on arrival.

use crate::fixtures::{
    human, moon, planet, HUMANS, MOONS, NEW_HUMANS, NEW_MOONS, NEW_PLANETS, PLANETS,
};
use orrery_core::{Operation, Record, RecordIdentity, Transform, Value};
use proptest::prelude::*;

fn ids(existing: &[&'static str], new: &[&'static str]) -> Vec<&'static str> {
    existing.iter().chain(new).copied().collect()
}

/// Strategy for planet identities.
pub fn planet_strategy() -> impl Strategy<Value = RecordIdentity> {
    prop::sample::select(ids(&PLANETS, &NEW_PLANETS)).prop_map(planet)
}

/// Strategy for moon identities.
pub fn moon_strategy() -> impl Strategy<Value = RecordIdentity> {
    prop::sample::select(ids(&MOONS, &NEW_MOONS)).prop_map(moon)
}

/// Strategy for human identities.
pub fn human_strategy() -> impl Strategy<Value = RecordIdentity> {
    prop::sample::select(ids(&HUMANS, &NEW_HUMANS)).prop_map(human)
}

/// Strategy for attribute values, `Null` included.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{1,8}".prop_map(Value::from),
    ]
}

/// Strategy for operations that touch relationships with inverses.
pub fn relationship_operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (planet_strategy(), moon_strategy())
            .prop_map(|(p, m)| Operation::add_to_related_records(p, "moons", m)),
        (planet_strategy(), moon_strategy())
            .prop_map(|(p, m)| Operation::remove_from_related_records(p, "moons", m)),
        (planet_strategy(), human_strategy())
            .prop_map(|(p, h)| Operation::add_to_related_records(p, "inhabitants", h)),
        (human_strategy(), planet_strategy())
            .prop_map(|(h, p)| Operation::remove_from_related_records(h, "planets", p)),
        (moon_strategy(), prop::option::of(planet_strategy()))
            .prop_map(|(m, p)| Operation::replace_related_record(m, "planet", p)),
        (planet_strategy(), prop::collection::vec(moon_strategy(), 0..3))
            .prop_map(|(p, ms)| Operation::replace_related_records(p, "moons", ms)),
        (human_strategy(), prop::collection::vec(planet_strategy(), 0..3))
            .prop_map(|(h, ps)| Operation::replace_related_records(h, "planets", ps)),
        (moon_strategy(), prop::option::of(planet_strategy())).prop_map(|(m, p)| {
            Operation::update_record(Record::new(m).with_has_one("planet", p))
        }),
    ]
}

/// Strategy for whole-record operations: adds that create or replace a
/// record, and partial updates of planets and humans.
pub fn record_operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (
            planet_strategy(),
            value_strategy(),
            prop::collection::vec(moon_strategy(), 0..3),
            prop::collection::vec(human_strategy(), 0..2),
        )
            .prop_map(|(p, name, ms, hs)| {
                Operation::add_record(
                    Record::new(p)
                        .with_attribute("name", name)
                        .with_has_many("moons", ms)
                        .with_has_many("inhabitants", hs),
                )
            }),
        (moon_strategy(), prop::option::of(planet_strategy())).prop_map(|(m, p)| {
            Operation::add_record(Record::new(m).with_has_one("planet", p))
        }),
        (human_strategy(), prop::collection::vec(planet_strategy(), 0..3)).prop_map(|(h, ps)| {
            Operation::add_record(Record::new(h).with_has_many("planets", ps))
        }),
        (planet_strategy(), prop::collection::vec(human_strategy(), 0..3)).prop_map(|(p, hs)| {
            Operation::update_record(Record::new(p).with_has_many("inhabitants", hs))
        }),
        (human_strategy(), prop::collection::vec(planet_strategy(), 0..3)).prop_map(|(h, ps)| {
            Operation::update_record(Record::new(h).with_has_many("planets", ps))
        }),
    ]
}

/// Strategy for any operation the fixtures support, record removal included.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        6 => relationship_operation_strategy(),
        2 => record_operation_strategy(),
        1 => (planet_strategy(), value_strategy())
            .prop_map(|(p, v)| Operation::replace_attribute(p, "name", v)),
        1 => prop_oneof![planet_strategy(), moon_strategy(), human_strategy()]
            .prop_map(Operation::remove_record),
    ]
}

/// Strategy for a transform of one to three operations.
pub fn transform_strategy() -> impl Strategy<Value = Transform> {
    prop::collection::vec(operation_strategy(), 1..4).prop_map(Transform::new)
}

/// Strategy for a sequence of transforms.
pub fn transform_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Transform>> {
    prop::collection::vec(transform_strategy(), 1..=max_len.max(1))
}
