//! Schema and record fixtures.
//!
//! Every suite works against the same small solar system:
//!
//! - `planet` has a `name`, a `remoteId` key, `moons` (hasMany, inverse
//!   `moon.planet`) and `inhabitants` (hasMany, inverse `human.planets`)
//! - `moon` has a `name` and `planet` (hasOne, inverse `planet.moons`)
//! - `human` has a `name` and `planets` (hasMany, inverse
//!   `planet.inhabitants`)

use orrery_core::{Cache, Record, RecordIdentity, Schema};
use orrery_sync::MemorySource;
use std::sync::Arc;

/// Builds the solar-system schema.
pub fn solar_system_schema() -> Arc<Schema> {
    let schema = Schema::builder()
        .model("planet", |m| {
            m.attribute("name")
                .attribute("classification")
                .key("remoteId")
                .has_many("moons", "moon", Some("planet"))
                .has_many("inhabitants", "human", Some("planets"))
        })
        .model("moon", |m| {
            m.attribute("name").has_one("planet", "planet", Some("moons"))
        })
        .model("human", |m| {
            m.attribute("name")
                .has_many("planets", "planet", Some("inhabitants"))
        })
        .build()
        .expect("solar system schema is valid");
    Arc::new(schema)
}

/// Identity of a planet.
pub fn planet(id: &str) -> RecordIdentity {
    RecordIdentity::new("planet", id)
}

/// Identity of a moon.
pub fn moon(id: &str) -> RecordIdentity {
    RecordIdentity::new("moon", id)
}

/// Identity of a human.
pub fn human(id: &str) -> RecordIdentity {
    RecordIdentity::new("human", id)
}

/// Planet ids used by [`populated_records`] and the generators.
pub const PLANETS: [&str; 3] = ["earth", "jupiter", "saturn"];

/// Moon ids used by [`populated_records`] and the generators.
pub const MOONS: [&str; 4] = ["moon", "europa", "io", "titan"];

/// Human ids used by [`populated_records`] and the generators.
pub const HUMANS: [&str; 2] = ["ada", "yuri"];

/// Planet ids the generators may add; absent from [`populated_records`].
pub const NEW_PLANETS: [&str; 1] = ["mars"];

/// Moon ids the generators may add; absent from [`populated_records`].
pub const NEW_MOONS: [&str; 2] = ["phobos", "deimos"];

/// Human ids the generators may add; absent from [`populated_records`].
pub const NEW_HUMANS: [&str; 1] = ["valentina"];

/// A consistent starting graph.
///
/// The moon orbits earth, europa and io orbit jupiter, titan orbits saturn.
/// Ada lives on earth; Yuri has no planet.
pub fn populated_records() -> Vec<Record> {
    let mut records = vec![
        Record::new(planet("earth"))
            .with_attribute("name", "Earth")
            .with_key("remoteId", "p-3")
            .with_has_many("moons", [moon("moon")])
            .with_has_many("inhabitants", [human("ada")]),
        Record::new(planet("jupiter"))
            .with_attribute("name", "Jupiter")
            .with_key("remoteId", "p-5")
            .with_has_many("moons", [moon("europa"), moon("io")]),
        Record::new(planet("saturn"))
            .with_attribute("name", "Saturn")
            .with_key("remoteId", "p-6")
            .with_has_many("moons", [moon("titan")]),
    ];

    let orbits = [("moon", "earth"), ("europa", "jupiter"), ("io", "jupiter"), ("titan", "saturn")];
    for (id, orbits) in orbits {
        records.push(
            Record::new(moon(id))
                .with_attribute("name", id)
                .with_has_one("planet", Some(planet(orbits))),
        );
    }

    records.push(
        Record::new(human("ada"))
            .with_attribute("name", "Ada")
            .with_has_many("planets", [planet("earth")]),
    );
    records.push(Record::new(human("yuri")).with_attribute("name", "Yuri"));
    records
}

/// An empty cache over the solar-system schema.
pub fn empty_cache() -> Cache {
    Cache::new(solar_system_schema())
}

/// A cache reset to [`populated_records`].
pub fn populated_cache() -> Cache {
    let mut cache = empty_cache();
    cache
        .reset(populated_records())
        .expect("fixture records are valid");
    cache
}

/// A memory source over the solar-system schema with a volatile log.
pub fn memory_source(name: &str) -> Arc<MemorySource> {
    Arc::new(MemorySource::new(name, solar_system_schema()))
}
