//! Graph invariant checks.

use orrery_core::{Cache, InverseLinks, RelationshipState};
use serde_json::json;

/// Returns a description of every asymmetric link in the cache.
///
/// For each relationship with a declared inverse, a link from `A` to `B`
/// must be mirrored by a link from `B` back to `A`. Links to records that do
/// not exist are not checked.
pub fn symmetry_violations(cache: &Cache) -> Vec<String> {
    let schema = cache.schema();
    let mut violations = Vec::new();

    for record in cache.store().iter() {
        for (name, target) in record.links() {
            let Ok(def) = schema.relationship(&record.identity.kind, name) else {
                continue;
            };
            let Some(inverse) = &def.inverse else {
                continue;
            };
            let Some(related) = cache.record(target) else {
                continue;
            };

            let mirrored = related
                .relationship(inverse)
                .is_some_and(|state: &RelationshipState| state.contains(&record.identity));
            if !mirrored {
                violations.push(format!(
                    "{}.{name} -> {target} is not mirrored by {target}.{inverse}",
                    record.identity
                ));
            }
        }
    }
    violations
}

/// Returns true if the cache's reverse index equals one rebuilt from its
/// records.
pub fn index_matches_records(cache: &Cache) -> bool {
    let mut rebuilt = InverseLinks::new();
    rebuilt.rebuild(cache.store());
    rebuilt == *cache.links()
}

/// A JSON rendering of every record, for whole-graph comparisons.
pub fn snapshot(cache: &Cache) -> serde_json::Value {
    let records: Vec<_> = cache
        .store()
        .iter()
        .map(|record| json!({ "identity": record.identity.to_string(), "record": record }))
        .collect();
    serde_json::Value::Array(records)
}
