//! Reverse index of relationship links.

use crate::cache::store::RecordStore;
use crate::types::RecordIdentity;
use std::collections::{BTreeSet, HashMap};

/// One incoming link: `record` refers to the indexed record through
/// `relationship`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InverseLink {
    /// The referring record.
    pub record: RecordIdentity,
    /// The relationship on the referring record.
    pub relationship: String,
}

impl InverseLink {
    /// Creates a link.
    pub fn new(record: RecordIdentity, relationship: impl Into<String>) -> Self {
        Self {
            record,
            relationship: relationship.into(),
        }
    }
}

/// For every record, the set of links that refer to it.
///
/// Kept in lock-step with the record store by the reverse index processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InverseLinks {
    index: HashMap<RecordIdentity, BTreeSet<InverseLink>>,
}

impl InverseLinks {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the links that refer to `target`, in a stable order.
    pub fn links_to(&self, target: &RecordIdentity) -> Vec<InverseLink> {
        self.index
            .get(target)
            .map(|links| links.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns true if `link` refers to `target`.
    pub fn contains(&self, target: &RecordIdentity, link: &InverseLink) -> bool {
        self.index
            .get(target)
            .is_some_and(|links| links.contains(link))
    }

    /// Records that `link` refers to `target`.
    pub fn add(&mut self, target: RecordIdentity, link: InverseLink) {
        self.index.entry(target).or_default().insert(link);
    }

    /// Forgets that `link` refers to `target`.
    pub fn remove(&mut self, target: &RecordIdentity, link: &InverseLink) {
        if let Some(links) = self.index.get_mut(target) {
            links.remove(link);
            if links.is_empty() {
                self.index.remove(target);
            }
        }
    }

    /// Rebuilds the index from every link in `store`.
    pub fn rebuild(&mut self, store: &RecordStore) {
        self.index.clear();
        for record in store.iter() {
            for (relationship, target) in record.links() {
                self.add(
                    target.clone(),
                    InverseLink::new(record.identity.clone(), relationship),
                );
            }
        }
    }

    /// Returns the total number of links.
    pub fn len(&self) -> usize {
        self.index.values().map(BTreeSet::len).sum()
    }

    /// Returns true if no links are indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
