//! Snapshot diffing for `stateUpdate` broadcasts.

use shared::{StateChanges, StateSnapshot};
use std::collections::BTreeMap;

/// Entries of `next` that are new or differ from `prev`, plus a `None`
/// tombstone for every key that disappeared.
fn diff_collection<K, V>(prev: &BTreeMap<K, V>, next: &BTreeMap<K, V>) -> BTreeMap<K, Option<V>>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let mut changes = BTreeMap::new();
    for (key, value) in next {
        if prev.get(key) != Some(value) {
            changes.insert(key.clone(), Some(value.clone()));
        }
    }
    for key in prev.keys() {
        if !next.contains_key(key) {
            changes.insert(key.clone(), None);
        }
    }
    changes
}

/// Partial change set turning `prev` into `next`.
pub fn diff(prev: &StateSnapshot, next: &StateSnapshot) -> StateChanges {
    StateChanges {
        full: false,
        units: diff_collection(&prev.units, &next.units),
        buildings: diff_collection(&prev.buildings, &next.buildings),
        resources: diff_collection(&prev.resources, &next.resources),
        technologies: diff_collection(&prev.technologies, &next.technologies),
        resource_nodes: diff_collection(&prev.resource_nodes, &next.resource_nodes),
    }
}
