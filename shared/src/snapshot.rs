//! Replicated world state: full snapshots and per-tick change sets.
//!
//! A [`StateSnapshot`] is the complete, self-contained view of a running
//! game. A [`StateChanges`] carries either a full snapshot (`full == true`)
//! or only the entries that changed since the previous broadcast, with
//! `None` (serialized as `null`) marking a removed entry. Clients apply
//! both forms with [`StateSnapshot::apply`].

use crate::kinds::{BuildingKind, Faction, ResourceKind, TechKind, UnitKind};
use crate::resources::ResourceBalance;
use crate::{EntityId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Resource payload carried by a worker between node and drop-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carried {
    pub kind: ResourceKind,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitState {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: UnitKind,
    pub faction: Faction,
    pub health: f32,
    pub max_health: f32,
    pub x: f32,
    pub y: f32,
    pub moving: bool,
    pub gathering: bool,
    pub attacking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrying: Option<Carried>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedUnit {
    pub unit_type: UnitKind,
    pub remaining_ms: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingState {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: BuildingKind,
    pub health: f32,
    pub max_health: f32,
    pub x: i32,
    pub y: i32,
    pub size: u32,
    pub queue: Vec<QueuedUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNodeState {
    pub kind: ResourceKind,
    pub quantity: u32,
}

/// Key used for the `resourceNodes` collection.
pub fn node_key(x: i32, y: i32) -> String {
    format!("{},{}", x, y)
}

/// Serde adapter for maps keyed by [`EntityId`].
///
/// JSON object keys are always strings. A message nested in an internally
/// tagged enum is buffered before its fields are decoded, and the buffered
/// path does not turn `"7"` back into an integer key, so the keys are
/// written and parsed explicitly.
mod entity_keys {
    use crate::EntityId;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, V>(map: &BTreeMap<EntityId, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_map(map.iter().map(|(id, value)| (id.to_string(), value)))
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<EntityId, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        BTreeMap::<String, V>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, value)| {
                key.parse::<EntityId>()
                    .map(|id| (id, value))
                    .map_err(|e| D::Error::custom(format!("bad entity id {:?}: {}", key, e)))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(with = "entity_keys")]
    pub units: BTreeMap<EntityId, UnitState>,
    #[serde(with = "entity_keys")]
    pub buildings: BTreeMap<EntityId, BuildingState>,
    pub resources: BTreeMap<PlayerId, ResourceBalance>,
    pub technologies: BTreeMap<PlayerId, BTreeSet<TechKind>>,
    pub resource_nodes: BTreeMap<String, ResourceNodeState>,
}

impl StateSnapshot {
    /// Applies a full or partial change set on top of this snapshot.
    pub fn apply(&mut self, changes: &StateChanges) {
        if changes.full {
            *self = StateSnapshot::default();
        }
        apply_collection(&mut self.units, &changes.units);
        apply_collection(&mut self.buildings, &changes.buildings);
        apply_collection(&mut self.resources, &changes.resources);
        apply_collection(&mut self.technologies, &changes.technologies);
        apply_collection(&mut self.resource_nodes, &changes.resource_nodes);
    }
}

fn apply_collection<K: Ord + Clone, V: Clone>(
    target: &mut BTreeMap<K, V>,
    changes: &BTreeMap<K, Option<V>>,
) {
    for (key, change) in changes {
        match change {
            Some(value) => {
                target.insert(key.clone(), value.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }
}

/// Payload of a `stateUpdate` message.
///
/// Empty collections are omitted from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChanges {
    #[serde(default)]
    pub full: bool,
    #[serde(default, with = "entity_keys", skip_serializing_if = "BTreeMap::is_empty")]
    pub units: BTreeMap<EntityId, Option<UnitState>>,
    #[serde(default, with = "entity_keys", skip_serializing_if = "BTreeMap::is_empty")]
    pub buildings: BTreeMap<EntityId, Option<BuildingState>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<PlayerId, Option<ResourceBalance>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub technologies: BTreeMap<PlayerId, Option<BTreeSet<TechKind>>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_nodes: BTreeMap<String, Option<ResourceNodeState>>,
}

impl StateChanges {
    /// Wraps a whole snapshot as a full-state change set.
    pub fn full(snapshot: &StateSnapshot) -> Self {
        fn wrap<K: Ord + Clone, V: Clone>(source: &BTreeMap<K, V>) -> BTreeMap<K, Option<V>> {
            source
                .iter()
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect()
        }

        Self {
            full: true,
            units: wrap(&snapshot.units),
            buildings: wrap(&snapshot.buildings),
            resources: wrap(&snapshot.resources),
            technologies: wrap(&snapshot.technologies),
            resource_nodes: wrap(&snapshot.resource_nodes),
        }
    }

    /// A partial change set with nothing in it. Full snapshots are never empty.
    pub fn is_empty(&self) -> bool {
        !self.full
            && self.units.is_empty()
            && self.buildings.is_empty()
            && self.resources.is_empty()
            && self.technologies.is_empty()
            && self.resource_nodes.is_empty()
    }
}
