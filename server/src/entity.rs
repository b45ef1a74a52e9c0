use crate::map::TilePos;
use shared::{
    BuildingKind, BuildingState, Carried, EntityId, Faction, PlayerId, QueuedUnit, ResourceKind,
    UnitKind, UnitState,
};
use std::collections::VecDeque;

/// Step of the worker gathering cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherPhase {
    /// Walking to the resource tile.
    Approach,
    /// Standing on the tile, running the gather timer.
    Extract,
    /// Carrying the payload to the nearest drop-off.
    Return,
    /// At the drop-off, crediting the payload.
    Deposit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatherState {
    pub node: TilePos,
    pub kind: ResourceKind,
    pub phase: GatherPhase,
    pub timer_ms: f32,
}

impl GatherState {
    pub fn new(node: TilePos, kind: ResourceKind, carrying: bool) -> Self {
        Self {
            node,
            kind,
            phase: if carrying {
                GatherPhase::Return
            } else {
                GatherPhase::Approach
            },
            timer_ms: 0.0,
        }
    }
}

// Unit representation
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: UnitKind,
    pub faction: Faction,
    pub health: f32,
    pub max_health: f32,
    pub x: f32,
    pub y: f32,
    pub path: VecDeque<TilePos>,
    pub gather: Option<GatherState>,
    pub target: Option<EntityId>,
    pub attack_cooldown_ms: f32,
    pub carrying: Option<Carried>,
}

impl Unit {
    pub fn new(
        id: EntityId,
        owner: PlayerId,
        kind: UnitKind,
        faction: Faction,
        max_health: f32,
        pos: TilePos,
    ) -> Self {
        let (x, y) = pos.center();
        Unit {
            id,
            owner,
            kind,
            faction,
            health: max_health,
            max_health,
            x,
            y,
            path: VecDeque::new(),
            gather: None,
            target: None,
            attack_cooldown_ms: 0.0,
            carrying: None,
        }
    }

    pub fn tile(&self) -> TilePos {
        TilePos::from_position(self.x, self.y)
    }

    /// Clamps health to `[0, max]`. Returns true once the unit is dead.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        self.health <= 0.0
    }

    /// Drops every activity: path, gathering and attack target.
    pub fn stop(&mut self) {
        self.path.clear();
        self.gather = None;
        self.target = None;
    }

    pub fn to_state(&self) -> UnitState {
        UnitState {
            id: self.id,
            owner: self.owner.clone(),
            kind: self.kind,
            faction: self.faction,
            health: self.health,
            max_health: self.max_health,
            x: self.x,
            y: self.y,
            moving: !self.path.is_empty(),
            gathering: self.gather.is_some(),
            attacking: self.target.is_some(),
            target_id: self.target,
            carrying: self.carrying,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionEntry {
    pub kind: UnitKind,
    pub remaining_ms: f32,
}

#[derive(Debug, Clone)]
pub struct Building {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: BuildingKind,
    pub health: f32,
    pub max_health: f32,
    /// Top-left tile of the footprint.
    pub origin: TilePos,
    pub size: i32,
    /// Only the front entry consumes time.
    pub queue: VecDeque<ProductionEntry>,
}

impl Building {
    pub fn new(
        id: EntityId,
        owner: PlayerId,
        kind: BuildingKind,
        max_health: f32,
        origin: TilePos,
        size: i32,
    ) -> Self {
        Building {
            id,
            owner,
            kind,
            health: max_health,
            max_health,
            origin,
            size,
            queue: VecDeque::new(),
        }
    }

    pub fn take_damage(&mut self, amount: f32) -> bool {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        self.health <= 0.0
    }

    pub fn to_state(&self) -> BuildingState {
        BuildingState {
            id: self.id,
            owner: self.owner.clone(),
            kind: self.kind,
            health: self.health,
            max_health: self.max_health,
            x: self.origin.x,
            y: self.origin.y,
            size: self.size as u32,
            queue: self
                .queue
                .iter()
                .map(|entry| QueuedUnit {
                    unit_type: entry.kind,
                    remaining_ms: entry.remaining_ms,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archer() -> Unit {
        Unit::new(
            1,
            "p1".to_string(),
            UnitKind::Archer,
            Faction::Sylvan,
            70.0,
            TilePos::new(3, 4),
        )
    }

    #[test]
    fn test_unit_health_clamped() {
        let mut unit = archer();
        assert!(!unit.take_damage(-500.0));
        assert_eq!(unit.health, 70.0);
        assert!(unit.take_damage(1000.0));
        assert_eq!(unit.health, 0.0);
    }

    #[test]
    fn test_unit_state_flags() {
        let mut unit = archer();
        unit.path.push_back(TilePos::new(4, 4));
        unit.target = Some(9);

        let state = unit.to_state();
        assert!(state.moving);
        assert!(state.attacking);
        assert!(!state.gathering);
        assert_eq!(state.target_id, Some(9));
        assert_eq!((state.x, state.y), (3.0, 4.0));

        unit.stop();
        let state = unit.to_state();
        assert!(!state.moving && !state.attacking);
    }

    #[test]
    fn test_building_state_lists_queue() {
        let mut building = Building::new(
            2,
            "p1".to_string(),
            BuildingKind::Barracks,
            800.0,
            TilePos::new(10, 10),
            2,
        );
        building.queue.push_back(ProductionEntry {
            kind: UnitKind::Infantry,
            remaining_ms: 8000.0,
        });

        let state = building.to_state();
        assert_eq!(state.queue.len(), 1);
        assert_eq!(state.queue[0].unit_type, UnitKind::Infantry);
        assert_eq!(state.size, 2);
    }

    #[test]
    fn test_gather_state_starts_by_returning_when_carrying() {
        let gather = GatherState::new(TilePos::new(1, 1), ResourceKind::Wood, true);
        assert_eq!(gather.phase, GatherPhase::Return);
    }
}
