//! Authoritative world state of one running game.
//!
//! [`World`] owns the map and every entity. After start its canonical fields
//! only change through [`World::apply_event`] (player intents) and
//! [`World::advance`] (continuous processes, see `simulation.rs`). Entity
//! references are plain ids resolved through the owning collections, so a
//! removed entity simply stops resolving.

use crate::config::GameConfig;
use crate::entity::{Building, GatherState, ProductionEntry, Unit};
use crate::error::EventRejection;
use crate::map::{seat_positions, GameMap, TilePos};
use crate::pathfinding::find_path;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    node_key, BuildingKind, EntityId, Event, Faction, GameEventKind, PlayerId, ResourceAdjustment,
    ResourceBalance, ResourceNodeState, StateSnapshot, TechKind, UnitKind,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Per-player economy tracked by the world.
#[derive(Debug, Clone)]
pub struct PlayerEconomy {
    pub faction: Faction,
    pub resources: ResourceBalance,
    pub researched: BTreeSet<TechKind>,
    pub(crate) trickle_carry: f32,
}

pub struct World {
    pub(crate) config: Arc<GameConfig>,
    pub(crate) map: GameMap,
    pub(crate) units: BTreeMap<EntityId, Unit>,
    pub(crate) buildings: BTreeMap<EntityId, Building>,
    pub(crate) players: BTreeMap<PlayerId, PlayerEconomy>,
    pub(crate) rng: StdRng,
    next_entity_id: EntityId,
}

impl World {
    /// An empty world on `map`. Players and entities are added explicitly.
    pub fn new(map: GameMap, config: Arc<GameConfig>, rng_seed: u64) -> Self {
        Self {
            config,
            map,
            units: BTreeMap::new(),
            buildings: BTreeMap::new(),
            players: BTreeMap::new(),
            rng: StdRng::seed_from_u64(rng_seed),
            next_entity_id: 1,
        }
    }

    /// Generates the map from `seed` and gives every player, in seat order,
    /// a town center, starting workers and starting resources.
    pub fn setup(config: Arc<GameConfig>, seed: u64, players: &[(PlayerId, Faction)]) -> Self {
        let seats = seat_positions(config.map_size, players.len());
        let map = GameMap::generate(config.map_size, seed, &seats);
        let mut world = World::new(map, config, seed.rotate_left(17));
        let town_center = world.config.balance.building(BuildingKind::TownCenter);
        let workers = world.config.balance.starting_workers as i32;

        for ((player_id, faction), seat) in players.iter().zip(seats) {
            world.add_player(player_id.clone(), *faction);
            if let Err(reason) = world.place_building(player_id, BuildingKind::TownCenter, seat) {
                debug!("No town center for {} at {:?}: {}", player_id, seat, reason);
                continue;
            }

            let size = town_center.size as i32;
            for i in 0..workers {
                let row = seat.offset(i % size, size + i / size);
                let pos = if world.map.is_walkable(row) {
                    Some(row)
                } else {
                    let radius = world.config.balance.spawn_search_radius;
                    world.map.find_spawn_tile(seat, size, radius)
                };
                if let Some(pos) = pos {
                    world.spawn_unit(player_id, UnitKind::Worker, pos);
                }
            }
        }

        world
    }

    pub fn add_player(&mut self, player_id: PlayerId, faction: Faction) {
        self.players.insert(
            player_id,
            PlayerEconomy {
                faction,
                resources: self.config.balance.starting_resources,
                researched: BTreeSet::new(),
                trickle_carry: 0.0,
            },
        );
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut GameMap {
        &mut self.map
    }

    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn economy(&self, player_id: &str) -> Option<&PlayerEconomy> {
        self.players.get(player_id)
    }

    pub fn resources(&self, player_id: &str) -> Option<ResourceBalance> {
        self.players.get(player_id).map(|p| p.resources)
    }

    /// Overwrites a player's balance. Intended for scenario setup.
    pub fn set_resources(&mut self, player_id: &str, resources: ResourceBalance) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.resources = resources;
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Inserts a unit for `owner` on `pos` without charging anything.
    pub fn spawn_unit(&mut self, owner: &str, kind: UnitKind, pos: TilePos) -> Option<EntityId> {
        let faction = self.players.get(owner)?.faction;
        let max_health = self.config.balance.unit(kind).max_health;
        let id = self.allocate_id();
        self.units.insert(
            id,
            Unit::new(id, owner.to_string(), kind, faction, max_health, pos),
        );
        Some(id)
    }

    fn check_footprint(&self, origin: TilePos, size: i32) -> Result<(), EventRejection> {
        for pos in GameMap::footprint(origin, size) {
            let tile = self
                .map
                .tile_at(pos)
                .ok_or(EventRejection::OutOfBounds(pos.x, pos.y))?;
            if !tile.walkable {
                return Err(EventRejection::Unwalkable(pos.x, pos.y));
            }
            if tile.resource.is_some() {
                return Err(EventRejection::ResourceInTheWay(pos.x, pos.y));
            }
        }
        Ok(())
    }

    /// Inserts a building without charging anything and marks its footprint
    /// unwalkable.
    pub fn place_building(
        &mut self,
        owner: &str,
        kind: BuildingKind,
        origin: TilePos,
    ) -> Result<EntityId, EventRejection> {
        if !self.players.contains_key(owner) {
            return Err(EventRejection::UnknownPlayer(owner.to_string()));
        }
        let stats = self.config.balance.building(kind);
        let size = stats.size.max(1) as i32;
        self.check_footprint(origin, size)?;

        let id = self.allocate_id();
        for pos in GameMap::footprint(origin, size) {
            self.map.set_walkable(pos, false);
        }
        self.buildings.insert(
            id,
            Building::new(id, owner.to_string(), kind, stats.max_health, origin, size),
        );
        Ok(id)
    }

    /// Removes a building and frees its footprint.
    pub(crate) fn destroy_building(&mut self, id: EntityId) {
        if let Some(building) = self.buildings.remove(&id) {
            for pos in GameMap::footprint(building.origin, building.size) {
                self.map.set_walkable(pos, true);
            }
            debug!("Building {} of {} destroyed", id, building.owner);
        }
    }

    /// Validates and integrates one intent. Either everything is applied or,
    /// on `Err`, nothing is.
    pub fn apply_event(&mut self, event: &Event) -> Result<(), EventRejection> {
        let player = event.player_id.as_str();
        if !self.players.contains_key(player) {
            return Err(EventRejection::UnknownPlayer(event.player_id.clone()));
        }

        match &event.kind {
            GameEventKind::UnitMove {
                unit_ids,
                target_x,
                target_y,
            } => self.order_move(player, unit_ids, TilePos::new(*target_x, *target_y)),
            GameEventKind::UnitCreate {
                unit_type,
                building_id,
                x,
                y,
            } => match (building_id, x, y) {
                (Some(building_id), _, _) => self.queue_unit(player, *unit_type, *building_id),
                (None, Some(x), Some(y)) => {
                    self.create_unit_at(player, *unit_type, TilePos::new(*x, *y))
                }
                _ => Err(EventRejection::NoSpawnLocation),
            },
            GameEventKind::BuildingCreate {
                building_type,
                x,
                y,
            } => self.create_building(player, *building_type, TilePos::new(*x, *y)),
            GameEventKind::ResourceUpdate { resources } => self.adjust_resources(player, resources),
            GameEventKind::ResearchTech { tech } => self.research(player, *tech),
            GameEventKind::Attack {
                unit_ids,
                target_id,
            } => self.order_attack(player, unit_ids, *target_id),
        }
    }

    /// Deducts `cost` from `player`, or fails without touching the balance.
    fn charge(&mut self, player: &str, cost: &ResourceBalance) -> Result<(), EventRejection> {
        let economy = self
            .players
            .get_mut(player)
            .ok_or_else(|| EventRejection::UnknownPlayer(player.to_string()))?;
        economy.resources = economy
            .resources
            .checked_sub(cost)
            .ok_or(EventRejection::InsufficientResources)?;
        Ok(())
    }

    fn affordable(&self, player: &str, cost: &ResourceBalance) -> Result<(), EventRejection> {
        match self.players.get(player) {
            Some(economy) if economy.resources.covers(cost) => Ok(()),
            Some(_) => Err(EventRejection::InsufficientResources),
            None => Err(EventRejection::UnknownPlayer(player.to_string())),
        }
    }

    fn owned_units(&self, player: &str, unit_ids: &[EntityId]) -> Vec<EntityId> {
        let mut seen = BTreeSet::new();
        unit_ids
            .iter()
            .copied()
            .filter(|id| {
                self.units
                    .get(id)
                    .map(|unit| unit.owner == player)
                    .unwrap_or(false)
            })
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn order_move(
        &mut self,
        player: &str,
        unit_ids: &[EntityId],
        target: TilePos,
    ) -> Result<(), EventRejection> {
        if !self.map.in_bounds(target) {
            return Err(EventRejection::OutOfBounds(target.x, target.y));
        }
        if !self.map.is_walkable(target) {
            return Err(EventRejection::Unwalkable(target.x, target.y));
        }
        let movers = self.owned_units(player, unit_ids);
        if movers.is_empty() {
            return Err(EventRejection::NoEligibleUnits);
        }

        let resource = self.map.resource_at(target);
        let map = &self.map;
        for id in movers {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.stop();
                unit.path = find_path(map, unit.tile(), target)
                    .unwrap_or_default()
                    .into();
                if let (true, Some(node)) = (unit.kind.is_worker(), resource) {
                    unit.gather = Some(GatherState::new(target, node.kind, unit.carrying.is_some()));
                }
            }
        }
        Ok(())
    }

    fn create_unit_at(
        &mut self,
        player: &str,
        kind: UnitKind,
        pos: TilePos,
    ) -> Result<(), EventRejection> {
        if !self.map.in_bounds(pos) {
            return Err(EventRejection::OutOfBounds(pos.x, pos.y));
        }
        if !self.map.is_walkable(pos) {
            return Err(EventRejection::Unwalkable(pos.x, pos.y));
        }
        let cost = self.config.balance.unit(kind).cost;
        self.charge(player, &cost)?;
        self.spawn_unit(player, kind, pos);
        Ok(())
    }

    fn queue_unit(
        &mut self,
        player: &str,
        kind: UnitKind,
        building_id: EntityId,
    ) -> Result<(), EventRejection> {
        let building = self
            .buildings
            .get(&building_id)
            .ok_or(EventRejection::UnknownEntity(building_id))?;
        if building.owner != player {
            return Err(EventRejection::NotOwner(building_id));
        }
        if !building.kind.can_train(kind) {
            return Err(EventRejection::CannotTrain(building_id));
        }
        if building.queue.len() >= self.config.balance.max_queue_len {
            return Err(EventRejection::QueueFull(building_id));
        }

        let stats = self.config.balance.unit(kind);
        self.charge(player, &stats.cost)?;
        if let Some(building) = self.buildings.get_mut(&building_id) {
            building.queue.push_back(ProductionEntry {
                kind,
                remaining_ms: stats.production_time_ms,
            });
        }
        Ok(())
    }

    fn create_building(
        &mut self,
        player: &str,
        kind: BuildingKind,
        origin: TilePos,
    ) -> Result<(), EventRejection> {
        let stats = self.config.balance.building(kind);
        self.check_footprint(origin, stats.size.max(1) as i32)?;
        self.affordable(player, &stats.cost)?;
        self.place_building(player, kind, origin)?;
        self.charge(player, &stats.cost)
    }

    fn adjust_resources(
        &mut self,
        player: &str,
        adjustment: &ResourceAdjustment,
    ) -> Result<(), EventRejection> {
        let economy = self
            .players
            .get_mut(player)
            .ok_or_else(|| EventRejection::UnknownPlayer(player.to_string()))?;
        economy.resources = economy
            .resources
            .adjusted(adjustment)
            .ok_or(EventRejection::InsufficientResources)?;
        Ok(())
    }

    fn research(&mut self, player: &str, tech: TechKind) -> Result<(), EventRejection> {
        let already = self
            .players
            .get(player)
            .map(|p| p.researched.contains(&tech))
            .unwrap_or(false);
        if already {
            return Err(EventRejection::AlreadyResearched);
        }
        let cost = self.config.balance.tech_cost(tech);
        self.charge(player, &cost)?;
        if let Some(economy) = self.players.get_mut(player) {
            economy.researched.insert(tech);
        }
        Ok(())
    }

    fn order_attack(
        &mut self,
        player: &str,
        unit_ids: &[EntityId],
        target_id: EntityId,
    ) -> Result<(), EventRejection> {
        let target_owner = self
            .units
            .get(&target_id)
            .map(|u| u.owner.as_str())
            .or_else(|| self.buildings.get(&target_id).map(|b| b.owner.as_str()))
            .ok_or(EventRejection::UnknownEntity(target_id))?;
        if target_owner == player {
            return Err(EventRejection::FriendlyTarget(target_id));
        }
        let attackers = self.owned_units(player, unit_ids);
        if attackers.is_empty() {
            return Err(EventRejection::NoEligibleUnits);
        }

        for id in attackers {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.stop();
                unit.target = Some(target_id);
            }
        }
        Ok(())
    }

    /// Deep, serializable copy of every replicated entity.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            units: self
                .units
                .iter()
                .map(|(id, unit)| (*id, unit.to_state()))
                .collect(),
            buildings: self
                .buildings
                .iter()
                .map(|(id, building)| (*id, building.to_state()))
                .collect(),
            resources: self
                .players
                .iter()
                .map(|(id, economy)| (id.clone(), economy.resources))
                .collect(),
            technologies: self
                .players
                .iter()
                .map(|(id, economy)| (id.clone(), economy.researched.clone()))
                .collect(),
            resource_nodes: self
                .map
                .resource_nodes()
                .map(|(pos, node)| {
                    (
                        node_key(pos.x, pos.y),
                        ResourceNodeState {
                            kind: node.kind,
                            quantity: node.quantity,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::map::ResourceNode;
    use shared::ResourceKind;

    pub(crate) fn test_config() -> Arc<GameConfig> {
        let mut config = GameConfig::default();
        config.balance.crit_chance = 0.0;
        config.balance.trickle_per_second = 0.0;
        Arc::new(config)
    }

    pub(crate) fn two_player_world() -> World {
        let mut world = World::new(GameMap::new(32), test_config(), 7);
        world.add_player("p1".to_string(), Faction::Kingdom);
        world.add_player("p2".to_string(), Faction::Horde);
        world
    }

    pub(crate) fn event(player: &str, kind: GameEventKind) -> Event {
        Event {
            player_id: player.to_string(),
            timestamp: 0,
            kind,
        }
    }

    #[test]
    fn test_create_unit_deducts_cost() {
        let mut world = two_player_world();
        let before = world.resources("p1").unwrap();
        let cost = world.config.balance.unit(UnitKind::Worker).cost;

        let result = world.apply_event(&event(
            "p1",
            GameEventKind::UnitCreate {
                unit_type: UnitKind::Worker,
                building_id: None,
                x: Some(4),
                y: Some(4),
            },
        ));

        assert!(result.is_ok());
        assert_eq!(world.resources("p1"), before.checked_sub(&cost));
        assert_eq!(world.units().count(), 1);
    }

    #[test]
    fn test_rejected_create_leaves_balance_untouched() {
        let mut world = two_player_world();
        world.map_mut().set_walkable(TilePos::new(4, 4), false);
        let before = world.resources("p1").unwrap();

        let blocked = world.apply_event(&event(
            "p1",
            GameEventKind::UnitCreate {
                unit_type: UnitKind::Worker,
                building_id: None,
                x: Some(4),
                y: Some(4),
            },
        ));
        assert_eq!(blocked, Err(EventRejection::Unwalkable(4, 4)));

        let outside = world.apply_event(&event(
            "p1",
            GameEventKind::BuildingCreate {
                building_type: BuildingKind::Barracks,
                x: 31,
                y: 5,
            },
        ));
        assert_eq!(outside, Err(EventRejection::OutOfBounds(32, 5)));

        world.set_resources("p1", ResourceBalance::new(0, 10, 0, 0));
        let broke = world.apply_event(&event(
            "p1",
            GameEventKind::BuildingCreate {
                building_type: BuildingKind::Barracks,
                x: 10,
                y: 10,
            },
        ));
        assert_eq!(broke, Err(EventRejection::InsufficientResources));
        assert_eq!(world.resources("p1"), Some(ResourceBalance::new(0, 10, 0, 0)));
        assert!(world.map().is_walkable(TilePos::new(10, 10)));
        assert_eq!(world.resources("p2").unwrap(), before);
        assert_eq!(world.units().count() + world.buildings().count(), 0);
    }

    #[test]
    fn test_building_marks_footprint() {
        let mut world = two_player_world();
        world.set_resources("p1", ResourceBalance::new(0, 500, 0, 0));

        world
            .apply_event(&event(
                "p1",
                GameEventKind::BuildingCreate {
                    building_type: BuildingKind::Barracks,
                    x: 10,
                    y: 10,
                },
            ))
            .unwrap();

        assert_eq!(world.resources("p1"), Some(ResourceBalance::new(0, 350, 0, 0)));
        for pos in GameMap::footprint(TilePos::new(10, 10), 2) {
            assert!(!world.map().is_walkable(pos));
        }

        let overlap = world.apply_event(&event(
            "p1",
            GameEventKind::BuildingCreate {
                building_type: BuildingKind::Storehouse,
                x: 11,
                y: 11,
            },
        ));
        assert_eq!(overlap, Err(EventRejection::Unwalkable(11, 11)));
    }

    #[test]
    fn test_building_cannot_cover_resource() {
        let mut world = two_player_world();
        world.map_mut().set_resource(
            TilePos::new(6, 6),
            Some(ResourceNode {
                kind: ResourceKind::Stone,
                quantity: 100,
            }),
        );
        let result = world.apply_event(&event(
            "p1",
            GameEventKind::BuildingCreate {
                building_type: BuildingKind::Storehouse,
                x: 5,
                y: 5,
            },
        ));
        assert_eq!(result, Err(EventRejection::ResourceInTheWay(6, 6)));
    }

    #[test]
    fn test_move_assigns_path_and_cancels_attack() {
        let mut world = two_player_world();
        let mine = world.spawn_unit("p1", UnitKind::Infantry, TilePos::new(2, 2)).unwrap();
        let theirs = world.spawn_unit("p2", UnitKind::Archer, TilePos::new(20, 20)).unwrap();
        world
            .apply_event(&event(
                "p1",
                GameEventKind::Attack {
                    unit_ids: vec![mine],
                    target_id: theirs,
                },
            ))
            .unwrap();
        assert_eq!(world.unit(mine).unwrap().target, Some(theirs));

        world
            .apply_event(&event(
                "p1",
                GameEventKind::UnitMove {
                    unit_ids: vec![mine, theirs, 999],
                    target_x: 6,
                    target_y: 2,
                },
            ))
            .unwrap();

        let unit = world.unit(mine).unwrap();
        assert_eq!(unit.target, None);
        assert_eq!(unit.path.back(), Some(&TilePos::new(6, 2)));
        assert!(world.unit(theirs).unwrap().path.is_empty());
    }

    #[test]
    fn test_move_rejections() {
        let mut world = two_player_world();
        let theirs = world.spawn_unit("p2", UnitKind::Archer, TilePos::new(3, 3)).unwrap();
        world.map_mut().set_walkable(TilePos::new(9, 9), false);

        let foreign = world.apply_event(&event(
            "p1",
            GameEventKind::UnitMove {
                unit_ids: vec![theirs],
                target_x: 5,
                target_y: 5,
            },
        ));
        assert_eq!(foreign, Err(EventRejection::NoEligibleUnits));

        let blocked = world.apply_event(&event(
            "p2",
            GameEventKind::UnitMove {
                unit_ids: vec![theirs],
                target_x: 9,
                target_y: 9,
            },
        ));
        assert_eq!(blocked, Err(EventRejection::Unwalkable(9, 9)));

        let outside = world.apply_event(&event(
            "p2",
            GameEventKind::UnitMove {
                unit_ids: vec![theirs],
                target_x: -1,
                target_y: 0,
            },
        ));
        assert_eq!(outside, Err(EventRejection::OutOfBounds(-1, 0)));
    }

    #[test]
    fn test_attack_rejections() {
        let mut world = two_player_world();
        let mine = world.spawn_unit("p1", UnitKind::Infantry, TilePos::new(2, 2)).unwrap();
        let friend = world.spawn_unit("p1", UnitKind::Archer, TilePos::new(3, 2)).unwrap();

        assert_eq!(
            world.apply_event(&event(
                "p1",
                GameEventKind::Attack {
                    unit_ids: vec![mine],
                    target_id: friend,
                },
            )),
            Err(EventRejection::FriendlyTarget(friend))
        );
        assert_eq!(
            world.apply_event(&event(
                "p1",
                GameEventKind::Attack {
                    unit_ids: vec![mine],
                    target_id: 404,
                },
            )),
            Err(EventRejection::UnknownEntity(404))
        );
    }

    #[test]
    fn test_queue_unit_validation() {
        let mut world = two_player_world();
        let barracks = world
            .place_building("p1", BuildingKind::Barracks, TilePos::new(10, 10))
            .unwrap();
        world.set_resources("p1", ResourceBalance::new(1000, 1000, 1000, 1000));

        let wrong_kind = world.apply_event(&event(
            "p1",
            GameEventKind::UnitCreate {
                unit_type: UnitKind::Archer,
                building_id: Some(barracks),
                x: None,
                y: None,
            },
        ));
        assert_eq!(wrong_kind, Err(EventRejection::CannotTrain(barracks)));

        let not_mine = world.apply_event(&event(
            "p2",
            GameEventKind::UnitCreate {
                unit_type: UnitKind::Infantry,
                building_id: Some(barracks),
                x: None,
                y: None,
            },
        ));
        assert_eq!(not_mine, Err(EventRejection::NotOwner(barracks)));

        let limit = world.config.balance.max_queue_len;
        for _ in 0..limit {
            world
                .apply_event(&event(
                    "p1",
                    GameEventKind::UnitCreate {
                        unit_type: UnitKind::Infantry,
                        building_id: Some(barracks),
                        x: None,
                        y: None,
                    },
                ))
                .unwrap();
        }
        let overflow = world.apply_event(&event(
            "p1",
            GameEventKind::UnitCreate {
                unit_type: UnitKind::Infantry,
                building_id: Some(barracks),
                x: None,
                y: None,
            },
        ));
        assert_eq!(overflow, Err(EventRejection::QueueFull(barracks)));
        assert_eq!(world.building(barracks).unwrap().queue.len(), limit);
        assert_eq!(
            world.resources("p1"),
            Some(ResourceBalance::new(1000 - 60 * limit as u32, 1000, 1000, 1000 - 20 * limit as u32))
        );
    }

    #[test]
    fn test_research_sets_flag_once() {
        let mut world = two_player_world();
        world.set_resources("p1", ResourceBalance::new(500, 500, 500, 500));
        let research = event(
            "p1",
            GameEventKind::ResearchTech {
                tech: TechKind::Masonry,
            },
        );

        assert!(world.apply_event(&research).is_ok());
        assert!(world.economy("p1").unwrap().researched.contains(&TechKind::Masonry));
        assert_eq!(world.resources("p1"), Some(ResourceBalance::new(500, 450, 400, 500)));
        assert_eq!(world.apply_event(&research), Err(EventRejection::AlreadyResearched));
    }

    #[test]
    fn test_resource_update_cannot_go_negative() {
        let mut world = two_player_world();
        world.set_resources("p1", ResourceBalance::new(10, 0, 0, 0));
        let overdraw = world.apply_event(&event(
            "p1",
            GameEventKind::ResourceUpdate {
                resources: ResourceAdjustment {
                    food: 5,
                    wood: -1,
                    ..Default::default()
                },
            },
        ));
        assert_eq!(overdraw, Err(EventRejection::InsufficientResources));
        assert_eq!(world.resources("p1"), Some(ResourceBalance::new(10, 0, 0, 0)));
    }

    #[test]
    fn test_unknown_player_rejected() {
        let mut world = two_player_world();
        let result = world.apply_event(&event(
            "ghost",
            GameEventKind::ResearchTech {
                tech: TechKind::Forging,
            },
        ));
        assert_eq!(result, Err(EventRejection::UnknownPlayer("ghost".to_string())));
    }

    #[test]
    fn test_setup_seats_every_player() {
        let players = vec![
            ("a".to_string(), Faction::Kingdom),
            ("b".to_string(), Faction::Horde),
        ];
        let world = World::setup(test_config(), 42, &players);

        for (id, _) in &players {
            assert_eq!(
                world
                    .buildings()
                    .filter(|b| &b.owner == id && b.kind == BuildingKind::TownCenter)
                    .count(),
                1
            );
            assert_eq!(world.units().filter(|u| &u.owner == id).count(), 3);
            assert_eq!(
                world.resources(id),
                Some(world.config.balance.starting_resources)
            );
        }
        let snapshot = world.snapshot();
        assert_eq!(snapshot.units.len(), 6);
        assert!(!snapshot.resource_nodes.is_empty());
    }
}
