//! Continuous processes of a running world: movement, gathering, combat,
//! production and the passive resource trickle.
//!
//! Units are stepped one at a time in id order. The stepped unit is taken out
//! of the unit table for the duration of its step, so it can read and mutate
//! the rest of the world freely.

use crate::combat::{compute_damage, TargetClass};
use crate::entity::{GatherPhase, GatherState, Unit};
use crate::map::{distance_to_footprint, TilePos};
use crate::pathfinding::{find_path, find_path_to, Goal};
use crate::world::World;
use log::{debug, warn};
use rand::Rng;
use shared::{Carried, EntityId, PlayerId, ResourceKind, UnitKind};

/// Distance below which a moving unit snaps onto its waypoint.
const WAYPOINT_EPSILON: f32 = 0.05;
/// How close to a drop-off footprint a worker must be to deposit.
const DROP_OFF_REACH: f32 = 1.5;

/// What an attacker is currently aiming at, resolved for this tick.
enum Target {
    Unit {
        kind: UnitKind,
        x: f32,
        y: f32,
        tile: TilePos,
    },
    Building {
        origin: TilePos,
        size: i32,
    },
}

impl World {
    /// Advances every continuous process by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        let ids: Vec<EntityId> = self.units.keys().copied().collect();

        for id in ids {
            // Killed earlier in this tick.
            let Some(mut unit) = self.units.remove(&id) else {
                continue;
            };
            self.step_movement(&mut unit, dt);
            if unit.kind.is_worker() {
                self.step_gathering(&mut unit, dt);
            }
            self.step_combat(&mut unit, dt);
            self.units.insert(id, unit);
        }

        self.step_production(dt);
        self.step_trickle(dt);
    }

    fn step_movement(&self, unit: &mut Unit, dt: f32) {
        let mut budget = self.config.balance.unit(unit.kind).speed * dt;

        while budget > 0.0 {
            let Some(next) = unit.path.front().copied() else {
                break;
            };
            if !self.map.is_walkable(next) {
                // A building went up on the route.
                unit.path.clear();
                break;
            }

            let (tx, ty) = next.center();
            let dx = tx - unit.x;
            let dy = ty - unit.y;
            let distance = dx.hypot(dy);
            if distance <= budget + WAYPOINT_EPSILON {
                unit.x = tx;
                unit.y = ty;
                unit.path.pop_front();
                budget = (budget - distance).max(0.0);
            } else {
                unit.x += dx / distance * budget;
                unit.y += dy / distance * budget;
                budget = 0.0;
            }
        }
    }

    fn step_gathering(&mut self, unit: &mut Unit, dt: f32) {
        let Some(mut gather) = unit.gather.take() else {
            return;
        };

        let keep = match gather.phase {
            GatherPhase::Approach => self.gather_approach(unit, &mut gather),
            GatherPhase::Extract => self.gather_extract(unit, &mut gather, dt),
            GatherPhase::Return => self.gather_return(unit, &mut gather),
            GatherPhase::Deposit => self.gather_deposit(unit, &mut gather),
        };

        if keep {
            unit.gather = Some(gather);
        } else {
            unit.path.clear();
        }
    }

    /// Points `gather` at the nearest node of the same kind around its old
    /// node. Returns false when nothing is left nearby.
    fn relocate_node(&self, gather: &mut GatherState) -> bool {
        let radius = self.config.balance.resource_search_radius;
        match self.map.nearest_resource(gather.node, gather.kind, radius) {
            Some(node) => {
                gather.node = node;
                gather.phase = GatherPhase::Approach;
                gather.timer_ms = 0.0;
                true
            }
            None => false,
        }
    }

    fn gather_approach(&self, unit: &mut Unit, gather: &mut GatherState) -> bool {
        if self.map.resource_at(gather.node).is_none() && !self.relocate_node(gather) {
            debug!("Unit {} found no {:?} left to gather", unit.id, gather.kind);
            return false;
        }

        if unit.tile() == gather.node {
            if unit.path.is_empty() {
                gather.phase = GatherPhase::Extract;
                gather.timer_ms = 0.0;
            }
            return true;
        }

        let heading_there = unit.path.back() == Some(&gather.node);
        if !heading_there {
            match find_path(&self.map, unit.tile(), gather.node) {
                Some(path) if !path.is_empty() => unit.path = path.into(),
                _ => return false,
            }
        }
        true
    }

    fn gather_extract(&mut self, unit: &mut Unit, gather: &mut GatherState, dt: f32) -> bool {
        if self.map.resource_at(gather.node).is_none() {
            return self.relocate_node(gather);
        }

        gather.timer_ms += dt * 1000.0;
        if gather.timer_ms < self.config.balance.gather_time_ms {
            return true;
        }

        match self
            .map
            .take_resource(gather.node, self.config.balance.gather_amount)
        {
            Some((kind, amount)) if amount > 0 => {
                unit.carrying = Some(Carried { kind, amount });
                gather.phase = GatherPhase::Return;
                gather.timer_ms = 0.0;
                true
            }
            _ => self.relocate_node(gather),
        }
    }

    /// Nearest drop-off building of `owner` as `(origin, size, distance)`.
    fn nearest_drop_off(&self, owner: &str, x: f32, y: f32) -> Option<(TilePos, i32, f32)> {
        self.buildings
            .values()
            .filter(|b| b.owner == owner && b.kind.is_drop_off())
            .map(|b| (b.origin, b.size, distance_to_footprint(x, y, b.origin, b.size)))
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    fn gather_return(&self, unit: &mut Unit, gather: &mut GatherState) -> bool {
        if unit.carrying.is_none() {
            gather.phase = GatherPhase::Approach;
            return true;
        }

        let Some((origin, size, distance)) = self.nearest_drop_off(&unit.owner, unit.x, unit.y)
        else {
            debug!("Unit {} has nowhere to drop off", unit.id);
            return false;
        };

        if distance <= DROP_OFF_REACH {
            unit.path.clear();
            gather.phase = GatherPhase::Deposit;
            return true;
        }

        if unit.path.is_empty() {
            match find_path_to(&self.map, unit.tile(), Goal::adjacent_to(origin, size)) {
                Some(path) if !path.is_empty() => unit.path = path.into(),
                _ => return false,
            }
        }
        true
    }

    fn gather_deposit(&mut self, unit: &mut Unit, gather: &mut GatherState) -> bool {
        if let Some(payload) = unit.carrying.take() {
            if let Some(economy) = self.players.get_mut(&unit.owner) {
                economy.resources.credit(payload.kind, payload.amount);
            }
        }

        if self.map.resource_at(gather.node).is_some() {
            gather.phase = GatherPhase::Approach;
            gather.timer_ms = 0.0;
            true
        } else {
            self.relocate_node(gather)
        }
    }

    fn resolve_target(&self, id: EntityId) -> Option<Target> {
        if let Some(target) = self.units.get(&id) {
            return Some(Target::Unit {
                kind: target.kind,
                x: target.x,
                y: target.y,
                tile: target.tile(),
            });
        }
        self.buildings.get(&id).map(|b| Target::Building {
            origin: b.origin,
            size: b.size,
        })
    }

    fn step_combat(&mut self, unit: &mut Unit, dt: f32) {
        unit.attack_cooldown_ms = (unit.attack_cooldown_ms - dt * 1000.0).max(0.0);
        let Some(target_id) = unit.target else {
            return;
        };

        let Some(target) = self.resolve_target(target_id) else {
            unit.target = None;
            unit.path.clear();
            return;
        };

        let stats = self.config.balance.unit(unit.kind);
        let distance = match &target {
            Target::Unit { x, y, .. } => (x - unit.x).hypot(y - unit.y),
            Target::Building { origin, size } => distance_to_footprint(unit.x, unit.y, *origin, *size),
        };

        if distance > stats.range {
            let goal = match &target {
                Target::Unit { tile, .. } => Goal {
                    origin: *tile,
                    size: 1,
                    reach: 1,
                },
                Target::Building { origin, size } => Goal::adjacent_to(*origin, *size),
            };
            let stale = match unit.path.back() {
                None => true,
                Some(end) => !goal.is_satisfied(*end),
            };
            if stale {
                match find_path_to(&self.map, unit.tile(), goal) {
                    Some(path) if !path.is_empty() => unit.path = path.into(),
                    Some(_) => {
                        // Beside the target's tile but still out of range: close in on the tile itself.
                        if let Target::Unit { tile, .. } = &target {
                            if let Some(path) = find_path(&self.map, unit.tile(), *tile) {
                                unit.path = path.into();
                            }
                        }
                    }
                    None => {
                        debug!("Unit {} cannot reach target {}", unit.id, target_id);
                        unit.target = None;
                        unit.path.clear();
                    }
                }
            }
            return;
        }

        unit.path.clear();
        if unit.attack_cooldown_ms > 0.0 {
            return;
        }

        let balance = &self.config.balance;
        let critical = self.rng.gen::<f32>() < balance.crit_chance;
        unit.attack_cooldown_ms = stats.attack_cooldown_ms;

        let destroyed = match target {
            Target::Unit { kind, .. } => {
                let defense = balance.unit(kind).defense;
                let damage = compute_damage(balance, unit.kind, TargetClass::Unit(kind), defense, critical);
                self.units
                    .get_mut(&target_id)
                    .map(|victim| victim.take_damage(damage))
                    .unwrap_or(false)
            }
            Target::Building { .. } => {
                let damage = compute_damage(balance, unit.kind, TargetClass::Building, 0.0, critical);
                self.buildings
                    .get_mut(&target_id)
                    .map(|victim| victim.take_damage(damage))
                    .unwrap_or(false)
            }
        };

        if destroyed {
            if self.units.remove(&target_id).is_some() {
                debug!("Unit {} killed unit {}", unit.id, target_id);
            } else {
                self.destroy_building(target_id);
            }
            unit.target = None;
        }
    }

    fn step_production(&mut self, dt: f32) {
        let elapsed_ms = dt * 1000.0;
        let mut finished: Vec<(PlayerId, EntityId, UnitKind, TilePos, i32)> = Vec::new();

        for building in self.buildings.values_mut() {
            let Some(entry) = building.queue.front_mut() else {
                continue;
            };
            entry.remaining_ms -= elapsed_ms;
            if entry.remaining_ms <= 0.0 {
                let kind = entry.kind;
                building.queue.pop_front();
                finished.push((building.owner.clone(), building.id, kind, building.origin, building.size));
            }
        }

        let radius = self.config.balance.spawn_search_radius;
        for (owner, building_id, kind, origin, size) in finished {
            match self.map.find_spawn_tile(origin, size, radius) {
                Some(pos) => {
                    self.spawn_unit(&owner, kind, pos);
                }
                None => warn!(
                    "No room to spawn {:?} from building {}, unit lost",
                    kind, building_id
                ),
            }
        }
    }

    fn step_trickle(&mut self, dt: f32) {
        let rate = self.config.balance.trickle_per_second;
        if rate <= 0.0 {
            return;
        }

        for economy in self.players.values_mut() {
            economy.trickle_carry += rate * dt;
            let whole = economy.trickle_carry.floor();
            if whole >= 1.0 {
                economy.trickle_carry -= whole;
                for kind in ResourceKind::ALL {
                    economy.resources.credit(kind, whole as u32);
                }
            }
        }
    }
}
