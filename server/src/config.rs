//! Server and balance configuration.
//!
//! Everything here has a sensible default. A JSON file passed with
//! `--config` may override any subset of fields; command line flags are
//! applied on top of that in `main`.

use serde::Deserialize;
use shared::{BuildingKind, ResourceBalance, TechKind, UnitKind, DEFAULT_MAP_SIZE};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Static combat and movement stats for one unit kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub max_health: f32,
    pub attack: f32,
    pub defense: f32,
    /// Attack reach in tiles.
    pub range: f32,
    /// Tiles per second.
    pub speed: f32,
    pub attack_cooldown_ms: f32,
    pub production_time_ms: f32,
    pub cost: ResourceBalance,
    pub counters: Vec<UnitKind>,
    pub weak_to: Vec<UnitKind>,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: 50.0,
            attack: 5.0,
            defense: 0.0,
            range: 1.5,
            speed: 2.0,
            attack_cooldown_ms: 1000.0,
            production_time_ms: 5000.0,
            cost: ResourceBalance::default(),
            counters: Vec::new(),
            weak_to: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildingStats {
    pub max_health: f32,
    pub size: u32,
    pub cost: ResourceBalance,
}

impl Default for BuildingStats {
    fn default() -> Self {
        Self {
            max_health: 500.0,
            size: 2,
            cost: ResourceBalance::default(),
        }
    }
}

/// Balance parameters consumed by the world simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub units: HashMap<UnitKind, UnitStats>,
    pub buildings: HashMap<BuildingKind, BuildingStats>,
    pub tech_costs: HashMap<TechKind, ResourceBalance>,
    pub counter_multiplier: f32,
    pub weakness_multiplier: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub gather_amount: u32,
    pub gather_time_ms: f32,
    /// Resources of every kind credited per player per second.
    pub trickle_per_second: f32,
    pub starting_resources: ResourceBalance,
    pub starting_workers: u32,
    pub max_queue_len: usize,
    pub resource_search_radius: i32,
    pub spawn_search_radius: i32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        let units = HashMap::from([
            (
                UnitKind::Worker,
                UnitStats {
                    max_health: 50.0,
                    attack: 3.0,
                    defense: 0.0,
                    range: 1.5,
                    speed: 2.0,
                    attack_cooldown_ms: 1500.0,
                    production_time_ms: 5000.0,
                    cost: ResourceBalance::new(50, 0, 0, 0),
                    counters: Vec::new(),
                    weak_to: Vec::new(),
                },
            ),
            (
                UnitKind::Infantry,
                UnitStats {
                    max_health: 100.0,
                    attack: 10.0,
                    defense: 3.0,
                    range: 1.5,
                    speed: 1.5,
                    attack_cooldown_ms: 1000.0,
                    production_time_ms: 8000.0,
                    cost: ResourceBalance::new(60, 0, 0, 20),
                    counters: vec![UnitKind::Archer],
                    weak_to: vec![UnitKind::Cavalry],
                },
            ),
            (
                UnitKind::Archer,
                UnitStats {
                    max_health: 70.0,
                    attack: 8.0,
                    defense: 1.0,
                    range: 5.0,
                    speed: 1.8,
                    attack_cooldown_ms: 1200.0,
                    production_time_ms: 8000.0,
                    cost: ResourceBalance::new(0, 40, 0, 30),
                    counters: vec![UnitKind::Cavalry],
                    weak_to: vec![UnitKind::Infantry],
                },
            ),
            (
                UnitKind::Cavalry,
                UnitStats {
                    max_health: 120.0,
                    attack: 12.0,
                    defense: 2.0,
                    range: 1.5,
                    speed: 3.0,
                    attack_cooldown_ms: 1100.0,
                    production_time_ms: 10000.0,
                    cost: ResourceBalance::new(80, 0, 0, 50),
                    counters: vec![UnitKind::Infantry],
                    weak_to: vec![UnitKind::Archer],
                },
            ),
        ]);

        let buildings = HashMap::from([
            (
                BuildingKind::TownCenter,
                BuildingStats {
                    max_health: 1500.0,
                    size: 3,
                    cost: ResourceBalance::new(0, 300, 200, 0),
                },
            ),
            (
                BuildingKind::Barracks,
                BuildingStats {
                    max_health: 800.0,
                    size: 2,
                    cost: ResourceBalance::new(0, 150, 0, 0),
                },
            ),
            (
                BuildingKind::ArcheryRange,
                BuildingStats {
                    max_health: 700.0,
                    size: 2,
                    cost: ResourceBalance::new(0, 150, 0, 0),
                },
            ),
            (
                BuildingKind::Storehouse,
                BuildingStats {
                    max_health: 500.0,
                    size: 2,
                    cost: ResourceBalance::new(0, 100, 0, 0),
                },
            ),
        ]);

        let tech_costs = HashMap::from([
            (TechKind::Agriculture, ResourceBalance::new(100, 50, 0, 0)),
            (TechKind::Masonry, ResourceBalance::new(0, 50, 100, 0)),
            (TechKind::Forging, ResourceBalance::new(100, 0, 0, 75)),
            (TechKind::Fletching, ResourceBalance::new(0, 100, 0, 50)),
        ]);

        Self {
            units,
            buildings,
            tech_costs,
            counter_multiplier: 1.5,
            weakness_multiplier: 1.5,
            crit_chance: 0.1,
            crit_multiplier: 1.5,
            gather_amount: 10,
            gather_time_ms: 2000.0,
            trickle_per_second: 0.2,
            starting_resources: ResourceBalance::new(200, 200, 100, 50),
            starting_workers: 3,
            max_queue_len: 5,
            resource_search_radius: 8,
            spawn_search_radius: 6,
        }
    }
}

impl BalanceConfig {
    /// Stats for `kind`, falling back to defaults when a partial config file
    /// omits it.
    pub fn unit(&self, kind: UnitKind) -> UnitStats {
        self.units.get(&kind).cloned().unwrap_or_default()
    }

    pub fn building(&self, kind: BuildingKind) -> BuildingStats {
        self.buildings.get(&kind).cloned().unwrap_or_default()
    }

    pub fn tech_cost(&self, tech: TechKind) -> ResourceBalance {
        self.tech_costs.get(&tech).copied().unwrap_or_default()
    }
}

/// Process-wide configuration shared by every room.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub map_size: u32,
    pub max_players_per_room: usize,
    pub tick_rate: u32,
    /// Upper bound on the simulated slice of one tick, in seconds.
    pub max_delta_secs: f32,
    pub reconnect_grace_secs: u64,
    pub ping_interval_secs: u64,
    /// Weight of the newest RTT sample in the moving average.
    pub latency_alpha: f32,
    /// Fixed map seed; `None` draws a fresh seed per room.
    pub map_seed: Option<u64>,
    pub balance: BalanceConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            max_players_per_room: 4,
            tick_rate: 20,
            max_delta_secs: 0.25,
            reconnect_grace_secs: 120,
            ping_interval_secs: 5,
            latency_alpha: 0.2,
            map_seed: None,
            balance: BalanceConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_rate.max(1) as f32)
    }

    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_secs(self.reconnect_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_defaults_cover_every_kind() {
        let balance = BalanceConfig::default();
        for kind in UnitKind::ALL {
            assert!(balance.units.contains_key(&kind), "missing {:?}", kind);
        }
        for kind in BuildingKind::ALL {
            assert!(balance.buildings.contains_key(&kind), "missing {:?}", kind);
        }
        for tech in TechKind::ALL {
            assert!(balance.tech_costs.contains_key(&tech), "missing {:?}", tech);
        }
    }

    #[test]
    fn test_counter_table_is_mirrored() {
        let balance = BalanceConfig::default();
        for kind in UnitKind::ALL {
            for countered in balance.unit(kind).counters {
                assert!(
                    balance.unit(countered).weak_to.contains(&kind),
                    "{:?} counters {:?} but is not listed as its weakness",
                    kind,
                    countered
                );
            }
        }
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json(
            r#"{"tick_rate": 15, "balance": {"crit_chance": 0.0, "gather_amount": 25}}"#,
        )
        .unwrap();

        assert_eq!(config.tick_rate, 15);
        assert_eq!(config.map_size, DEFAULT_MAP_SIZE);
        assert_eq!(config.balance.gather_amount, 25);
        assert_approx_eq!(config.balance.crit_chance, 0.0);
        assert_approx_eq!(config.balance.counter_multiplier, 1.5);
        assert_approx_eq!(config.tick_duration().as_secs_f32(), 1.0 / 15.0, 0.0001);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = GameConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
