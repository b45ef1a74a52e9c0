//! Closed enumerations shared by the server simulation and its clients.
//!
//! All of these serialize as `snake_case` strings so the wire format stays
//! readable (`"unitType": "archer"`).

use serde::{Deserialize, Serialize};

/// Playable faction, chosen in the lobby before the game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Kingdom,
    Horde,
    Sylvan,
}

/// Gatherable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Wood,
    Stone,
    Gold,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Gold,
    ];
}

/// Trainable unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Worker,
    Infantry,
    Archer,
    Cavalry,
}

impl UnitKind {
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Worker,
        UnitKind::Infantry,
        UnitKind::Archer,
        UnitKind::Cavalry,
    ];

    /// Only workers run the gathering state machine.
    pub fn is_worker(self) -> bool {
        self == UnitKind::Worker
    }
}

/// Placeable building kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    TownCenter,
    Barracks,
    ArcheryRange,
    Storehouse,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 4] = [
        BuildingKind::TownCenter,
        BuildingKind::Barracks,
        BuildingKind::ArcheryRange,
        BuildingKind::Storehouse,
    ];

    /// Whether workers may deposit carried resources here.
    pub fn is_drop_off(self) -> bool {
        matches!(self, BuildingKind::TownCenter | BuildingKind::Storehouse)
    }

    /// Whether this building's production queue accepts `unit`.
    pub fn can_train(self, unit: UnitKind) -> bool {
        match self {
            BuildingKind::TownCenter => unit == UnitKind::Worker,
            BuildingKind::Barracks => matches!(unit, UnitKind::Infantry | UnitKind::Cavalry),
            BuildingKind::ArcheryRange => unit == UnitKind::Archer,
            BuildingKind::Storehouse => false,
        }
    }
}

/// Terrain of a single map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    Grass,
    Forest,
    Water,
    Mountain,
}

impl TerrainKind {
    pub fn is_walkable(self) -> bool {
        matches!(self, TerrainKind::Grass | TerrainKind::Forest)
    }
}

/// Researchable technologies. Research only costs resources and sets a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechKind {
    Agriculture,
    Masonry,
    Forging,
    Fletching,
}

impl TechKind {
    pub const ALL: [TechKind; 4] = [
        TechKind::Agriculture,
        TechKind::Masonry,
        TechKind::Forging,
        TechKind::Fletching,
    ];
}
