//! Wire protocol and replicated data types shared by the game server and
//! its clients.
//!
//! Every message is a JSON object with a `type` discriminator and camelCase
//! field names. Game intents sent inside `gameEvent` carry a second
//! discriminator, `eventType`.

use serde::{Deserialize, Serialize};

pub mod kinds;
pub mod resources;
pub mod snapshot;

pub use kinds::{BuildingKind, Faction, ResourceKind, TechKind, TerrainKind, UnitKind};
pub use resources::{ResourceAdjustment, ResourceBalance};
pub use snapshot::{
    node_key, BuildingState, Carried, QueuedUnit, ResourceNodeState, StateChanges,
    StateSnapshot, UnitState,
};

/// Stable, opaque player identity. Survives reconnects.
pub type PlayerId = String;
/// Per-connection identity assigned by the transport.
pub type ClientId = u32;
/// Identity of a unit or building inside one world.
pub type EntityId = u32;

pub const DEFAULT_MAP_SIZE: u32 = 64;
pub const MIN_ROOM_CODE_LEN: usize = 4;
pub const MAX_ROOM_CODE_LEN: usize = 12;
pub const MAX_USERNAME_LEN: usize = 24;
pub const MAX_UNITS_PER_ORDER: usize = 64;
pub const MAX_RESOURCE_ADJUSTMENT: u32 = 10_000;

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinRoom {
        room_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    LeaveRoom {
        room_code: String,
    },
    UpdatePlayer {
        room_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        faction: Option<Faction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ready: Option<bool>,
    },
    StartGame {
        room_code: String,
    },
    GameEvent {
        room_code: String,
        #[serde(flatten)]
        event: GameEventKind,
    },
    Pong {
        room_code: String,
        timestamp: u64,
    },
    Reconnect {
        room_code: String,
        player_id: PlayerId,
        reconnect_token: String,
    },
}

impl ClientMessage {
    pub fn room_code(&self) -> &str {
        match self {
            ClientMessage::JoinRoom { room_code, .. }
            | ClientMessage::LeaveRoom { room_code }
            | ClientMessage::UpdatePlayer { room_code, .. }
            | ClientMessage::StartGame { room_code }
            | ClientMessage::GameEvent { room_code, .. }
            | ClientMessage::Pong { room_code, .. }
            | ClientMessage::Reconnect { room_code, .. } => room_code,
        }
    }
}

/// Player intents resolved by the world simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "eventType",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum GameEventKind {
    UnitMove {
        unit_ids: Vec<EntityId>,
        target_x: i32,
        target_y: i32,
    },
    UnitCreate {
        unit_type: UnitKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        building_id: Option<EntityId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<i32>,
    },
    BuildingCreate {
        building_type: BuildingKind,
        x: i32,
        y: i32,
    },
    ResourceUpdate {
        resources: ResourceAdjustment,
    },
    ResearchTech {
        tech: TechKind,
    },
    Attack {
        unit_ids: Vec<EntityId>,
        target_id: EntityId,
    },
}

/// An intent stamped by the server with its source and arrival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub player_id: PlayerId,
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: GameEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub faction: Option<Faction>,
    pub ready: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_code: String,
    pub players: Vec<PlayerInfo>,
    pub started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartData {
    pub room_code: String,
    pub players: Vec<PlayerInfo>,
    pub map_id: String,
    pub map_seed: u64,
    pub map_size: u32,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Connection {
        client_id: ClientId,
        timestamp: u64,
    },
    RoomJoined {
        room_code: String,
        player_id: PlayerId,
        reconnect_token: String,
    },
    RoomUpdate {
        room: RoomInfo,
    },
    GameStart {
        game_data: GameStartData,
    },
    GameEvent {
        event: Event,
    },
    StateUpdate {
        tick: u64,
        changes: StateChanges,
    },
    Ping {
        timestamp: u64,
    },
    ReconnectSuccess {
        player_id: PlayerId,
        room_code: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
