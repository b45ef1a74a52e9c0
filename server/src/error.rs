//! Error types for the room server.
//!
//! Only [`ProtocolError`] and [`RoomError`] ever reach a client, as the
//! `message` of an `error` frame. [`EventRejection`] is logged and dropped:
//! clients reconcile from the next state update.

use shared::EntityId;
use thiserror::Error;

/// A frame that failed decoding or validation. Reported to the sender only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unsupported frame")]
    UnsupportedFrame,
}

impl ProtocolError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProtocolError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Room management failures surfaced to the requesting client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0} does not exist")]
    UnknownRoom(String),
    #[error("room is full")]
    RoomFull,
    #[error("game already started")]
    AlreadyStarted,
    #[error("game has not started")]
    NotStarted,
    #[error("cannot start: need at least {0} players")]
    NotEnoughPlayers(usize),
    #[error("cannot start: not all players are ready")]
    NotAllReady,
    #[error("you are not a member of room {0}")]
    NotAMember(String),
    #[error("you are already in room {0}")]
    AlreadyJoined(String),
    #[error("reconnect rejected")]
    ReconnectRejected,
}

/// Why the world refused an intent. Never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventRejection {
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("tile ({0}, {1}) is out of bounds")]
    OutOfBounds(i32, i32),
    #[error("tile ({0}, {1}) is not walkable")]
    Unwalkable(i32, i32),
    #[error("tile ({0}, {1}) holds a resource node")]
    ResourceInTheWay(i32, i32),
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("entity {0} is not owned by the sender")]
    NotOwner(EntityId),
    #[error("cannot target own entity {0}")]
    FriendlyTarget(EntityId),
    #[error("building {0} cannot train that unit")]
    CannotTrain(EntityId),
    #[error("production queue of building {0} is full")]
    QueueFull(EntityId),
    #[error("no spawn location given")]
    NoSpawnLocation,
    #[error("no unit could accept the order")]
    NoEligibleUnits,
    #[error("technology already researched")]
    AlreadyResearched,
}

/// Fatal start-up failures of the server binary.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
