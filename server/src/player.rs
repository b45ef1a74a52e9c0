use shared::{Faction, PlayerId, PlayerInfo};
use std::time::{Duration, Instant};

/// Room membership of one participant.
///
/// A player outlives its connection: after a disconnect the seat is kept for
/// the reconnect grace window and can be reclaimed with `reconnect_token`.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub faction: Option<Faction>,
    pub ready: bool,
    pub connected: bool,
    reconnect_token: String,
    disconnected_at: Option<Instant>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, reconnect_token: String) -> Self {
        Self {
            id,
            name,
            faction: None,
            ready: false,
            connected: true,
            reconnect_token,
            disconnected_at: None,
        }
    }

    pub fn reconnect_token(&self) -> &str {
        &self.reconnect_token
    }

    pub fn token_matches(&self, token: &str) -> bool {
        !token.is_empty() && self.reconnect_token == token
    }

    pub fn mark_disconnected(&mut self, now: Instant) {
        self.connected = false;
        self.disconnected_at = Some(now);
    }

    pub fn mark_connected(&mut self) {
        self.connected = true;
        self.disconnected_at = None;
    }

    /// True once a disconnected player has been gone for longer than `grace`.
    pub fn grace_expired(&self, now: Instant, grace: Duration) -> bool {
        self.disconnected_at
            .map(|since| now.saturating_duration_since(since) >= grace)
            .unwrap_or(false)
    }

    /// Ready with a faction picked.
    pub fn can_start(&self) -> bool {
        self.ready && self.faction.is_some()
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            faction: self.faction,
            ready: self.ready,
            connected: self.connected,
        }
    }
}
