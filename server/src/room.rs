//! A game room: lobby membership, the running world and its replication
//! state.
//!
//! A room moves from lobby to started exactly once. Before start, players
//! join, pick a faction and ready up. After start, intents are queued and
//! resolved on the next tick, and every tick produces at most one
//! `stateUpdate` for the room.

use crate::config::GameConfig;
use crate::connection::{ConnectionHandle, ConnectionRegistry};
use crate::delta::diff;
use crate::error::RoomError;
use crate::player::Player;
use crate::utils::generate_token;
use crate::world::World;
use log::{debug, info};
use rand::Rng;
use shared::{
    ClientId, Event, Faction, GameEventKind, GameStartData, PlayerId, RoomInfo, ServerMessage,
    StateChanges, StateSnapshot,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Minimum number of players needed to start a game.
pub const MIN_PLAYERS: usize = 2;

pub struct Room {
    code: String,
    config: Arc<GameConfig>,
    /// Members in join order, which is also seat order.
    players: Vec<Player>,
    connections: ConnectionRegistry,
    world: Option<World>,
    /// Intents waiting for the next tick, in arrival order.
    pending: VecDeque<Event>,
    /// Last snapshot broadcast to the room.
    baseline: Option<StateSnapshot>,
    /// Smoothed round trip time per player, in milliseconds.
    latency_ms: HashMap<PlayerId, f32>,
    tick: u64,
}

impl Room {
    pub fn new(code: String, config: Arc<GameConfig>) -> Self {
        Self {
            code,
            config,
            players: Vec::new(),
            connections: ConnectionRegistry::new(),
            world: None,
            pending: VecDeque::new(),
            baseline: None,
            latency_ms: HashMap::new(),
            tick: 0,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_started(&self) -> bool {
        self.world.is_some()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn latency(&self, player_id: &str) -> Option<f32> {
        self.latency_ms.get(player_id).copied()
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.code.clone(),
            players: self.players.iter().map(Player::info).collect(),
            started: self.is_started(),
        }
    }

    /// Adds a new member and returns its reconnect token.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        username: Option<String>,
        handle: ConnectionHandle,
    ) -> Result<String, RoomError> {
        if self.player(&player_id).is_some() {
            return Err(RoomError::AlreadyJoined(self.code.clone()));
        }
        if self.is_started() {
            return Err(RoomError::AlreadyStarted);
        }
        if self.players.len() >= self.config.max_players_per_room {
            return Err(RoomError::RoomFull);
        }

        let name = username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Player {}", self.players.len() + 1));
        let token = generate_token();

        self.connections.replace(player_id.clone(), handle);
        self.players
            .push(Player::new(player_id.clone(), name, token.clone()));
        info!("{} joined room {}", player_id, self.code);
        Ok(token)
    }

    /// Removes a member for good. Their entities stay in the world.
    pub fn remove_player(&mut self, player_id: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != player_id);
        self.connections.remove(player_id);
        self.latency_ms.remove(player_id);
        let removed = self.players.len() != before;
        if removed {
            info!("{} left room {}", player_id, self.code);
        }
        removed
    }

    /// Detaches a dropped connection, starting the reconnect grace window.
    ///
    /// Ignored when `client_id` no longer speaks for the player.
    pub fn disconnect(&mut self, player_id: &str, client_id: ClientId, now: Instant) -> bool {
        if !self.connections.remove_if(player_id, client_id) {
            return false;
        }
        if let Some(player) = self.player_mut(player_id) {
            player.mark_disconnected(now);
        }
        info!("{} disconnected from room {}", player_id, self.code);
        true
    }

    /// Removes every player whose grace window has run out.
    pub fn expire_disconnected(&mut self, now: Instant) -> Vec<PlayerId> {
        let grace = self.config.reconnect_grace();
        let expired: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.grace_expired(now, grace))
            .map(|p| p.id.clone())
            .collect();
        for player_id in &expired {
            info!("Reconnect grace for {} in room {} expired", player_id, self.code);
            self.remove_player(player_id);
        }
        expired
    }

    /// Reattaches a member through a new connection.
    ///
    /// The old handle, if any, is replaced in the same registry operation.
    /// A started room sends the full state to the returning player only; the
    /// broadcast baseline is left alone.
    pub fn reconnect(&mut self, player_id: &str, token: &str, handle: ConnectionHandle) -> bool {
        let valid = self
            .player(player_id)
            .map(|p| p.token_matches(token))
            .unwrap_or(false);
        if !valid {
            debug!("Rejected reconnect for {} in room {}", player_id, self.code);
            return false;
        }

        if let Some(player) = self.player_mut(player_id) {
            player.mark_connected();
        }
        self.connections.replace(player_id.to_string(), handle);
        info!("{} reconnected to room {}", player_id, self.code);

        self.connections.send(
            player_id,
            &ServerMessage::ReconnectSuccess {
                player_id: player_id.to_string(),
                room_code: self.code.clone(),
            },
        );
        if let Some(world) = &self.world {
            let changes = StateChanges::full(&world.snapshot());
            self.connections.send(
                player_id,
                &ServerMessage::StateUpdate {
                    tick: self.tick,
                    changes,
                },
            );
        }
        true
    }

    pub fn update_player(
        &mut self,
        player_id: &str,
        faction: Option<Faction>,
        ready: Option<bool>,
    ) -> Result<(), RoomError> {
        if self.is_started() {
            return Err(RoomError::AlreadyStarted);
        }
        let code = self.code.clone();
        let player = self
            .player_mut(player_id)
            .ok_or(RoomError::NotAMember(code))?;
        if let Some(faction) = faction {
            player.faction = Some(faction);
        }
        if let Some(ready) = ready {
            player.ready = ready;
        }
        Ok(())
    }

    /// Builds the world. Succeeds once, with enough players all ready.
    pub fn start(&mut self) -> Result<GameStartData, RoomError> {
        if self.is_started() {
            return Err(RoomError::AlreadyStarted);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers(MIN_PLAYERS));
        }
        let seats: Vec<(PlayerId, Faction)> = self
            .players
            .iter()
            .filter_map(|p| match (p.can_start(), p.faction) {
                (true, Some(faction)) => Some((p.id.clone(), faction)),
                _ => None,
            })
            .collect();
        if seats.len() != self.players.len() {
            return Err(RoomError::NotAllReady);
        }

        let seed = self
            .config
            .map_seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        self.world = Some(World::setup(Arc::clone(&self.config), seed, &seats));
        self.baseline = None;
        self.tick = 0;
        info!(
            "Room {} started with {} players (seed {})",
            self.code,
            seats.len(),
            seed
        );

        Ok(GameStartData {
            room_code: self.code.clone(),
            players: self.players.iter().map(Player::info).collect(),
            map_id: format!("map-{:016x}", seed),
            map_seed: seed,
            map_size: self.config.map_size,
        })
    }

    /// Stamps an intent with its sender and queues it for the next tick.
    pub fn enqueue_event(
        &mut self,
        player_id: &str,
        kind: GameEventKind,
        timestamp: u64,
    ) -> Result<(), RoomError> {
        if self.player(player_id).is_none() {
            return Err(RoomError::NotAMember(self.code.clone()));
        }
        if !self.is_started() {
            return Err(RoomError::NotStarted);
        }
        self.pending.push_back(Event {
            player_id: player_id.to_string(),
            timestamp,
            kind,
        });
        Ok(())
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Resolves queued intents in arrival order, then advances the world.
    /// Returns the accepted events.
    pub fn advance(&mut self, dt: f32) -> Vec<Event> {
        let Some(world) = self.world.as_mut() else {
            return Vec::new();
        };

        let mut accepted = Vec::with_capacity(self.pending.len());
        while let Some(event) = self.pending.pop_front() {
            match world.apply_event(&event) {
                Ok(()) => accepted.push(event),
                Err(reason) => debug!(
                    "Rejected {:?} from {} in room {}: {}",
                    event.kind, event.player_id, self.code, reason
                ),
            }
        }

        world.advance(dt);
        self.tick += 1;
        accepted
    }

    /// Changes since the last call, or the full state on the first call.
    /// `None` when nothing changed.
    pub fn compute_delta(&mut self) -> Option<StateChanges> {
        let snapshot = self.world.as_ref()?.snapshot();
        let changes = match &self.baseline {
            None => StateChanges::full(&snapshot),
            Some(previous) => diff(previous, &snapshot),
        };
        self.baseline = Some(snapshot);

        if changes.is_empty() {
            None
        } else {
            Some(changes)
        }
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        self.connections.broadcast(message);
    }

    pub fn send_to(&self, player_id: &str, message: &ServerMessage) -> bool {
        self.connections.send(player_id, message)
    }

    pub fn send_pings(&self, timestamp: u64) {
        self.connections.broadcast(&ServerMessage::Ping { timestamp });
    }

    /// Folds a pong into the player's smoothed round trip time.
    pub fn record_pong(&mut self, player_id: &str, timestamp: u64, now_ms: u64) {
        if self.player(player_id).is_none() {
            return;
        }
        let sample = now_ms.saturating_sub(timestamp) as f32;
        let alpha = self.config.latency_alpha.clamp(0.0, 1.0);
        let smoothed = match self.latency_ms.get(player_id) {
            Some(previous) => alpha * sample + (1.0 - alpha) * previous,
            None => sample,
        };
        self.latency_ms.insert(player_id.to_string(), smoothed);
        debug!(
            "RTT for {} in room {}: {:.1} ms (sample {:.0} ms)",
            player_id, self.code, smoothed, sample
        );
    }
}
