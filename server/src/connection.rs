//! Connection handles and the per-room connection registry.
//!
//! Each room tracks which live connection currently speaks for each of its
//! players. A reconnect swaps the handle in place, and removal checks the
//! client id so a stale socket cannot evict a fresh one.
//!
//! Sending never blocks. A handle whose socket task has already exited simply
//! drops the frame.

use log::{debug, warn};
use shared::{ClientId, PlayerId, ServerMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Write side of one client connection.
///
/// The transport-assigned client id tells connections apart, and the
/// unbounded sender feeds the socket writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Unique client identifier assigned on accept.
    pub client_id: ClientId,
    /// Serialized frames waiting to be written to the socket.
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(client_id: ClientId, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { client_id, tx }
    }

    /// Queues an already serialized frame.
    ///
    /// Returns false if the socket task has gone away.
    pub fn send_text(&self, text: String) -> bool {
        self.tx.send(text).is_ok()
    }

    /// Serializes and queues a message.
    pub fn send(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(text),
            Err(e) => {
                warn!("Failed to serialize message for client {}: {}", self.client_id, e);
                false
            }
        }
    }
}

/// Maps players to the connection currently speaking for them.
///
/// The registry is owned by a single room and only mutated from the server
/// loop. `replace` swaps a handle in one operation, so no frame for a player
/// can be routed to both the old and the new connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Live handles indexed by player id.
    handles: HashMap<PlayerId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle for a player without one.
    ///
    /// Returns false and keeps the existing handle if the player is already
    /// connected.
    pub fn insert(&mut self, player_id: PlayerId, handle: ConnectionHandle) -> bool {
        if self.handles.contains_key(&player_id) {
            return false;
        }
        self.handles.insert(player_id, handle);
        true
    }

    /// Installs a new handle for a player, returning the one it displaced.
    pub fn replace(&mut self, player_id: PlayerId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let previous = self.handles.insert(player_id.clone(), handle);
        if let Some(old) = &previous {
            debug!("Replaced connection {} for {}", old.client_id, player_id);
        }
        previous
    }

    /// Removes a player's handle only if it still belongs to `client_id`.
    ///
    /// A disconnect notification from a connection that was already replaced
    /// by a reconnect is ignored.
    pub fn remove_if(&mut self, player_id: &str, client_id: ClientId) -> bool {
        match self.handles.get(player_id) {
            Some(handle) if handle.client_id == client_id => {
                self.handles.remove(player_id);
                true
            }
            _ => false,
        }
    }

    /// Removes a player's handle unconditionally.
    pub fn remove(&mut self, player_id: &str) -> Option<ConnectionHandle> {
        self.handles.remove(player_id)
    }

    pub fn get(&self, player_id: &str) -> Option<&ConnectionHandle> {
        self.handles.get(player_id)
    }

    pub fn is_connected(&self, player_id: &str) -> bool {
        self.handles.contains_key(player_id)
    }

    /// Sends a message to one player, if connected.
    pub fn send(&self, player_id: &str, message: &ServerMessage) -> bool {
        self.handles
            .get(player_id)
            .map(|handle| handle.send(message))
            .unwrap_or(false)
    }

    /// Sends a message to every connected player.
    ///
    /// The message is serialized once and the same frame is queued for every
    /// handle.
    pub fn broadcast(&self, message: &ServerMessage) {
        if self.handles.is_empty() {
            return;
        }
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize broadcast: {}", e);
                return;
            }
        };
        for (player_id, handle) in &self.handles {
            if !handle.send_text(text.clone()) {
                debug!("Dropped frame for {}: connection closed", player_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
