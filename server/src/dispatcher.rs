//! Routing of decoded client messages to rooms.
//!
//! The dispatcher owns the room registry and one session per live
//! connection. It is driven entirely from the server loop: connection
//! lifecycle events, inbound frames and periodic sweeps all arrive as plain
//! method calls, which keeps it testable without sockets.

use crate::config::GameConfig;
use crate::connection::ConnectionHandle;
use crate::error::RoomError;
use crate::room::Room;
use crate::rooms::RoomRegistry;
use crate::utils::{get_timestamp, player_id_for};
use crate::validate::decode_client_message;
use log::{debug, info, warn};
use shared::{ClientId, ClientMessage, PlayerId, ServerMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Per-connection routing state.
struct ClientSession {
    handle: ConnectionHandle,
    /// Room code to the player this connection speaks for in that room.
    memberships: HashMap<String, PlayerId>,
}

pub struct Dispatcher {
    config: Arc<GameConfig>,
    rooms: RoomRegistry,
    clients: HashMap<ClientId, ClientSession>,
}

impl Dispatcher {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            rooms: RoomRegistry::new(Arc::clone(&config)),
            config,
            clients: HashMap::new(),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn rooms_mut(&mut self) -> &mut RoomRegistry {
        &mut self.rooms
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Registers a fresh connection and greets it.
    pub fn connect(&mut self, client_id: ClientId, tx: mpsc::UnboundedSender<String>) {
        let handle = ConnectionHandle::new(client_id, tx);
        handle.send(&ServerMessage::Connection {
            client_id,
            timestamp: get_timestamp(),
        });
        self.clients.insert(
            client_id,
            ClientSession {
                handle,
                memberships: HashMap::new(),
            },
        );
        info!("Client {} connected", client_id);
    }

    /// Drops a connection. Every room it belonged to keeps the seat for the
    /// reconnect grace window.
    pub fn disconnect(&mut self, client_id: ClientId, now: Instant) {
        let Some(session) = self.clients.remove(&client_id) else {
            return;
        };
        for (code, player_id) in session.memberships {
            if let Some(room) = self.rooms.get_mut(&code) {
                if room.disconnect(&player_id, client_id, now) {
                    broadcast_room_update(room);
                }
            }
        }
        info!("Client {} disconnected", client_id);
    }

    /// Decodes, validates and routes one text frame. Failures are answered
    /// with an `error` frame to the sender only.
    pub fn handle_text(&mut self, client_id: ClientId, text: &str) {
        let Some(session) = self.clients.get(&client_id) else {
            warn!("Frame from unknown client {}", client_id);
            return;
        };

        let message = match decode_client_message(text, self.config.map_size) {
            Ok(message) => message,
            Err(e) => {
                warn!("Rejected frame from client {}: {}", client_id, e);
                session.handle.send(&ServerMessage::error(e.to_string()));
                return;
            }
        };

        if let Err(e) = self.route(client_id, message) {
            debug!("Request from client {} failed: {}", client_id, e);
            self.send_to_client(client_id, &ServerMessage::error(e.to_string()));
        }
    }

    fn send_to_client(&self, client_id: ClientId, message: &ServerMessage) {
        if let Some(session) = self.clients.get(&client_id) {
            session.handle.send(message);
        }
    }

    fn membership(&self, client_id: ClientId, code: &str) -> Result<PlayerId, RoomError> {
        self.clients
            .get(&client_id)
            .and_then(|session| session.memberships.get(code))
            .cloned()
            .ok_or_else(|| RoomError::NotAMember(code.to_string()))
    }

    fn room_mut(&mut self, code: &str) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::UnknownRoom(code.to_string()))
    }

    fn route(&mut self, client_id: ClientId, message: ClientMessage) -> Result<(), RoomError> {
        match message {
            ClientMessage::JoinRoom {
                room_code,
                username,
            } => self.join_room(client_id, room_code, username),
            ClientMessage::LeaveRoom { room_code } => {
                let player_id = self.membership(client_id, &room_code)?;
                if let Some(session) = self.clients.get_mut(&client_id) {
                    session.memberships.remove(&room_code);
                }
                let room = self.room_mut(&room_code)?;
                room.remove_player(&player_id);
                broadcast_room_update(room);
                self.rooms.remove_if_empty(&room_code);
                Ok(())
            }
            ClientMessage::UpdatePlayer {
                room_code,
                faction,
                ready,
            } => {
                let player_id = self.membership(client_id, &room_code)?;
                let room = self.room_mut(&room_code)?;
                room.update_player(&player_id, faction, ready)?;
                broadcast_room_update(room);
                Ok(())
            }
            ClientMessage::StartGame { room_code } => {
                self.membership(client_id, &room_code)?;
                let room = self.room_mut(&room_code)?;
                let game_data = room.start()?;
                room.broadcast(&ServerMessage::GameStart { game_data });
                broadcast_room_update(room);
                Ok(())
            }
            ClientMessage::GameEvent { room_code, event } => {
                let player_id = self.membership(client_id, &room_code)?;
                self.room_mut(&room_code)?
                    .enqueue_event(&player_id, event, get_timestamp())
            }
            ClientMessage::Pong {
                room_code,
                timestamp,
            } => {
                let player_id = self.membership(client_id, &room_code)?;
                self.room_mut(&room_code)?
                    .record_pong(&player_id, timestamp, get_timestamp());
                Ok(())
            }
            ClientMessage::Reconnect {
                room_code,
                player_id,
                reconnect_token,
            } => self.reconnect(client_id, room_code, player_id, reconnect_token),
        }
    }

    fn join_room(
        &mut self,
        client_id: ClientId,
        room_code: String,
        username: Option<String>,
    ) -> Result<(), RoomError> {
        let session = self
            .clients
            .get(&client_id)
            .ok_or_else(|| RoomError::NotAMember(room_code.clone()))?;
        if session.memberships.contains_key(&room_code) {
            return Err(RoomError::AlreadyJoined(room_code));
        }
        let handle = session.handle.clone();
        let player_id = player_id_for(client_id);

        let room = self.rooms.get_or_create(&room_code);
        let token = match room.add_player(player_id.clone(), username, handle) {
            Ok(token) => token,
            Err(e) => {
                self.rooms.remove_if_empty(&room_code);
                return Err(e);
            }
        };
        room.send_to(
            &player_id,
            &ServerMessage::RoomJoined {
                room_code: room_code.clone(),
                player_id: player_id.clone(),
                reconnect_token: token,
            },
        );
        broadcast_room_update(room);

        if let Some(session) = self.clients.get_mut(&client_id) {
            session.memberships.insert(room_code, player_id);
        }
        Ok(())
    }

    fn reconnect(
        &mut self,
        client_id: ClientId,
        room_code: String,
        player_id: PlayerId,
        token: String,
    ) -> Result<(), RoomError> {
        let handle = self
            .clients
            .get(&client_id)
            .map(|session| session.handle.clone())
            .ok_or(RoomError::ReconnectRejected)?;
        let room = self.room_mut(&room_code)?;
        if !room.reconnect(&player_id, &token, handle) {
            return Err(RoomError::ReconnectRejected);
        }
        broadcast_room_update(room);

        // The seat now belongs to this connection only.
        for (id, session) in self.clients.iter_mut() {
            if *id == client_id {
                session.memberships.insert(room_code.clone(), player_id.clone());
            } else if session.memberships.get(&room_code) == Some(&player_id) {
                session.memberships.remove(&room_code);
            }
        }
        Ok(())
    }

    /// Removes players whose reconnect grace ran out and closes rooms left
    /// without members.
    pub fn sweep(&mut self, now: Instant) {
        for room in self.rooms.iter_mut() {
            if !room.expire_disconnected(now).is_empty() {
                broadcast_room_update(room);
            }
        }
        self.rooms.close_empty();
    }

    /// Sends a `ping` to every connected player of every room.
    pub fn send_pings(&self, timestamp: u64) {
        for room in self.rooms.iter() {
            room.send_pings(timestamp);
        }
    }
}

fn broadcast_room_update(room: &Room) {
    room.broadcast(&ServerMessage::RoomUpdate { room: room.info() });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> Dispatcher {
        let mut config = GameConfig::default();
        config.map_seed = Some(77);
        Dispatcher::new(Arc::new(config))
    }

    fn client(
        dispatcher: &mut Dispatcher,
        client_id: ClientId,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        dispatcher.connect(client_id, tx);
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(text) = rx.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    fn last_error(messages: &[ServerMessage]) -> Option<String> {
        messages.iter().rev().find_map(|m| match m {
            ServerMessage::Error { message } => Some(message.clone()),
            _ => None,
        })
    }

    #[test]
    fn test_connect_greets_client() {
        let mut dispatcher = dispatcher();
        let mut rx = client(&mut dispatcher, 3);
        match &drain(&mut rx)[0] {
            ServerMessage::Connection { client_id, .. } => assert_eq!(*client_id, 3),
            other => panic!("expected connection, got {:?}", other),
        }
        assert_eq!(dispatcher.client_count(), 1);
    }

    #[test]
    fn test_join_sends_token_and_room_update() {
        let mut dispatcher = dispatcher();
        let mut rx = client(&mut dispatcher, 1);
        drain(&mut rx);

        dispatcher.handle_text(1, r#"{"type":"joinRoom","roomCode":"AB12CD","username":"Ada"}"#);

        let messages = drain(&mut rx);
        match &messages[0] {
            ServerMessage::RoomJoined {
                player_id,
                reconnect_token,
                ..
            } => {
                assert_eq!(player_id, "player-1");
                assert_eq!(reconnect_token.len(), 64);
            }
            other => panic!("expected roomJoined, got {:?}", other),
        }
        match &messages[1] {
            ServerMessage::RoomUpdate { room } => {
                assert_eq!(room.players[0].name, "Ada");
                assert!(!room.started);
            }
            other => panic!("expected roomUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_frames_get_error_and_touch_nothing() {
        let mut dispatcher = dispatcher();
        let mut rx = client(&mut dispatcher, 1);
        drain(&mut rx);

        dispatcher.handle_text(1, "garbage");
        dispatcher.handle_text(1, r#"{"type":"joinRoom","roomCode":"X"}"#);

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 2);
        assert!(messages
            .iter()
            .all(|m| matches!(m, ServerMessage::Error { .. })));
        assert!(dispatcher.rooms().is_empty());
    }

    #[test]
    fn test_requests_for_foreign_rooms_fail() {
        let mut dispatcher = dispatcher();
        let mut rx = client(&mut dispatcher, 1);
        drain(&mut rx);

        dispatcher.handle_text(1, r#"{"type":"startGame","roomCode":"AB12CD"}"#);
        assert_eq!(
            last_error(&drain(&mut rx)).as_deref(),
            Some("you are not a member of room AB12CD")
        );
    }

    #[test]
    fn test_start_refused_until_ready() {
        let mut dispatcher = dispatcher();
        let mut rx1 = client(&mut dispatcher, 1);
        let _rx2 = client(&mut dispatcher, 2);
        dispatcher.handle_text(1, r#"{"type":"joinRoom","roomCode":"AB12CD"}"#);
        dispatcher.handle_text(2, r#"{"type":"joinRoom","roomCode":"AB12CD"}"#);
        drain(&mut rx1);

        dispatcher.handle_text(1, r#"{"type":"startGame","roomCode":"AB12CD"}"#);
        assert_eq!(
            last_error(&drain(&mut rx1)).as_deref(),
            Some("cannot start: not all players are ready")
        );
        assert!(!dispatcher.rooms().get("AB12CD").unwrap().is_started());
    }

    #[test]
    fn test_leave_closes_empty_room() {
        let mut dispatcher = dispatcher();
        let _rx = client(&mut dispatcher, 1);
        dispatcher.handle_text(1, r#"{"type":"joinRoom","roomCode":"AB12CD"}"#);
        assert_eq!(dispatcher.rooms().len(), 1);

        dispatcher.handle_text(1, r#"{"type":"leaveRoom","roomCode":"AB12CD"}"#);
        assert!(dispatcher.rooms().is_empty());
    }

    #[test]
    fn test_failed_join_does_not_leave_empty_room() {
        let mut config = GameConfig::default();
        config.max_players_per_room = 0;
        let mut dispatcher = Dispatcher::new(Arc::new(config));
        let mut rx = client(&mut dispatcher, 1);

        dispatcher.handle_text(1, r#"{"type":"joinRoom","roomCode":"AB12CD"}"#);

        assert_eq!(last_error(&drain(&mut rx)).as_deref(), Some("room is full"));
        assert!(dispatcher.rooms().is_empty());
    }

    #[test]
    fn test_disconnect_keeps_seat_until_sweep_expires_it() {
        let mut config = GameConfig::default();
        config.reconnect_grace_secs = 0;
        let mut dispatcher = Dispatcher::new(Arc::new(config));
        let _rx = client(&mut dispatcher, 1);
        dispatcher.handle_text(1, r#"{"type":"joinRoom","roomCode":"AB12CD"}"#);

        let now = Instant::now();
        dispatcher.disconnect(1, now);
        let room = dispatcher.rooms().get("AB12CD").unwrap();
        assert!(!room.player("player-1").unwrap().connected);

        dispatcher.sweep(now);
        assert!(dispatcher.rooms().is_empty());
    }
}
