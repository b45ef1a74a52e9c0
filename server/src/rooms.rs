//! Registry of live rooms, owned by the dispatcher and lent to the tick
//! scheduler.

use crate::config::GameConfig;
use crate::room::Room;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    config: Arc<GameConfig>,
}

impl RoomRegistry {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Returns the room for `code`, creating an empty lobby if needed.
    pub fn get_or_create(&mut self, code: &str) -> &mut Room {
        let config = &self.config;
        self.rooms.entry(code.to_string()).or_insert_with(|| {
            info!("Room {} created", code);
            Room::new(code.to_string(), Arc::clone(config))
        })
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Drops the room once its last member is gone.
    pub fn remove_if_empty(&mut self, code: &str) -> bool {
        let empty = self.rooms.get(code).map(Room::is_empty).unwrap_or(false);
        if empty {
            self.rooms.remove(code);
            info!("Room {} closed", code);
        }
        empty
    }

    /// Drops every room without members. Returns how many were closed.
    pub fn close_empty(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|code, room| {
            if room.is_empty() {
                info!("Room {} closed", code);
            }
            !room.is_empty()
        });
        before - self.rooms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
