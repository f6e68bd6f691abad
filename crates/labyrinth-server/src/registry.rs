use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use labyrinth_core::player::SessionId;
use labyrinth_core::room::Room;

/// A room shared between connection tasks. All room state is guarded by
/// the inner lock; lock ordering is always registry map first, then room.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Process-wide table mapping room code to room. Rooms are created lazily
/// on first join and destroyed the moment the last player leaves. Nothing
/// here survives a restart.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, SharedRoom>>,
    capacity: usize,
}

impl RoomRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Return the room for `code`, creating an empty one if absent.
    pub fn get_or_create(&self, code: &str) -> SharedRoom {
        if let Some(room) = self.rooms.read().unwrap().get(code) {
            return Arc::clone(room);
        }
        let mut rooms = self.rooms.write().unwrap();
        let room = rooms.entry(code.to_string()).or_insert_with(|| {
            tracing::info!(room = code, "Room created");
            Arc::new(Mutex::new(Room::new(code.to_string(), self.capacity)))
        });
        Arc::clone(room)
    }

    /// Remove the room entry if and only if it currently has zero players.
    /// The room is marked defunct under the registry write lock, so a join
    /// that raced the removal observes the stale handle and re-resolves.
    /// Returns whether the room was removed.
    pub fn remove_if_empty(&self, code: &str) -> bool {
        let mut rooms = self.rooms.write().unwrap();
        let Some(room) = rooms.get(code) else {
            return false;
        };
        {
            let mut guard = room.lock().unwrap();
            if !guard.is_empty() {
                return false;
            }
            guard.mark_defunct();
        }
        rooms.remove(code);
        tracing::info!(room = code, "Room destroyed");
        true
    }

    /// Locate the room currently containing `session_id`. O(rooms) scan;
    /// room counts are small and membership has a single source of truth
    /// (a session is in at most one room).
    pub fn find_room_of(&self, session_id: SessionId) -> Option<(String, SharedRoom)> {
        let rooms = self.rooms.read().unwrap();
        for (code, room) in rooms.iter() {
            if room.lock().unwrap().contains(session_id) {
                return Some((code.clone(), Arc::clone(room)));
            }
        }
        None
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap().len()
    }

    /// Total players across all rooms.
    pub fn total_players(&self) -> usize {
        self.rooms
            .read()
            .unwrap()
            .values()
            .map(|room| room.lock().unwrap().player_count())
            .sum()
    }

    #[cfg(test)]
    pub fn contains(&self, code: &str) -> bool {
        self.rooms.read().unwrap().contains_key(code)
    }
}
