use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerUpdate, SessionId};

/// Maximum players per room.
pub const DEFAULT_ROOM_CAPACITY: usize = 4;

/// Room codes longer than this are truncated before use.
pub const MAX_ROOM_CODE_LEN: usize = 12;

/// Normalize a client-supplied room code: trim, lowercase, truncate to
/// [`MAX_ROOM_CODE_LEN`] characters. Returns `None` when nothing is left,
/// which callers treat as a request to ignore.
pub fn normalize_room_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase().chars().take(MAX_ROOM_CODE_LEN).collect())
}

/// The two monotonic world-event sets shared by a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldEventKind {
    Container,
    Obstacle,
}

/// Full room state handed to a newly admitted player: every *other*
/// player plus both event sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub players: HashMap<SessionId, Player>,
    pub opened_containers: Vec<String>,
    pub cleared_obstacles: Vec<String>,
}

/// Outcome of a join attempt.
#[derive(Debug)]
pub enum JoinResult {
    /// Admitted; carries the snapshot to send to the joiner.
    Admitted(RoomSnapshot),
    /// The room already holds its full complement of other sessions.
    Rejected,
    /// The registry removed this room after the caller resolved it.
    /// The caller must re-resolve the code and try again.
    Defunct,
}

/// An ephemeral, in-memory, capacity-bounded group of players sharing
/// positional and world-toggle state. Owned by the registry; all access
/// goes through the room's lock.
#[derive(Debug)]
pub struct Room {
    code: String,
    capacity: usize,
    players: HashMap<SessionId, Player>,
    opened_containers: HashSet<String>,
    cleared_obstacles: HashSet<String>,
    defunct: bool,
}

impl Room {
    pub fn new(code: String, capacity: usize) -> Self {
        Self {
            code,
            capacity,
            players: HashMap::new(),
            opened_containers: HashSet::new(),
            cleared_obstacles: HashSet::new(),
            defunct: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.players.contains_key(&session_id)
    }

    /// Session ids of all current members.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.players.keys().copied().collect()
    }

    /// Admit a session, or reject when the room is full. Rejoining while
    /// already a member is idempotent: the existing player entry is kept
    /// (no duplicate, no capacity double-count) and a fresh snapshot is
    /// returned.
    pub fn join(&mut self, session_id: SessionId, username: &str) -> JoinResult {
        if self.defunct {
            return JoinResult::Defunct;
        }
        if self.players.contains_key(&session_id) {
            return JoinResult::Admitted(self.snapshot_for(session_id));
        }
        if self.players.len() >= self.capacity {
            return JoinResult::Rejected;
        }
        self.players
            .insert(session_id, Player::spawn(session_id, username));
        JoinResult::Admitted(self.snapshot_for(session_id))
    }

    /// Merge a partial update into a member's state and return the merged
    /// player for broadcast. `None` when the session is not a member
    /// (late message after disconnect).
    pub fn update_player(
        &mut self,
        session_id: SessionId,
        update: &PlayerUpdate,
    ) -> Option<Player> {
        let player = self.players.get_mut(&session_id)?;
        player.apply(update);
        Some(player.clone())
    }

    /// Insert a key into the event set for `kind`. Returns whether the
    /// key was newly inserted; repeated calls have no further effect.
    pub fn record_world_event(&mut self, kind: WorldEventKind, key: &str) -> bool {
        let set = match kind {
            WorldEventKind::Container => &mut self.opened_containers,
            WorldEventKind::Obstacle => &mut self.cleared_obstacles,
        };
        set.insert(key.to_string())
    }

    /// Remove a player if present and return the number remaining. The
    /// registry uses the count to decide whether to destroy the room.
    pub fn leave(&mut self, session_id: SessionId) -> usize {
        self.players.remove(&session_id);
        self.players.len()
    }

    /// Snapshot of the room as seen by `session_id`: everyone else plus
    /// both event sets.
    pub fn snapshot_for(&self, session_id: SessionId) -> RoomSnapshot {
        RoomSnapshot {
            players: self
                .players
                .iter()
                .filter(|(id, _)| **id != session_id)
                .map(|(id, p)| (*id, p.clone()))
                .collect(),
            opened_containers: self.opened_containers.iter().cloned().collect(),
            cleared_obstacles: self.cleared_obstacles.iter().cloned().collect(),
        }
    }

    /// Mark this room as removed from the registry. Joins racing with the
    /// removal observe the flag and re-resolve the code.
    pub fn mark_defunct(&mut self) {
        self.defunct = true;
    }

    pub fn is_defunct(&self) -> bool {
        self.defunct
    }
}
