use std::sync::Arc;

use bytes::Bytes;

use labyrinth_core::net::messages::{
    PlayerJoinedMsg, PlayerLeftMsg, RemoteUpdateMsg, RoomFullMsg, RoomStateMsg, ServerMessage,
    WorldEventMsg,
};
use labyrinth_core::net::protocol::encode_server_message;
use labyrinth_core::player::{PlayerUpdate, SessionId, sanitize_username};
use labyrinth_core::room::{JoinResult, WorldEventKind, normalize_room_code};

use crate::broadcast::BroadcastRouter;
use crate::registry::RoomRegistry;

/// A room resolved through the registry can be torn down before the join
/// acquires its lock; one re-resolution is enough, but allow a second.
const JOIN_RETRIES: usize = 2;

#[derive(Debug)]
enum SessionState {
    Unjoined,
    Joined { room_code: String },
    Closed,
}

/// State machine for one physical connection. Inbound events arrive from
/// the socket read loop; outbound frames leave through the router. All
/// methods are synchronous: room access never blocks on I/O.
pub struct Session {
    id: SessionId,
    state: SessionState,
    registry: Arc<RoomRegistry>,
    router: Arc<BroadcastRouter>,
}

impl Session {
    pub fn new(registry: Arc<RoomRegistry>, router: Arc<BroadcastRouter>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            state: SessionState::Unjoined,
            registry,
            router,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.state, SessionState::Joined { .. })
    }

    /// Handle a join request. An empty (post-normalization) room code is
    /// silently ignored; a full room gets a room-full notice sent to this
    /// session only; admission sends the snapshot here and announces the
    /// newcomer to the rest of the room.
    pub fn on_join_request(&mut self, raw_code: &str, username: &str) {
        if !matches!(self.state, SessionState::Unjoined) {
            tracing::debug!(session_id = %self.id, "Join ignored (already joined or closed)");
            return;
        }
        let Some(code) = normalize_room_code(raw_code) else {
            tracing::debug!(session_id = %self.id, "Join with empty room code ignored");
            return;
        };

        for _ in 0..JOIN_RETRIES {
            let room = self.registry.get_or_create(&code);
            let result = room.lock().unwrap().join(self.id, username);
            match result {
                JoinResult::Admitted(snapshot) => {
                    self.state = SessionState::Joined {
                        room_code: code.clone(),
                    };
                    tracing::info!(session_id = %self.id, room = %code, "Player joined room");

                    let state_msg = ServerMessage::RoomState(RoomStateMsg {
                        self_id: self.id,
                        players: snapshot.players,
                        opened_containers: snapshot.opened_containers,
                        cleared_obstacles: snapshot.cleared_obstacles,
                    });
                    self.send_to_self(&state_msg);

                    let announce = ServerMessage::PlayerJoined(PlayerJoinedMsg {
                        session_id: self.id,
                        username: sanitize_username(username),
                    });
                    if let Ok(data) = encode_server_message(&announce) {
                        let guard = room.lock().unwrap();
                        self.router
                            .broadcast_to_room(&guard, Bytes::from(data), Some(self.id));
                    }
                    return;
                },
                JoinResult::Rejected => {
                    tracing::info!(session_id = %self.id, room = %code, "Join rejected, room full");
                    self.send_to_self(&ServerMessage::RoomFull(RoomFullMsg {}));
                    return;
                },
                JoinResult::Defunct => continue,
            }
        }
        tracing::warn!(session_id = %self.id, room = %code, "Join kept racing room teardown, giving up");
    }

    /// Merge a partial update into this session's player and broadcast the
    /// merged state to the rest of the room. Silent no-op while not joined
    /// or when the room no longer holds this session.
    pub fn on_player_update(&mut self, update: &PlayerUpdate) {
        if !self.is_joined() {
            return;
        }
        let Some((_, room)) = self.registry.find_room_of(self.id) else {
            return;
        };
        let mut guard = room.lock().unwrap();
        let Some(merged) = guard.update_player(self.id, update) else {
            return;
        };
        let msg = ServerMessage::RemoteUpdate(RemoteUpdateMsg::from_player(&merged));
        if let Ok(data) = encode_server_message(&msg) {
            self.router
                .broadcast_to_room(&guard, Bytes::from(data), Some(self.id));
        }
    }

    /// Record a world event and rebroadcast it to the rest of the room.
    /// Redundant events (key already recorded) are still rebroadcast; the
    /// client-side effect is idempotent.
    pub fn on_world_event(&mut self, kind: WorldEventKind, key: &str) {
        if !self.is_joined() {
            return;
        }
        let Some((code, room)) = self.registry.find_room_of(self.id) else {
            return;
        };
        let mut guard = room.lock().unwrap();
        if !guard.record_world_event(kind, key) {
            tracing::debug!(room = %code, key, "Duplicate world event rebroadcast");
        }
        let msg = ServerMessage::WorldEvent(WorldEventMsg {
            kind,
            key: key.to_string(),
        });
        if let Ok(data) = encode_server_message(&msg) {
            self.router
                .broadcast_to_room(&guard, Bytes::from(data), Some(self.id));
        }
    }

    /// Terminal cleanup: leave the room, announce the departure to the
    /// remaining members, and destroy the room if it emptied. Safe to call
    /// more than once; every path after the first is a no-op.
    pub fn on_disconnect(&mut self) {
        let prev = std::mem::replace(&mut self.state, SessionState::Closed);
        if !matches!(prev, SessionState::Joined { .. }) {
            return;
        }
        let Some((code, room)) = self.registry.find_room_of(self.id) else {
            return;
        };
        let remaining = {
            let mut guard = room.lock().unwrap();
            let remaining = guard.leave(self.id);
            if let Ok(data) = encode_server_message(&ServerMessage::PlayerLeft(PlayerLeftMsg {
                session_id: self.id,
            })) {
                self.router.broadcast_to_room(&guard, Bytes::from(data), None);
            }
            remaining
        };
        tracing::info!(session_id = %self.id, room = %code, remaining, "Player left room");
        if remaining == 0 {
            self.registry.remove_if_empty(&code);
        }
    }

    fn send_to_self(&self, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.router.send_to_session(self.id, Bytes::from(data)),
            Err(e) => tracing::warn!(session_id = %self.id, error = %e, "Failed to encode message"),
        }
    }
}
