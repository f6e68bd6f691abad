use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;

use labyrinth_core::player::SessionId;
use labyrinth_core::room::Room;

/// Per-player sender for outbound WebSocket binary frames. Bounded to the
/// configured buffer so a slow client cannot exhaust memory. `Bytes` gives
/// zero-copy cloning when fanning out to multiple players.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Delivers encoded frames to sessions. Delivery is best-effort and
/// fire-and-forget: a recipient whose channel is full or closed is
/// skipped, never surfaced to the caller.
pub struct BroadcastRouter {
    senders: Mutex<HashMap<SessionId, PlayerSender>>,
}

impl Default for BroadcastRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Register a session's outbound channel. Called once per connection,
    /// before any join is processed.
    pub fn register(&self, session_id: SessionId, sender: PlayerSender) {
        self.senders.lock().unwrap().insert(session_id, sender);
    }

    /// Drop a session's outbound channel after disconnect.
    pub fn unregister(&self, session_id: SessionId) {
        self.senders.lock().unwrap().remove(&session_id);
    }

    /// Deliver a frame to exactly one session.
    pub fn send_to_session(&self, session_id: SessionId, data: Bytes) {
        let senders = self.senders.lock().unwrap();
        if let Some(sender) = senders.get(&session_id)
            && let Err(e) = sender.try_send(data)
        {
            tracing::debug!(
                session_id = %session_id, error = %e,
                "Failed to send to session (slow or disconnected)"
            );
        }
    }

    /// Deliver a frame to every current member of `room`, except
    /// `exclude` if given.
    pub fn broadcast_to_room(&self, room: &Room, data: Bytes, exclude: Option<SessionId>) {
        let senders = self.senders.lock().unwrap();
        for session_id in room.session_ids() {
            if Some(session_id) == exclude {
                continue;
            }
            if let Some(sender) = senders.get(&session_id)
                && let Err(e) = sender.try_send(data.clone())
            {
                tracing::debug!(
                    session_id = %session_id, room = room.code(), error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }
}
