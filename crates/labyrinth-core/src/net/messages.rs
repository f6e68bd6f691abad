use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::player::{Direction, Player, PlayerUpdate, SessionId};
use crate::room::WorldEventKind;

/// Network message type discriminator (1-byte wire prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    JoinRoom = 0x01,
    PlayerUpdate = 0x02,

    // Both directions: recorded by the server, rebroadcast to the room
    WorldEvent = 0x03,

    // Server -> Client
    RoomFull = 0x10,
    RoomState = 0x11,
    PlayerJoined = 0x12,
    RemoteUpdate = 0x13,
    PlayerLeft = 0x14,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::JoinRoom),
            0x02 => Some(Self::PlayerUpdate),
            0x03 => Some(Self::WorldEvent),
            0x10 => Some(Self::RoomFull),
            0x11 => Some(Self::RoomState),
            0x12 => Some(Self::PlayerJoined),
            0x13 => Some(Self::RemoteUpdate),
            0x14 => Some(Self::PlayerLeft),
            _ => None,
        }
    }
}

/// Join request: client-supplied room code and display name. Both are
/// normalized server-side before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room: String,
    pub username: String,
}

/// A world-state toggle, flowing in from the acting client and back out
/// to the rest of the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEventMsg {
    #[serde(rename = "type")]
    pub kind: WorldEventKind,
    pub key: String,
}

/// Room-full notice, sent to the rejected joiner only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomFullMsg {}

/// Snapshot sent to a newly joined session. `players` excludes the
/// joiner itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStateMsg {
    pub self_id: SessionId,
    pub players: HashMap<SessionId, Player>,
    pub opened_containers: Vec<String>,
    pub cleared_obstacles: Vec<String>,
}

/// Announcement of a newcomer, broadcast to everyone but the joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub session_id: SessionId,
    pub username: String,
}

/// Merged player state after an update, broadcast to everyone but the
/// sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUpdateMsg {
    pub session_id: SessionId,
    pub x: f64,
    pub y: f64,
    pub dir: Direction,
    pub frame: u32,
    pub has_sword: bool,
}

impl RemoteUpdateMsg {
    pub fn from_player(player: &Player) -> Self {
        Self {
            session_id: player.session_id,
            x: player.x,
            y: player.y,
            dir: player.dir,
            frame: player.frame,
            has_sword: player.has_sword,
        }
    }
}

/// Departure notice, broadcast to the remaining room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeftMsg {
    pub session_id: SessionId,
}

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    JoinRoom(JoinRoomMsg),
    PlayerUpdate(PlayerUpdate),
    WorldEvent(WorldEventMsg),
}

/// Messages the server sends.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    RoomFull(RoomFullMsg),
    RoomState(RoomStateMsg),
    PlayerJoined(PlayerJoinedMsg),
    RemoteUpdate(RemoteUpdateMsg),
    WorldEvent(WorldEventMsg),
    PlayerLeft(PlayerLeftMsg),
}
