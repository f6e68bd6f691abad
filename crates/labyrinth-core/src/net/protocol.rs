use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, JoinRoomMsg, MessageType, PlayerJoinedMsg, PlayerLeftMsg, RemoteUpdateMsg,
    RoomFullMsg, RoomStateMsg, ServerMessage, WorldEventMsg,
};
use crate::player::PlayerUpdate;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
    /// A type byte valid on the wire but not in this direction.
    WrongDirection(MessageType),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
            Self::WrongDirection(t) => write!(f, "message type not valid here: {t:?}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::PlayerUpdate(m) => encode_message(MessageType::PlayerUpdate, m),
        ClientMessage::WorldEvent(m) => encode_message(MessageType::WorldEvent, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::RoomFull(m) => encode_message(MessageType::RoomFull, m),
        ServerMessage::RoomState(m) => encode_message(MessageType::RoomState, m),
        ServerMessage::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerMessage::RemoteUpdate(m) => encode_message(MessageType::RemoteUpdate, m),
        ServerMessage::WorldEvent(m) => encode_message(MessageType::WorldEvent, m),
        ServerMessage::PlayerLeft(m) => encode_message(MessageType::PlayerLeft, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::PlayerUpdate => Ok(ClientMessage::PlayerUpdate(
            decode_payload::<PlayerUpdate>(data)?,
        )),
        MessageType::WorldEvent => Ok(ClientMessage::WorldEvent(
            decode_payload::<WorldEventMsg>(data)?,
        )),
        other => Err(ProtocolError::WrongDirection(other)),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::RoomFull => Ok(ServerMessage::RoomFull(decode_payload::<RoomFullMsg>(
            data,
        )?)),
        MessageType::RoomState => Ok(ServerMessage::RoomState(decode_payload::<RoomStateMsg>(
            data,
        )?)),
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(
            decode_payload::<PlayerJoinedMsg>(data)?,
        )),
        MessageType::RemoteUpdate => Ok(ServerMessage::RemoteUpdate(
            decode_payload::<RemoteUpdateMsg>(data)?,
        )),
        MessageType::WorldEvent => Ok(ServerMessage::WorldEvent(
            decode_payload::<WorldEventMsg>(data)?,
        )),
        MessageType::PlayerLeft => Ok(ServerMessage::PlayerLeft(
            decode_payload::<PlayerLeftMsg>(data)?,
        )),
        other => Err(ProtocolError::WrongDirection(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Direction;
    use crate::room::WorldEventKind;
    use uuid::Uuid;

    #[test]
    fn join_room_roundtrip() {
        let msg = ClientMessage::JoinRoom(JoinRoomMsg {
            room: "abcd".to_string(),
            username: "Alice".to_string(),
        });
        let encoded = encode_client_message(&msg).unwrap();
        assert_eq!(encoded[0], MessageType::JoinRoom as u8);
        let decoded = decode_client_message(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn partial_update_preserves_omitted_fields() {
        let msg = ClientMessage::PlayerUpdate(PlayerUpdate {
            x: Some(10.0),
            ..PlayerUpdate::default()
        });
        let encoded = encode_client_message(&msg).unwrap();
        match decode_client_message(&encoded).unwrap() {
            ClientMessage::PlayerUpdate(u) => {
                assert_eq!(u.x, Some(10.0));
                assert_eq!(u.y, None);
                assert_eq!(u.dir, None);
                assert_eq!(u.has_sword, None);
            },
            other => panic!("Expected PlayerUpdate, got: {other:?}"),
        }
    }

    #[test]
    fn world_event_decodes_both_directions() {
        let payload = WorldEventMsg {
            kind: WorldEventKind::Container,
            key: "c1".to_string(),
        };
        let encoded =
            encode_server_message(&ServerMessage::WorldEvent(payload.clone())).unwrap();
        assert!(matches!(
            decode_client_message(&encoded).unwrap(),
            ClientMessage::WorldEvent(m) if m == payload
        ));
        assert!(matches!(
            decode_server_message(&encoded).unwrap(),
            ServerMessage::WorldEvent(m) if m == payload
        ));
    }

    #[test]
    fn remote_update_roundtrip() {
        let msg = ServerMessage::RemoteUpdate(RemoteUpdateMsg {
            session_id: Uuid::new_v4(),
            x: 10.0,
            y: 10.0,
            dir: Direction::Down,
            frame: 0,
            has_sword: true,
        });
        let encoded = encode_server_message(&msg).unwrap();
        assert!(matches!(
            decode_server_message(&encoded).unwrap(),
            ServerMessage::RemoteUpdate(_)
        ));
    }

    #[test]
    fn server_only_type_rejected_from_client() {
        let encoded = encode_server_message(&ServerMessage::RoomFull(RoomFullMsg {})).unwrap();
        assert!(matches!(
            decode_client_message(&encoded),
            Err(ProtocolError::WrongDirection(MessageType::RoomFull))
        ));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            decode_message_type(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
        assert!(matches!(
            decode_message_type(&[0xFF]),
            Err(ProtocolError::UnknownMessageType(0xFF))
        ));
    }
}
