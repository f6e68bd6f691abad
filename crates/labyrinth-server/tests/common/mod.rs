use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use labyrinth_core::net::messages::{ClientMessage, JoinRoomMsg, ServerMessage, WorldEventMsg};
use labyrinth_core::net::protocol::{decode_server_message, encode_client_message};
use labyrinth_core::player::PlayerUpdate;
use labyrinth_core::room::WorldEventKind;

use labyrinth_server::build_app;
use labyrinth_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default config on an ephemeral port.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Send a join-room request.
pub async fn ws_join(stream: &mut WsStream, room: &str, username: &str) {
    ws_send_client_msg(
        stream,
        &ClientMessage::JoinRoom(JoinRoomMsg {
            room: room.to_string(),
            username: username.to_string(),
        }),
    )
    .await;
}

/// Send a partial player update.
pub async fn ws_send_update(stream: &mut WsStream, update: PlayerUpdate) {
    ws_send_client_msg(stream, &ClientMessage::PlayerUpdate(update)).await;
}

/// Send a world event.
pub async fn ws_send_world_event(stream: &mut WsStream, kind: WorldEventKind, key: &str) {
    ws_send_client_msg(
        stream,
        &ClientMessage::WorldEvent(WorldEventMsg {
            kind,
            key: key.to_string(),
        }),
    )
    .await;
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Join a room and return the snapshot the server answers with.
pub async fn ws_join_expect_state(
    stream: &mut WsStream,
    room: &str,
    username: &str,
) -> labyrinth_core::net::messages::RoomStateMsg {
    ws_join(stream, room, username).await;
    match ws_read_server_msg(stream).await {
        ServerMessage::RoomState(state) => state,
        other => panic!("Expected RoomState, got: {other:?}"),
    }
}
