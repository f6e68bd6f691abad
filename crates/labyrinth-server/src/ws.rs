use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use labyrinth_core::net::messages::ClientMessage;
use labyrinth_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message};

use crate::session::Session;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    let mut session = Session::new(Arc::clone(&state.registry), Arc::clone(&state.router));
    state.router.register(session.id(), tx);

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, &mut session).await;

    // Connection gone, run the cleanup path exactly once
    session.on_disconnect();
    state.router.unregister(session.id());
    tracing::info!(session_id = %session.id(), "Connection closed");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    session: &mut Session,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        // Drop messages that exceed the per-connection rate
        if !rate_limiter.allow() {
            tracing::warn!(session_id = %session.id(), "Rate limited");
            continue;
        }

        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(session_id = %session.id(), error = %e, "Undecodable frame dropped");
                continue;
            },
        };

        match client_msg {
            ClientMessage::JoinRoom(join) => {
                session.on_join_request(&join.room, &join.username);
            },
            ClientMessage::PlayerUpdate(update) => {
                session.on_player_update(&update);
            },
            ClientMessage::WorldEvent(event) => {
                session.on_world_event(event.kind, &event.key);
            },
        }
    }
}
