//! HTTP and WebSocket surface.
//!
//! `/ws` upgrades to the race event stream; every other path is served from
//! the static asset directory when one is configured.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::any,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use tower_http::services::ServeDir;

use crate::{
    client_connection::ClientConnection, config::ServerConfig, protocol::ServerEvent,
    race_state::RaceStateManager,
};

/// Who may send control messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPolicy {
    /// Every connection may change race state.
    Open,
    /// Only upgrade requests carrying this header set to `true`.
    RequireHeader(String),
}

impl ControlPolicy {
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        config
            .control_header
            .clone()
            .map_or(Self::Open, Self::RequireHeader)
    }

    /// Whether a connection upgraded with `headers` is privileged.
    #[must_use]
    pub fn is_privileged(&self, headers: &HeaderMap) -> bool {
        match self {
            Self::Open => true,
            Self::RequireHeader(name) => headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub race_state: Arc<RaceStateManager>,
    pub control_policy: ControlPolicy,
}

/// Build the application router.
pub fn router(state: AppState, static_directory: Option<&Path>) -> Router {
    let router = Router::new().route("/ws", any(ws_handler));
    let router = match static_directory {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let privileged = state.control_policy.is_privileged(&headers);
    tracing::debug!(privileged, "got a websocket connection");
    ws.on_upgrade(move |socket| handle_socket(socket, state, privileged))
}

#[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
async fn handle_socket(socket: WebSocket, state: AppState, privileged: bool) {
    let mut connection = ClientConnection::connect(Arc::clone(&state.race_state), privileged);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::warn!(connection = connection.id(), "websocket receive error: {e}");
                        return;
                    }
                    None => return,
                };

                match msg {
                    Message::Text(text) => {
                        let Some(reply) = connection.handle_text(text.as_str()) else {
                            continue;
                        };
                        if send_event(&mut sender, &reply).await.is_err() {
                            return;
                        }
                    }
                    Message::Binary(_) => {
                        tracing::debug!(connection = connection.id(), "ignoring binary frame");
                    }
                    Message::Ping(data) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => {
                        tracing::debug!(connection = connection.id(), "client sent close");
                        return;
                    }
                }
            }

            event = connection.next_event() => {
                let Some(event) = event else {
                    tracing::debug!(connection = connection.id(), "broadcaster closed");
                    let _ = sender.send(Message::Close(None)).await;
                    return;
                };
                if send_event(&mut sender, &event).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Serialize and send one event. `Err` means the socket is gone.
async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), ()> {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(event = event.name(), "failed to serialize event: {e}");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await.map_err(|e| {
        tracing::debug!("client disconnected: {e}");
    })
}
