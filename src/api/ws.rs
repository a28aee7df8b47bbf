use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::routes::AppState;

/// Dashboard push-channel endpoint.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();
    let session_id = Uuid::new_v4();

    state.sessions.add(session_id, sender);
    info!("Dashboard session [{session_id}] connected ({} active)", state.sessions.count());

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    // The dashboard only listens; inbound frames are dropped apart from Close.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                warn!("WebSocket error for session [{session_id}]: {error}");
                break;
            }
        }
    }

    state.sessions.remove(&session_id);
    send_task.abort();
    debug!("Dashboard session [{session_id}] disconnected");
}
