//! WebSocket upgrade handler and per-connection session loop

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::PeerRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "new WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Outbound channel; the registry routes relayed messages into it
    let (tx, mut rx) = mpsc::channel::<ServerMsg>(64);
    state.rooms.register_peer(conn_id, tx.clone());

    // Writer task: registry/relay -> WebSocket
    let writer_conn_id = conn_id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let rate_limiter = PeerRateLimiter::new();

    // Reader loop: WebSocket -> room lifecycle handlers
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(conn_id = %conn_id, "rate limited message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        dispatch(&state, conn_id, &tx, client_msg).await;
                    }
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup: notify the other occupant and drop the room
    state.rooms.unregister_peer(conn_id).await;
    writer_handle.abort();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

async fn dispatch(
    state: &AppState,
    conn_id: Uuid,
    tx: &mpsc::Sender<ServerMsg>,
    msg: ClientMsg,
) {
    match msg {
        ClientMsg::CreateRoom => {
            state.rooms.create_room(conn_id).await;
        }
        ClientMsg::JoinRoom { room_id } => {
            if let Err(e) = state.rooms.join_room(conn_id, &room_id).await {
                let _ = tx
                    .send(ServerMsg::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        }
        ClientMsg::PlayerInput {
            room_id,
            input_state,
        } => {
            state.rooms.relay_input(conn_id, &room_id, input_state).await;
        }
        ClientMsg::SyncState { room_id, state: snapshot } => {
            state.rooms.relay_sync(conn_id, &room_id, snapshot).await;
        }
        ClientMsg::RoundResult { room_id, winner } => {
            state
                .rooms
                .relay_round_result(conn_id, &room_id, winner)
                .await;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
