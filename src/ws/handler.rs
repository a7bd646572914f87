//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::{AppState, SessionInfo};
use crate::game::vector::Vec2;
use crate::game::{ConnectionId, GameError};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Queued outbound messages per connection before snapshots are dropped
pub const OUTBOX_CAPACITY: usize = 32;

const MAX_DISPLAY_NAME_LEN: usize = 24;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");
    state.sessions.insert(connection_id, SessionInfo::new());

    let (ws_sink, ws_stream) = socket.split();
    let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
    };
    if outbox_tx.try_send(welcome).is_err() {
        error!(connection_id = %connection_id, "Failed to queue welcome");
    }

    run_session(connection_id, &state, ws_sink, ws_stream, outbox_tx, outbox_rx).await;

    // Cleanup on disconnect
    state.orchestrator.lock().disconnect(connection_id);
    let session_ms = state
        .sessions
        .remove(&connection_id)
        .map_or(0, |(_, session)| unix_millis().saturating_sub(session.connected_at));

    info!(connection_id = %connection_id, session_ms, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: ConnectionId,
    state: &AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    outbox_tx: mpsc::Sender<ServerMsg>,
    mut outbox_rx: mpsc::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> orchestrator
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited inbound message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        if let Some(reply) =
                            handle_client_msg(state, connection_id, client_msg, &outbox_tx)
                        {
                            if outbox_tx.try_send(reply).is_err() {
                                warn!(connection_id = %connection_id, "Outbox full, dropping reply");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Apply one client message. Returns the direct reply, if any; action
/// errors become a structured error reply.
pub fn handle_client_msg(
    state: &AppState,
    connection_id: ConnectionId,
    msg: ClientMsg,
    outbox: &mpsc::Sender<ServerMsg>,
) -> Option<ServerMsg> {
    let result: Result<Option<ServerMsg>, GameError> = match msg {
        ClientMsg::JoinMatch {
            match_id,
            display_name,
            team,
        } => {
            let display_name = sanitize_display_name(&display_name, connection_id);
            let joined = state
                .orchestrator
                .lock()
                .join_match(match_id, connection_id, display_name.clone(), team, outbox.clone())
                .map(|player| ServerMsg::MatchJoined {
                    match_id,
                    team: player.team,
                    avatar: player.avatar,
                    x: player.position.x,
                    y: player.position.y,
                });
            if joined.is_ok() {
                if let Some(mut session) = state.sessions.get_mut(&connection_id) {
                    session.display_name = Some(display_name);
                    session.match_id = Some(match_id);
                }
            }
            joined.map(Some)
        }
        ClientMsg::Input { update } => state
            .orchestrator
            .lock()
            .apply_input(connection_id, &update)
            .map(|()| None),
        ClientMsg::Build {
            structure_type,
            x,
            y,
        } => state
            .orchestrator
            .lock()
            .build_structure(connection_id, structure_type, Vec2::new(x, y))
            .map(|()| None),
        ClientMsg::Spawn {
            structure_id,
            unit_type,
        } => state
            .orchestrator
            .lock()
            .spawn_unit(connection_id, structure_id, unit_type)
            .map(|()| None),
        ClientMsg::Leave => {
            state.orchestrator.lock().disconnect(connection_id);
            if let Some(mut session) = state.sessions.get_mut(&connection_id) {
                session.match_id = None;
            }
            Ok(None)
        }
        ClientMsg::Ping { t } => Ok(Some(ServerMsg::Pong { t })),
    };

    match result {
        Ok(reply) => reply,
        Err(err) => {
            debug!(connection_id = %connection_id, code = err.code(), %err, "Action rejected");
            Some(ServerMsg::from(&err))
        }
    }
}

fn sanitize_display_name(raw: &str, connection_id: ConnectionId) -> String {
    let name: String = raw.trim().chars().take(MAX_DISPLAY_NAME_LEN).collect();
    if name.is_empty() {
        format!("Player_{}", &connection_id.to_string()[..8])
    } else {
        name
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
