//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Inbound, Outbound, PlayerInput, SessionHandle};
use crate::util::rate_limit::PeerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let actor_id = Uuid::new_v4();
    info!(actor_id = %actor_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        actor_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(actor_id = %actor_id, error = %e, "Failed to send welcome");
        return;
    }

    // Nothing is routed until the client picks a session
    let Some((session, join)) = await_join(actor_id, &state, &mut ws_sink, &mut ws_stream).await else {
        info!(actor_id = %actor_id, "Connection closed before joining");
        return;
    };

    // Subscribe before the join is processed so the roster reply is not missed
    let out_rx = session.out_tx.subscribe();
    let join = PlayerInput {
        actor_id,
        msg: Inbound::Client(join),
        received_at: unix_millis(),
    };
    if session.input_tx.send(join).await.is_err() {
        warn!(actor_id = %actor_id, session_id = %session.id, "Session closed before join");
        return;
    }

    run_session(actor_id, ws_sink, ws_stream, session.input_tx.clone(), out_rx).await;

    info!(actor_id = %actor_id, session_id = %session.id, "WebSocket connection closed");
}

/// Read until a join message names a session we can route to
async fn await_join(
    actor_id: Uuid,
    state: &AppState,
    ws_sink: &mut WsSink,
    ws_stream: &mut WsStream,
) -> Option<(SessionHandle, ClientMsg)> {
    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        };
        let msg = match serde_json::from_str::<ClientMsg>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(actor_id = %actor_id, error = %e, "Failed to parse client message");
                continue;
            }
        };
        let reply = match &msg {
            ClientMsg::Join { session_id, .. } => match state.session_for(*session_id) {
                Some(session) => return Some((session, msg)),
                None => ServerMsg::error("session_not_found", "No such session"),
            },
            ClientMsg::Ping { t } => ServerMsg::Pong { t: *t },
            ClientMsg::Leave => return None,
            _ => ServerMsg::error("not_joined", "Join a session first"),
        };
        if send_msg(ws_sink, &reply).await.is_err() {
            return None;
        }
    }
    None
}

/// Run the WebSocket session with read/write split
async fn run_session(
    actor_id: Uuid,
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    input_tx: mpsc::Sender<PlayerInput>,
    mut out_rx: broadcast::Receiver<Outbound>,
) {
    let rate_limiter = PeerRateLimiter::new();

    // Writer task: session output -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match out_rx.recv().await {
                Ok(out) if out.is_for(actor_id) => {
                    let sent = match out {
                        Outbound::Control { msg, .. } => send_msg(&mut ws_sink, &msg).await,
                        Outbound::Frame { bytes, .. } => send_frame(&mut ws_sink, bytes).await,
                    };
                    if let Err(e) = sent {
                        debug!(actor_id = %actor_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(actor_id = %actor_id, lagged_count = n, "Client lagged, skipping {} messages", n);
                    // Continue - periodic state catches the client up
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(actor_id = %actor_id, "Session output closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        let msg = match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(actor_id = %actor_id, "Rate limited input message");
                    continue;
                }
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => Inbound::Client(msg),
                    Err(e) => {
                        warn!(actor_id = %actor_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                }
            }
            Ok(Message::Binary(data)) => {
                if !rate_limiter.check_event() {
                    warn!(actor_id = %actor_id, "Rate limited replication frame");
                    continue;
                }
                Inbound::Frame(Bytes::from(data))
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(actor_id = %actor_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(actor_id = %actor_id, error = %e, "WebSocket error");
                break;
            }
        };

        let leaving = matches!(msg, Inbound::Client(ClientMsg::Leave));
        let input = PlayerInput {
            actor_id,
            msg,
            received_at: unix_millis(),
        };
        if input_tx.send(input).await.is_err() {
            debug!(actor_id = %actor_id, "Input channel closed");
            break;
        }
        if leaving {
            break;
        }
    }

    // Signal disconnect to the session loop
    let _ = input_tx
        .send(PlayerInput {
            actor_id,
            msg: Inbound::Client(ClientMsg::Leave),
            received_at: unix_millis(),
        })
        .await;

    writer_handle.abort();
}

/// Send a control message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}

/// Send a replication frame over WebSocket
async fn send_frame(sink: &mut WsSink, bytes: Bytes) -> Result<(), String> {
    sink.send(Message::Binary(bytes.to_vec())).await.map_err(|e| e.to_string())
}
