//! WebSocket connection handlers.
//!
//! Each accepted connection runs two tasks:
//!
//! - `pusher_loop`: drains the connection's outbound queue into the socket and
//!   sends heartbeat pings
//! - `recv_loop`: reads client frames and hands text frames to `SendMessageUseCase`
//!
//! When either task finishes the other is stopped, and the connection is removed
//! from its room.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::Response,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    domain::{
        DetachReason, MessageText, PusherReceiver, RoomId, UserId, ValueObjectError,
        pusher_channel,
    },
    infrastructure::dto::websocket::IncomingMessage,
    ui::state::AppState,
    usecase::{ConnectError, JoinedParticipant},
};

/// How long the pusher loop gets to flush a close frame before it is aborted.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Query parameters for WebSocket connection: `?roomId=<id>&userId=<id>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub room_id: Option<String>,
    pub user_id: Option<String>,
}

impl ConnectQuery {
    /// Convert the raw query into domain identifiers.
    ///
    /// A missing parameter is treated the same as an empty one.
    fn into_identifiers(self) -> Result<(RoomId, UserId), ValueObjectError> {
        let room_id = RoomId::try_from(self.room_id.unwrap_or_default())?;
        let user_id = UserId::try_from(self.user_id.unwrap_or_default())?;
        Ok((room_id, user_id))
    }
}

/// Why the receive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecvEnd {
    ClientClosed,
    StreamEnded,
    TransportError,
    IdleTimeout,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<Response, (StatusCode, String)> {
    // Convert String -> RoomId / UserId (Domain Model)
    let (room_id, user_id) = match query.into_identifiers() {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!("Rejecting connection with invalid parameters: {}", e);
            return Err((StatusCode::BAD_REQUEST, e.to_string()));
        }
    };

    if !state.connect_participant_usecase.has_capacity().await {
        tracing::warn!(
            "Connection limit reached. Rejecting '{}' for room '{}'",
            user_id,
            room_id
        );
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "connection limit reached".to_string(),
        ));
    }

    let max_frame_bytes = state.config.max_frame_bytes;
    Ok(ws
        .max_message_size(max_frame_bytes)
        .max_frame_size(max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, room_id, user_id)))
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    room_id: RoomId,
    user_id: UserId,
) {
    // Create a bounded outbound queue for this connection
    let (tx, rx) = pusher_channel(state.config.outbound_capacity);

    // Membership is registered only once the handshake has completed
    let session = match state
        .connect_participant_usecase
        .execute(room_id, user_id, tx)
        .await
    {
        Ok(session) => session,
        Err(e @ ConnectError::TooManyConnections(_)) => {
            tracing::warn!("Closing upgraded socket: {}", e);
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::AGAIN,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };
    tracing::info!(
        "User '{}' joined room '{}' (connection '{}')",
        session.user_id,
        session.room_id,
        session.connection_id
    );

    let (sender, receiver) = socket.split();
    let (close_tx, close_rx) = oneshot::channel();

    // Spawn a task to push queued messages (and heartbeats) to this client
    let mut send_task = pusher_loop(
        rx,
        sender,
        close_rx,
        state.config.heartbeat_interval,
        state.config.write_timeout,
    );

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(recv_loop(
        receiver,
        state.clone(),
        session.clone(),
        state.config.idle_timeout,
    ));

    // If any one of the tasks completes, stop the other
    tokio::select! {
        ended = &mut recv_task => {
            match ended {
                Ok(RecvEnd::IdleTimeout) => {
                    let _ = close_tx.send(CloseFrame {
                        code: close_code::AWAY,
                        reason: "idle timeout".into(),
                    });
                }
                Ok(reason) => {
                    tracing::debug!(
                        "Receive loop for connection '{}' ended: {:?}",
                        session.connection_id,
                        reason
                    );
                    drop(close_tx);
                }
                Err(e) => {
                    tracing::error!(
                        "Receive loop for connection '{}' failed: {}",
                        session.connection_id,
                        e
                    );
                    drop(close_tx);
                }
            }
            if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
        _ = &mut send_task => recv_task.abort(),
    };

    // Use DisconnectParticipantUseCase to handle disconnection
    let outcome = state
        .disconnect_participant_usecase
        .execute(&session.room_id, &session.user_id, session.connection_id)
        .await;
    tracing::info!(
        "User '{}' left room '{}' (connection '{}'{})",
        session.user_id,
        session.room_id,
        session.connection_id,
        if outcome.room_removed {
            ", room removed"
        } else {
            ""
        }
    );
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// The task also sends a Ping every `heartbeat_interval`. It ends when:
///
/// - the outbound queue is closed by the relay, in which case the socket is
///   closed with the frame chosen by [`close_frame_for`]
/// - a close frame arrives on `close_rx`
/// - a socket write fails or exceeds `write_timeout`
fn pusher_loop(
    mut rx: PusherReceiver,
    mut sender: SplitSink<WebSocket, Message>,
    mut close_rx: oneshot::Receiver<CloseFrame>,
    heartbeat_interval: Duration,
    write_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut heartbeat =
            tokio::time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let outgoing = tokio::select! {
                queued = rx.frames.recv() => match queued {
                    Some(text) => Message::Text(text.into()),
                    None => {
                        let reason = rx.detach.try_recv().unwrap_or(DetachReason::Disconnected);
                        let _ = sender
                            .send(Message::Close(Some(close_frame_for(reason))))
                            .await;
                        break;
                    }
                },
                _ = heartbeat.tick() => Message::Ping(Bytes::new()),
                frame = &mut close_rx => {
                    if let Ok(frame) = frame {
                        let _ = sender.send(Message::Close(Some(frame))).await;
                    }
                    break;
                }
            };

            match tokio::time::timeout(write_timeout, sender.send(outgoing)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!("WebSocket write failed: {}", e);
                    break;
                }
                Err(_) => {
                    tracing::warn!("WebSocket write timed out after {:?}", write_timeout);
                    break;
                }
            }
        }
    })
}

/// Close frame sent when the relay detaches a connection from its queue.
///
/// A taken-over session closes with 1000 so the client does not reconnect;
/// an evicted one closes with 1013 so the client retries.
fn close_frame_for(reason: DetachReason) -> CloseFrame {
    match reason {
        DetachReason::Replaced => CloseFrame {
            code: close_code::NORMAL,
            reason: "replaced by a newer connection".into(),
        },
        DetachReason::Evicted => CloseFrame {
            code: close_code::AGAIN,
            reason: "too slow, reconnect".into(),
        },
        DetachReason::Disconnected => CloseFrame {
            code: close_code::NORMAL,
            reason: "session closed by relay".into(),
        },
    }
}

/// Reads frames until the client closes, the transport fails, or nothing arrives
/// for `idle_timeout`.
async fn recv_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    session: JoinedParticipant,
    idle_timeout: Duration,
) -> RecvEnd {
    loop {
        let msg = match tokio::time::timeout(idle_timeout, receiver.next()).await {
            Err(_) => {
                tracing::info!(
                    "Connection '{}' idle for {:?}, closing",
                    session.connection_id,
                    idle_timeout
                );
                return RecvEnd::IdleTimeout;
            }
            Ok(None) => return RecvEnd::StreamEnded,
            Ok(Some(Err(e))) => {
                tracing::warn!("WebSocket error on '{}': {}", session.connection_id, e);
                return RecvEnd::TransportError;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => relay_text(&state, &session, text.as_str()).await,
            Message::Binary(data) => {
                tracing::debug!("Ignoring binary frame ({} bytes)", data.len());
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Ping/pong is handled automatically by the WebSocket protocol
                tracing::trace!("Heartbeat from '{}'", session.connection_id);
            }
            Message::Close(_) => {
                tracing::info!("User '{}' requested close", session.user_id);
                return RecvEnd::ClientClosed;
            }
        }
    }
}

async fn relay_text(state: &AppState, session: &JoinedParticipant, raw: &str) {
    // Parse the incoming message
    let incoming = match serde_json::from_str::<IncomingMessage>(raw) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(
                "Dropping malformed frame from '{}': {}",
                session.user_id,
                e
            );
            return;
        }
    };

    let text = match MessageText::try_from(incoming.text) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Dropping message from '{}': {}", session.user_id, e);
            return;
        }
    };

    match state
        .send_message_usecase
        .execute(
            &session.room_id,
            session.user_id.clone(),
            session.connection_id,
            text,
        )
        .await
    {
        Ok(report) => tracing::debug!(
            "Relayed message from '{}' in room '{}' to {} peer(s)",
            session.user_id,
            session.room_id,
            report.delivered
        ),
        Err(e) => tracing::warn!("Failed to send message: {}", e),
    }
}
