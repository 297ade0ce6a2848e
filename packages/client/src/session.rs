//! WebSocket client session management.
//!
//! A session covers one connection: it ends with `Ok(())` when the user quits
//! and with an error when the connection could not be made or was lost.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message, protocol::frame::coding::CloseCode},
};
use url::Url;

use tsunagi_server::infrastructure::dto::websocket::{IncomingMessage, OutgoingMessage};
use tsunagi_shared::time::get_unix_timestamp_millis;

use crate::{domain::classify_handshake_rejection, error::ClientError};

use super::{formatter::MessageFormatter, ui::redisplay_prompt};

/// Run the WebSocket client session
///
/// # Arguments
///
/// * `url` - Relay URL including the `roomId` / `userId` query
/// * `room_id` - Room being joined (for display)
/// * `user_id` - This client's userId (for display)
/// * `input` - Lines typed by the user; closed when the user quits
pub async fn run_client_session(
    url: &Url,
    room_id: &str,
    user_id: &str,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url.as_str())
        .await
        .map_err(classify_connect_error)?;

    tracing::info!("Connected to relay");
    print!("{}", MessageFormatter::format_welcome(room_id, user_id));
    redisplay_prompt(user_id);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            line = input.recv() => {
                let Some(line) = line else {
                    // User quit: close politely and end the session
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };

                let frame = IncomingMessage { text: line };
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };

                write
                    .send(Message::Text(json.into()))
                    .await
                    .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;

                print!(
                    "{}",
                    MessageFormatter::format_sent_message(
                        user_id,
                        &frame.text,
                        get_unix_timestamp_millis()
                    )
                );
                redisplay_prompt(user_id);
            }
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    display_text(text.as_str());
                    redisplay_prompt(user_id);
                }
                Some(Ok(Message::Binary(data))) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(user_id);
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Relay closed the connection: {:?}", frame);
                    return Err(classify_close(frame.map(|f| (f.code, f.reason.to_string()))));
                }
                Some(Ok(_)) => {
                    // Ping/pong is handled automatically by tungstenite
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }
                None => {
                    return Err(ClientError::ConnectionLost("stream ended".to_string()));
                }
            }
        }
    }
}

fn display_text(text: &str) {
    match serde_json::from_str::<OutgoingMessage>(text) {
        Ok(msg) => print!(
            "{}",
            MessageFormatter::format_chat_message(&msg.sender_id, &msg.text, msg.timestamp)
        ),
        // If parsing fails, display as raw text
        Err(_) => print!("{}", MessageFormatter::format_raw_message(text)),
    }
}

fn classify_connect_error(error: tungstenite::Error) -> ClientError {
    match error {
        tungstenite::Error::Http(response) => {
            let body = response
                .body()
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            classify_handshake_rejection(response.status().as_u16(), &body)
        }
        other => ClientError::ConnectionError(other.to_string()),
    }
}

/// A normal (1000) close from the relay means this session was taken over or
/// dropped on purpose; anything else (idle timeout, eviction with 1013,
/// shutdown) is worth a retry.
fn classify_close(frame: Option<(CloseCode, String)>) -> ClientError {
    match frame {
        Some((CloseCode::Normal, reason)) => ClientError::ClosedByRelay(reason),
        Some((code, reason)) => {
            ClientError::ConnectionLost(format!("closed with {}: {}", u16::from(code), reason))
        }
        None => ClientError::ConnectionLost("closed without status".to_string()),
    }
}
