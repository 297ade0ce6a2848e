//! Client execution logic with reconnection support.

use crate::{
    domain::{backoff_delay, build_connect_url, should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
};

use super::{formatter::MessageFormatter, session::run_client_session, ui::spawn_line_reader};

/// Run the WebSocket client with reconnection logic
///
/// Returns `Ok(())` when the user quits, or the last error once reconnecting
/// is pointless or `max_reconnect_attempts` consecutive attempts have failed.
pub async fn run_client(
    url: String,
    room_id: String,
    user_id: String,
    max_reconnect_attempts: u32,
) -> Result<(), ClientError> {
    let connect_url = build_connect_url(&url, &room_id, &user_id)?;
    let mut input = spawn_line_reader(&user_id);
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting to {} as '{}' in room '{}'",
            url,
            user_id,
            room_id
        );

        match run_client_session(&connect_url, &room_id, &user_id, &mut input).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                // If connection ended normally (user exit), don't reconnect
                return Ok(());
            }
            Err(e) => {
                if should_exit_immediately(&e) {
                    tracing::error!("{}", e);
                    return Err(e);
                }

                // A connection that was up before it dropped starts a fresh backoff
                if matches!(e, ClientError::ConnectionLost(_)) {
                    reconnect_count = 0;
                }

                tracing::warn!("{}", e);
                if !should_attempt_reconnect(&e, reconnect_count, max_reconnect_attempts) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        max_reconnect_attempts
                    );
                    return Err(e);
                }

                reconnect_count += 1;
                let delay = backoff_delay(reconnect_count);
                print!(
                    "{}",
                    MessageFormatter::format_reconnecting(
                        reconnect_count,
                        max_reconnect_attempts,
                        delay
                    )
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
