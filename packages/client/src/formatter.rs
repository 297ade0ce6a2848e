//! Message formatting utilities for client display.

use std::time::Duration;

use tsunagi_shared::time::timestamp_to_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner shown after a successful connection
    pub fn format_welcome(room_id: &str, user_id: &str) -> String {
        format!(
            "\n============================================================\n\
             Joined room '{}' as '{}'.\n\
             Type messages and press Enter to send. Press Ctrl+C to exit.\n\
             ============================================================\n",
            room_id, user_id
        )
    }

    /// Format a message relayed from another member
    ///
    /// # Arguments
    ///
    /// * `from` - The userId of the sender
    /// * `text` - The message text
    /// * `received_at` - Server receipt time (Unix milliseconds)
    pub fn format_chat_message(from: &str, text: &str, received_at: i64) -> String {
        let timestamp_str = timestamp_to_rfc3339(received_at);
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             at {}\n\
             ------------------------------------------------------------\n",
            from, text, timestamp_str
        )
    }

    /// Format the local echo of a line this client sent
    ///
    /// The relay never sends a message back to its sender, so the client
    /// shows its own messages itself.
    pub fn format_sent_message(from: &str, text: &str, sent_at: i64) -> String {
        let timestamp_str = timestamp_to_rfc3339(sent_at);
        format!("@{} (me): {}\nsent at {}\n", from, text, timestamp_str)
    }

    /// Format the notice printed before waiting to reconnect
    pub fn format_reconnecting(attempt: u32, max_attempts: u32, delay: Duration) -> String {
        format!(
            "\n*** reconnecting in {}s... (attempt {}/{}) ***\n",
            delay.as_secs(),
            attempt,
            max_attempts
        )
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
