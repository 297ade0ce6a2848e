//! Terminal input and prompt handling.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(user_id: &str) {
    print!("{}> ", user_id);
    std::io::stdout().flush().ok();
}

/// Spawn a blocking thread that reads lines with rustyline.
///
/// The thread lives for the whole client run, across reconnections. The
/// returned receiver is closed when the user presses Ctrl+C or Ctrl+D.
pub fn spawn_line_reader(user_id: &str) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", user_id);

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    if input_tx.send(line.to_string()).is_err() {
                        // Channel closed, exit thread
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
