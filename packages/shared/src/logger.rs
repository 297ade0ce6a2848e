//! Logging setup utilities for the Tsunagi binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the workspace crates and the calling binary. It can be
/// overridden with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "tsunagi-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn")
///
/// # Examples
///
/// ```no_run
/// use tsunagi_shared::logger::setup_logger;
///
/// setup_logger("tsunagi-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let binary = binary_name.replace('-', "_");
    format!(
        "tsunagi_server={level},tsunagi_client={level},tsunagi_shared={level},{binary}={level},tower_http=info",
        level = default_log_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        // テスト項目: デフォルトのフィルタにワークスペースの全クレートが含まれる
        // given (前提条件):
        let binary_name = "tsunagi-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert!(filter.contains("tsunagi_server=debug"));
        assert!(filter.contains("tsunagi_client=debug"));
        assert!(filter.contains("tsunagi_shared=debug"));
        assert!(filter.contains("tower_http=info"));
    }

    #[test]
    fn test_default_filter_normalizes_binary_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに変換される
        // given (前提条件):
        let binary_name = "my-relay-bin";

        // when (操作):
        let filter = default_filter(binary_name, "warn");

        // then (期待する結果):
        assert!(filter.contains("my_relay_bin=warn"));
        assert!(!filter.contains("my-relay-bin"));
    }
}
