//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Delay before the first reconnection attempt
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for the reconnection delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Build the relay URL carrying `roomId` and `userId` as query parameters.
///
/// # Examples
///
/// ```
/// use tsunagi_client::domain::build_connect_url;
///
/// let url = build_connect_url("ws://127.0.0.1:8080/", "room 1", "alice").unwrap();
/// assert_eq!(url.as_str(), "ws://127.0.0.1:8080/?roomId=room+1&userId=alice");
/// ```
pub fn build_connect_url(base: &str, room_id: &str, user_id: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base).map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("roomId", room_id)
        .append_pair("userId", user_id);
    Ok(url)
}

/// Map an HTTP rejection of the WebSocket handshake to a client error.
///
/// Only 400 is treated as a permanent failure; every other status (e.g. 503
/// while the relay is at capacity) is worth retrying.
pub fn classify_handshake_rejection(status: u16, body: &str) -> ClientError {
    let detail = if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    };
    if status == 400 {
        ClientError::InvalidParameters(detail)
    } else {
        ClientError::ConnectionError(detail)
    }
}

/// Check if the client should exit immediately based on the error type.
///
/// # Returns
///
/// `true` if retrying cannot help (bad URL, rejected parameters, session
/// taken over by another connection), `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::InvalidUrl(_)
            | ClientError::InvalidParameters(_)
            | ClientError::ClosedByRelay(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - Reconnection attempts made so far
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}

/// Delay before reconnection attempt `attempt` (1-based): 1 s, 2 s, 4 s, ... capped at 30 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    INITIAL_BACKOFF
        .saturating_mul(1_u32 << exponent)
        .min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_connect_url_encodes_parameters() {
        // テスト項目: roomId と userId がエンコードされてクエリに付与される
        // given (前提条件):
        let base = "ws://127.0.0.1:8080/";

        // when (操作):
        let url = build_connect_url(base, "room&1", "alice bob").unwrap();

        // then (期待する結果):
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("roomId".to_string(), "room&1".to_string()),
                ("userId".to_string(), "alice bob".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_connect_url_rejects_invalid_base() {
        // テスト項目: 不正な URL は InvalidUrl エラーになる
        // given (前提条件):
        let base = "not a url";

        // when (操作):
        let result = build_connect_url(base, "room123", "alice");

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_classify_bad_request_as_invalid_parameters() {
        // テスト項目: 400 は InvalidParameters として扱われ、即座に終了すべきと判定される
        // given (前提条件):
        let status = 400;

        // when (操作):
        let error = classify_handshake_rejection(status, "userId must not be empty");

        // then (期待する結果):
        assert_eq!(
            error,
            ClientError::InvalidParameters("HTTP 400: userId must not be empty".to_string())
        );
        assert!(should_exit_immediately(&error));
    }

    #[test]
    fn test_classify_service_unavailable_as_retryable() {
        // テスト項目: 503 は再試行可能な ConnectionError として扱われる
        // given (前提条件):
        let status = 503;

        // when (操作):
        let error = classify_handshake_rejection(status, "");

        // then (期待する結果):
        assert_eq!(error, ClientError::ConnectionError("HTTP 503".to_string()));
        assert!(!should_exit_immediately(&error));
    }

    #[test]
    fn test_should_attempt_reconnect_after_lost_connection() {
        // テスト項目: 接続断の場合、上限未満なら再接続すべきと判定される
        // given (前提条件):
        let error = ClientError::ConnectionLost("reset".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 4, 5);

        // then (期待する結果):
        assert!(result);
    }

    #[test]
    fn test_should_attempt_reconnect_at_limit() {
        // テスト項目: 再接続回数が上限に達した場合、再接続すべきではないと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("refused".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 5, 5);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_should_not_reconnect_when_replaced() {
        // テスト項目: リレーにセッションを閉じられた場合は再接続しない
        // given (前提条件):
        let error = ClientError::ClosedByRelay("session closed by relay".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 0, 5);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_backoff_doubles_from_one_second() {
        // テスト項目: 再接続の待ち時間は 1 秒から倍々に増える
        // given (前提条件):
        let attempts = [1, 2, 3, 4];

        // when (操作):
        let delays: Vec<Duration> = attempts.iter().map(|a| backoff_delay(*a)).collect();

        // then (期待する結果):
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        // テスト項目: 待ち時間は 30 秒で頭打ちになり、大きな試行回数でもオーバーフローしない
        // given (前提条件):
        let attempt = u32::MAX;

        // when (操作):
        let delay = backoff_delay(attempt);

        // then (期待する結果):
        assert_eq!(delay, MAX_BACKOFF);
        assert_eq!(backoff_delay(6), MAX_BACKOFF);
    }
}
