//! WebSocket frame DTOs.
//!
//! All frames are JSON text frames. Field names follow the browser client's
//! camelCase convention.

use serde::{Deserialize, Serialize};

/// Client → server frame: `{ "text": "<message body>" }`
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
}

/// Server → client frame, delivered to peers only:
/// `{ "senderId": "<userId>", "text": "<message body>", "timestamp": <unix-ms> }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub sender_id: String,
    pub text: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_message_ignores_extra_fields() {
        // テスト項目: 余分なフィールドを含むフレームもデコードできる
        // given (前提条件):
        let json = r#"{"text":"hello","senderId":"mallory","timestamp":1}"#;

        // when (操作):
        let msg: IncomingMessage = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(msg.text, "hello");
    }

    #[test]
    fn test_incoming_message_requires_text() {
        // テスト項目: text フィールドがないフレームはデコードエラーになる
        // given (前提条件):
        let inputs = [r#"{"body":"hello"}"#, r#"{"text":42}"#, "hello", ""];

        // when (操作) / then (期待する結果):
        for input in inputs {
            assert!(serde_json::from_str::<IncomingMessage>(input).is_err());
        }
    }

    #[test]
    fn test_outgoing_message_uses_camel_case() {
        // テスト項目: 送信フレームは senderId / text / timestamp で出力される
        // given (前提条件):
        let msg = OutgoingMessage {
            sender_id: "alice".to_string(),
            text: "hello".to_string(),
            timestamp: 1700000000000,
        };

        // when (操作):
        let json = serde_json::to_value(&msg).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({
                "senderId": "alice",
                "text": "hello",
                "timestamp": 1700000000000_i64,
            })
        );
    }
}
