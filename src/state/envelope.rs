//! Acknowledgement envelopes.
//!
//! Request/response actions (`create`, `join`, `enter_lobby`) answer the
//! caller with a `{ok, data|error}` envelope; the host serializes these
//! onto whatever ack channel the transport provides.

use serde_json::{json, Value};

/// Build a success envelope carrying `data`.
pub fn success(data: Value) -> Value {
    json!({ "ok": true, "data": data })
}

/// Build an error envelope carrying a message.
pub fn error(message: &str) -> Value {
    json!({ "ok": false, "error": message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_shape() {
        let envelope = success(json!({ "session_id": "ABC123" }));
        assert_eq!(
            envelope,
            json!({ "ok": true, "data": { "session_id": "ABC123" } })
        );
    }

    #[test]
    fn test_error_shape() {
        let envelope = error("Session not found");
        assert_eq!(
            envelope,
            json!({ "ok": false, "error": "Session not found" })
        );
    }
}
