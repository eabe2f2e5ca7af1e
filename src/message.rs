//! Wire payload decoding and the outbound notification shape.
//!
//! Each inbound transport frame is UTF-8 text containing one JSON value.
//! No schema is enforced: the payload passes through opaquely to the
//! registered handler, wrapped in a [`Notification`] that tags it with the
//! channel's event name.
//!
//! A frame that fails to decode is isolated to itself: the channel logs it,
//! drops it, and stays open. [`decode_frame`] is the single place that
//! policy's error originates from.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Decoding
// ============================================================================

/// Decodes one inbound text frame as an opaque JSON value.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the frame is not valid JSON.
pub fn decode_frame(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| Error::decode(e.to_string()))
}

// ============================================================================
// Notification
// ============================================================================

/// One decoded message as delivered to the registered handler.
///
/// Carries the decoded payload in the `action` field, tagged with the
/// caller-supplied event name. This is the entire outbound contract of the
/// channel: how the receiving side turns it into a rendering update (or
/// anything else) is its own business.
///
/// # Format
///
/// ```json
/// {
///   "event": "state_update",
///   "action": { "type": "ping" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Caller-supplied event name.
    pub event: String,

    /// Decoded payload of the frame.
    pub action: Value,
}

impl Notification {
    /// Creates a new notification.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, action: Value) -> Self {
        Self {
            event: event.into(),
            action,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_object() {
        let value = decode_frame(r#"{"type":"ping"}"#).expect("decode");
        assert_eq!(value, json!({"type": "ping"}));
    }

    #[test]
    fn test_decode_any_json_value() {
        // No schema enforced: scalars and arrays pass through too.
        assert_eq!(decode_frame("42").expect("decode"), json!(42));
        assert_eq!(decode_frame("[1,2]").expect("decode"), json!([1, 2]));
        assert_eq!(decode_frame("null").expect("decode"), Value::Null);
    }

    #[test]
    fn test_decode_malformed_frame() {
        let err = decode_frame("not-json").unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_empty_frame() {
        assert!(decode_frame("").unwrap_err().is_decode());
    }

    #[test]
    fn test_decode_truncated_object() {
        assert!(decode_frame(r#"{"type":"#).unwrap_err().is_decode());
    }

    #[test]
    fn test_notification_shape() {
        let notification = Notification::new("state_update", json!({"revision": 7}));
        let value = serde_json::to_value(&notification).expect("serialize");

        assert_eq!(
            value,
            json!({
                "event": "state_update",
                "action": { "revision": 7 }
            })
        );
    }

    #[test]
    fn test_notification_deserialize() {
        let raw = r#"{"event":"message","action":{"type":"ping"}}"#;
        let notification: Notification = serde_json::from_str(raw).expect("deserialize");

        assert_eq!(notification.event, "message");
        assert_eq!(notification.action, json!({"type": "ping"}));
    }

    proptest! {
        #[test]
        fn prop_decode_round_trips_payloads(
            number in any::<i64>(),
            flag in any::<bool>(),
            text in "[a-zA-Z0-9 _-]{0,32}",
        ) {
            let payload = json!({
                "number": number,
                "flag": flag,
                "text": text,
            });

            let frame = serde_json::to_string(&payload).expect("serialize");
            let decoded = decode_frame(&frame).expect("decode");
            prop_assert_eq!(decoded, payload);
        }

        #[test]
        fn prop_non_json_prefix_is_rejected(suffix in "[a-z]{0,16}") {
            // "not-" is not the start of any JSON token.
            let frame = format!("not-{suffix}");
            prop_assert!(decode_frame(&frame).unwrap_err().is_decode());
        }

        #[test]
        fn prop_notification_serde_round_trip(
            event in "[a-z_]{1,16}",
            revision in any::<u32>(),
        ) {
            let notification = Notification::new(&event, json!({"revision": revision}));
            let raw = serde_json::to_string(&notification).expect("serialize");
            let back: Notification = serde_json::from_str(&raw).expect("deserialize");
            prop_assert_eq!(back, notification);
        }
    }
}
