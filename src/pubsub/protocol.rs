//! Wire format of the pub/sub layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;

/// One event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse a text frame. Anything that is not an envelope arrives as a
    /// `message` event carrying the raw text.
    pub fn decode(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| Self::new("message", Value::String(text.to_string())))
    }

    pub fn encode(&self) -> Result<String, HandlerError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_envelopes_and_plain_text() {
        assert_eq!(
            Envelope::decode(r#"{"event":"chat","data":{"text":"hi"}}"#),
            Envelope::new("chat", json!({"text": "hi"}))
        );
        assert_eq!(Envelope::decode(r#"{"event":"ping"}"#), Envelope::new("ping", Value::Null));
        assert_eq!(Envelope::decode("hello"), Envelope::new("message", json!("hello")));
        assert_eq!(Envelope::decode(r#"{"data":1}"#).event, "message");
    }

    #[test]
    fn encodes_compact_json() {
        let frame = Envelope::new("tick", json!(3)).encode().unwrap();
        assert_eq!(frame, r#"{"event":"tick","data":3}"#);
    }
}
