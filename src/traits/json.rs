use crate::traits::error::{Result, RetroSockError};
use serde_json::Value;

/// Pluggable JSON encoder/decoder used for JSON messages, events and
/// acknowledgement arguments.
///
/// The wire codec itself treats JSON-bearing payloads as opaque strings;
/// only dispatch and the ack paths go through this trait.
pub trait JsonCodec: Send + Sync {
    /// Serialize a value to its JSON text form.
    fn encode(&self, value: &Value) -> Result<String>;

    /// Parse JSON text into a value.
    fn decode(&self, text: &str) -> Result<Value>;
}

/// The default codec backed by `serde_json`.
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn encode(&self, value: &Value) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text)
            .map_err(|e| RetroSockError::with_cause(format!("invalid JSON: {text}"), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_decode_round_trip() {
        let codec = SerdeJsonCodec;
        let value = json!({"name": "ping", "args": [1, "x", null]});
        let text = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&text).unwrap(), value);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(SerdeJsonCodec.decode("{not json").is_err());
    }
}
