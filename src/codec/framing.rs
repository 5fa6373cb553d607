//! Framed-datagram wrapper for transports without message boundaries.
//!
//! Long-poll bodies concatenate several frames as
//! `U+FFFD <decimal length> U+FFFD <payload>`, repeated. Lengths count
//! UTF-16 code units of the payload, the unit the 0.9 server's JavaScript
//! `String.length` counts; this module is the single place that choice is
//! made.

use crate::traits::error::{Result, RetroSockError};

/// Sentinel separating length and payload fields.
pub const FRAME_DELIMITER: char = '\u{fffd}';

/// Whether a transport body is a framed concatenation rather than a single
/// message.
pub fn is_framed(text: &str) -> bool {
    text.starts_with(FRAME_DELIMITER)
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Wrap a sequence of frames into one framed body.
pub fn encode(payloads: &[String]) -> String {
    let mut body = String::new();
    for payload in payloads {
        body.push(FRAME_DELIMITER);
        body.push_str(&utf16_len(payload).to_string());
        body.push(FRAME_DELIMITER);
        body.push_str(payload);
    }
    body
}

/// Unwrap a framed body into its frames.
///
/// A bad length field or a length mismatch is a decode error; the caller
/// treats it as fatal to the connection.
pub fn decode(text: &str) -> Result<Vec<String>> {
    let fragments: Vec<&str> = text.split(FRAME_DELIMITER).collect();
    let mut payloads = Vec::new();
    let mut index = 1;
    while index < fragments.len() {
        let length: usize = fragments[index].parse().map_err(|_| {
            RetroSockError::new(format!("invalid frame length {:?}", fragments[index]))
        })?;
        let payload = *fragments.get(index + 1).ok_or_else(|| {
            RetroSockError::new("framed body ends after a length field")
        })?;
        if utf16_len(payload) != length {
            return Err(RetroSockError::new(format!(
                "frame length mismatch: expected {length}, got {}",
                utf16_len(payload)
            )));
        }
        payloads.push(payload.to_string());
        index += 2;
    }
    Ok(payloads)
}
