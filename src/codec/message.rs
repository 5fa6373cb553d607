use crate::traits::error::{Result, RetroSockError};
use std::fmt;
use std::str::FromStr;

/// Message type codes of the 0.9 wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Disconnect,
    Connect,
    Heartbeat,
    Text,
    Json,
    Event,
    Ack,
    Error,
    Noop,
}

impl MessageKind {
    fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::Disconnect),
            '1' => Some(Self::Connect),
            '2' => Some(Self::Heartbeat),
            '3' => Some(Self::Text),
            '4' => Some(Self::Json),
            '5' => Some(Self::Event),
            '6' => Some(Self::Ack),
            '7' => Some(Self::Error),
            '8' => Some(Self::Noop),
            _ => None,
        }
    }

    fn digit(self) -> char {
        match self {
            Self::Disconnect => '0',
            Self::Connect => '1',
            Self::Heartbeat => '2',
            Self::Text => '3',
            Self::Json => '4',
            Self::Event => '5',
            Self::Ack => '6',
            Self::Error => '7',
            Self::Noop => '8',
        }
    }
}

/// One decoded wire frame: `type:id:endpoint:data`.
///
/// The id is kept as a string; a trailing `+` requests an acknowledgement
/// from the receiver. The data field is opaque to the codec: JSON-bearing
/// message kinds carry their payload uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub id: String,
    pub endpoint: String,
    pub data: String,
}

impl Message {
    /// Create a message without an id.
    pub fn new(kind: MessageKind, endpoint: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind,
            id: String::new(),
            endpoint: endpoint.into(),
            data: data.into(),
        }
    }

    /// Whether the sender asked for an acknowledgement.
    pub fn wants_ack(&self) -> bool {
        !self.id.is_empty()
    }
}

impl FromStr for Message {
    type Err = RetroSockError;

    /// Split at most three times on `:`; the data field may itself contain
    /// colons. Missing trailing fields parse as empty.
    fn from_str(text: &str) -> Result<Self> {
        let mut fields = text.splitn(4, ':');
        let kind_field = fields.next().unwrap_or("");
        let mut chars = kind_field.chars();
        let kind = match (chars.next().and_then(MessageKind::from_digit), chars.next()) {
            (Some(kind), None) => kind,
            _ => {
                return Err(RetroSockError::new(format!(
                    "invalid message type: {text:?}"
                )))
            }
        };
        Ok(Self {
            kind,
            id: fields.next().unwrap_or("").to_string(),
            endpoint: fields.next().unwrap_or("").to_string(),
            data: fields.next().unwrap_or("").to_string(),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.digit(), self.id, self.endpoint)?;
        if !self.data.is_empty() {
            write!(f, ":{}", self.data)?;
        }
        Ok(())
    }
}
