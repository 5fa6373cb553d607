//! Wire codec for the 0.9 protocol: the line-oriented message format and the
//! framed-datagram wrapper used over transports that cannot preserve message
//! boundaries.

pub mod framing;
pub mod message;

pub use framing::FRAME_DELIMITER;
pub use message::{Message, MessageKind};
