//! Core traits and types for the retrosock client.
//!
//! The fundamental abstractions consumed and produced by the connection:
//!
//! - **SocketHandler**: per-namespace callback sink
//! - **Transport** / **TransportFactory**: the pluggable wire transports
//! - **JsonCodec**: pluggable JSON encoding for messages, events and acks
//! - **RetroSockError**: the single fault category

pub mod error;
pub mod handler;
pub mod json;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, RetroSockError};
pub use handler::{Headers, NoOpHandler, SocketHandler};
pub use json::{JsonCodec, SerdeJsonCodec};
pub use transport::{Transport, TransportFactory};
