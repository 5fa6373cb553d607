//! # retrosock
//!
//! A client for the Socket.IO 0.9 wire protocol: one long-lived session per
//! origin, multiplexing any number of logical namespace sockets over a
//! single interchangeable transport (WebSocket or XHR long-poll).
//!
//! ## Features
//!
//! - **Out-of-band handshake**: session id, timeouts and transport list
//!   negotiated over plain HTTP before the transport comes up
//! - **Namespace multiplexing**: one transport, many namespace sockets,
//!   deduplicated per origin by a process-wide registry
//! - **Acknowledgements**: both directions, matched by monotonic ids
//! - **Heartbeat watchdog**: the session dies loudly when the server goes
//!   silent; heartbeats are echoed immediately
//! - **Outage buffering**: frames submitted while the transport is down are
//!   flushed, in order, once it comes back
//! - **Modular design**: pluggable transports and JSON codec
//!
//! ## Example
//!
//! ```rust,ignore
//! use retrosock::{ConnectionRegistry, NamespaceSocket, SocketHandler};
//! use std::sync::Arc;
//!
//! struct Chat;
//!
//! impl SocketHandler for Chat {
//!     fn on_event(
//!         &self,
//!         name: &str,
//!         ack: Option<retrosock::RemoteAck>,
//!         args: Vec<serde_json::Value>,
//!     ) -> retrosock::Result<()> {
//!         println!("{name}: {args:?}");
//!         if let Some(ack) = ack {
//!             ack.ack(&[serde_json::json!(true)]);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let socket = NamespaceSocket::new("/chat", Arc::new(Chat));
//! let connection = ConnectionRegistry::global()
//!     .register("http://localhost:8080", socket.clone())?;
//! connection.emit(&socket, "hello", None, vec![serde_json::json!("world")]);
//! ```

pub mod codec;
pub mod core;
pub mod registry;
pub mod traits;
pub mod transports;

// Re-export the user-facing surface
pub use crate::codec::{Message, MessageKind};
pub use crate::core::{
    set_tls_config, AckCallback, ConnectOptions, Connection, ConnectionConfig, ConnectionState,
    NamespaceSocket, RemoteAck, TlsConfig,
};
pub use crate::registry::ConnectionRegistry;
pub use crate::traits::{
    Headers, JsonCodec, NoOpHandler, Result, RetroSockError, SerdeJsonCodec, SocketHandler,
    Transport, TransportFactory,
};
pub use crate::transports::DefaultTransportFactory;
