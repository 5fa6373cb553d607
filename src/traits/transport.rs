use crate::core::connection::Connection;
use crate::traits::error::Result;
use reqwest::Url;
use std::sync::{Arc, Weak};

/// Contract between the connection and a concrete transport.
///
/// A transport is connected once and then owned by the connection until it is
/// disconnected or invalidated. After a successful `connect` the transport
/// drives the connection through its public upcalls, in lifecycle order:
/// [`transport_connected`], zero or more [`transport_data`] /
/// [`transport_message`], and terminally either [`transport_disconnected`] or
/// [`transport_error`].
///
/// Transports must never invoke an upcall from inside `send` or `send_bulk`;
/// failures there are reported through the returned `Result` (the frame is
/// re-buffered) and the transport's own reader reports the terminal error
/// asynchronously.
///
/// [`transport_connected`]: Connection::transport_connected
/// [`transport_data`]: Connection::transport_data
/// [`transport_message`]: Connection::transport_message
/// [`transport_disconnected`]: Connection::transport_disconnected
/// [`transport_error`]: Connection::transport_error
pub trait Transport: Send + Sync {
    /// The protocol name this transport registers as during handshake
    /// negotiation, e.g. `"websocket"`.
    fn name(&self) -> &'static str;

    /// Establish the transport. On success the transport calls
    /// `transport_connected` on the connection and starts delivering inbound
    /// frames.
    fn connect(&self) -> Result<()>;

    /// Shut the transport down gracefully.
    fn disconnect(&self);

    /// Drop the transport without a graceful shutdown, used for forced
    /// reconnects. No further upcalls may be made after this.
    fn invalidate(&self);

    /// Send a single encoded frame.
    fn send(&self, text: &str) -> Result<()>;

    /// Whether [`send_bulk`](Transport::send_bulk) is supported.
    fn can_send_bulk(&self) -> bool {
        false
    }

    /// Send several frames in one round trip. Only called when
    /// `can_send_bulk` returns true.
    fn send_bulk(&self, _texts: &[String]) -> Result<()> {
        Err(crate::traits::error::RetroSockError::new(
            "transport does not support bulk sending",
        ))
    }
}

/// Factory for transports, consulted during transport selection.
///
/// The connection asks for each client-supported protocol name in preference
/// order; returning `None` skips that protocol. The default factory supplies
/// the bundled WebSocket and XHR long-poll transports; tests and embedders
/// can swap in their own.
pub trait TransportFactory: Send + Sync {
    /// Create a transport for `name`, or `None` if this factory does not
    /// provide it. `connection` is a non-owning back-reference for upcalls.
    fn create(
        &self,
        name: &str,
        origin: &Url,
        connection: Weak<Connection>,
    ) -> Option<Arc<dyn Transport>>;
}
