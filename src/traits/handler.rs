use crate::core::ack::RemoteAck;
use crate::core::connection_state::ConnectionState;
use crate::traits::error::{Result, RetroSockError};
use serde_json::Value;
use std::collections::HashMap;

/// Custom request headers sent with the handshake and shared by every
/// namespace socket of a connection.
pub type Headers = HashMap<String, String>;

/// Callback sink for one namespace socket.
///
/// Implement this trait to receive the lifecycle and message events of a
/// namespace. Every method has a no-op default, so implementations only
/// override what they care about.
///
/// The fallible methods return a [`Result`]: an `Err` is treated as a
/// connection fault, delivered to every namespace via [`on_error`] and
/// followed by connection shutdown.
///
/// [`on_error`]: SocketHandler::on_error
pub trait SocketHandler: Send + Sync {
    /// The namespace has been joined on the server.
    fn on_connect(&self) -> Result<()> {
        Ok(())
    }

    /// The namespace has been disconnected.
    fn on_disconnect(&self) -> Result<()> {
        Ok(())
    }

    /// A plain text message arrived. `ack` is present when the server
    /// requested an acknowledgement.
    fn on_message(&self, _text: &str, _ack: Option<RemoteAck>) -> Result<()> {
        Ok(())
    }

    /// A JSON message arrived. `json` is `None` when the payload was the
    /// literal string `null`.
    fn on_json(&self, _json: Option<Value>, _ack: Option<RemoteAck>) -> Result<()> {
        Ok(())
    }

    /// A named event arrived with positional arguments.
    fn on_event(&self, _name: &str, _ack: Option<RemoteAck>, _args: Vec<Value>) -> Result<()> {
        Ok(())
    }

    /// A fault occurred on the connection. After this the connection is
    /// permanently invalid.
    fn on_error(&self, _error: &RetroSockError) {}

    /// The handshake assigned a session id.
    fn on_session_id(&self, _session_id: &str) {}

    /// The connection state changed.
    fn on_state(&self, _state: ConnectionState) {}
}

/// A handler that ignores every event. Useful for testing or fire-and-forget
/// sockets.
pub struct NoOpHandler;

impl SocketHandler for NoOpHandler {}
