//! The connection core: state machine, handshake driver, send buffering,
//! heartbeat watchdog, acknowledgements and namespace sockets.

pub mod ack;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod connection_state;
pub mod handshake;
pub mod socket;
pub mod timer;
pub mod tls;

pub use ack::{AckCallback, RemoteAck};
pub use config::{ConnectOptions, ConnectionConfig};
pub use connection::Connection;
pub use connection_state::{AtomicConnectionState, ConnectionState};
pub use handshake::HandshakeReply;
pub use socket::{NamespaceSocket, SharedHeaders};
pub use tls::{set_tls_config, TlsConfig};
