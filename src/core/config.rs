use crate::traits::json::{JsonCodec, SerdeJsonCodec};
use crate::traits::transport::TransportFactory;
use crate::transports::DefaultTransportFactory;
use std::sync::Arc;
use std::time::Duration;

/// Timing configuration for a connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Handshake connect timeout.
    pub connect_timeout: Duration,
    /// Handshake read timeout.
    pub read_timeout: Duration,
    /// Delay before a requested reconnect attempt runs.
    pub reconnect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(10_000),
            read_timeout: Duration::from_millis(10_000),
            reconnect_delay: Duration::from_millis(1_000),
        }
    }
}

/// Everything a registry needs to construct a new connection: timing
/// configuration plus the pluggable transport factory and JSON codec.
#[derive(Clone)]
pub struct ConnectOptions {
    pub config: ConnectionConfig,
    pub factory: Arc<dyn TransportFactory>,
    pub codec: Arc<dyn JsonCodec>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            config: ConnectionConfig::default(),
            factory: Arc::new(DefaultTransportFactory),
            codec: Arc::new(SerdeJsonCodec),
        }
    }
}
