//! Process-wide mapping from origin URL to live connections.
//!
//! The registry deduplicates connections: a new namespace socket joins the
//! first connection of its origin that does not already carry its
//! namespace, and only gets a fresh connection when none can take it.

use crate::core::config::ConnectOptions;
use crate::core::connection::Connection;
use crate::core::socket::NamespaceSocket;
use crate::traits::error::{Result, RetroSockError};
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static GLOBAL: OnceLock<Arc<ConnectionRegistry>> = OnceLock::new();

/// Registry of connections keyed by origin string.
///
/// Most applications use the process-wide [`global`](ConnectionRegistry::global)
/// instance; tests and embedders that want isolation construct their own.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Vec<Arc<Connection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// The process-wide default registry.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Self::new()))
    }

    /// Register a socket for `origin` with default options.
    ///
    /// Returns the connection now carrying the socket: an existing one when
    /// its namespace was free there, a freshly created one otherwise.
    pub fn register(
        self: &Arc<Self>,
        origin: &str,
        socket: Arc<NamespaceSocket>,
    ) -> Result<Arc<Connection>> {
        self.register_with(origin, socket, ConnectOptions::default())
    }

    /// Register a socket with explicit timing, transport factory and codec
    /// options. Options only apply when a new connection is created.
    pub fn register_with(
        self: &Arc<Self>,
        origin: &str,
        socket: Arc<NamespaceSocket>,
        options: ConnectOptions,
    ) -> Result<Arc<Connection>> {
        let url: Url = origin
            .parse()
            .map_err(|e| RetroSockError::with_cause(format!("invalid origin URL: {origin}"), e))?;
        let mut connections = self.connections.lock();
        let list = connections.entry(origin.to_string()).or_default();
        for connection in list.iter() {
            if connection.register(&socket) {
                return Ok(Arc::clone(connection));
            }
        }
        debug!(
            "creating connection for {origin} (namespace {:?})",
            socket.namespace()
        );
        let connection = Connection::open(url, origin.to_string(), socket, Arc::clone(self), options);
        list.push(Arc::clone(&connection));
        Ok(connection)
    }

    /// Drop a connection from its origin's list; the origin entry goes away
    /// with its last connection.
    pub(crate) fn remove(&self, origin: &str, connection: &Arc<Connection>) {
        let mut connections = self.connections.lock();
        if let Some(list) = connections.get_mut(origin) {
            list.retain(|candidate| !Arc::ptr_eq(candidate, connection));
            if list.is_empty() {
                connections.remove(origin);
            }
        }
    }

    /// Number of live connections for an origin.
    pub fn connection_count(&self, origin: &str) -> usize {
        self.connections
            .lock()
            .get(origin)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
