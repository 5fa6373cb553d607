use crate::traits::handler::{Headers, SocketHandler};
use parking_lot::Mutex;
use std::sync::Arc;

/// Headers map shared between a connection and all of its sockets.
pub type SharedHeaders = Arc<Mutex<Headers>>;

/// A handle to one multiplexed namespace: the namespace string (empty for
/// the default namespace), the callback sink, and a reference to the
/// headers shared with the owning connection.
///
/// Created by user code and registered with a
/// [`ConnectionRegistry`](crate::registry::ConnectionRegistry), which
/// resolves or creates the connection for the origin.
pub struct NamespaceSocket {
    namespace: String,
    handler: Arc<dyn SocketHandler>,
    headers: Mutex<SharedHeaders>,
}

impl NamespaceSocket {
    /// Create a socket for `namespace` with no extra request headers.
    pub fn new(namespace: impl Into<String>, handler: Arc<dyn SocketHandler>) -> Arc<Self> {
        Self::with_headers(namespace, handler, Headers::new())
    }

    /// Create a socket with custom request headers. When this socket is the
    /// first for its origin, its headers become the connection's.
    pub fn with_headers(
        namespace: impl Into<String>,
        handler: Arc<dyn SocketHandler>,
        headers: Headers,
    ) -> Arc<Self> {
        Arc::new(Self {
            namespace: namespace.into(),
            handler,
            headers: Mutex::new(Arc::new(Mutex::new(headers))),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn handler(&self) -> Arc<dyn SocketHandler> {
        Arc::clone(&self.handler)
    }

    /// The headers map this socket currently shares.
    pub fn headers(&self) -> SharedHeaders {
        Arc::clone(&self.headers.lock())
    }

    /// Registration rebinds the socket to the connection's shared map.
    pub(crate) fn adopt_headers(&self, shared: SharedHeaders) {
        *self.headers.lock() = shared;
    }
}
