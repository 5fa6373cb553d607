use crate::codec::framing;
use crate::codec::message::{Message, MessageKind};
use crate::core::ack::{AckCallback, RemoteAck};
use crate::core::buffer::SendBuffer;
use crate::core::config::{ConnectOptions, ConnectionConfig};
use crate::core::connection_state::{AtomicConnectionState, ConnectionState};
use crate::core::handshake;
use crate::core::socket::{NamespaceSocket, SharedHeaders};
use crate::core::timer::{self, TaskHandle, Watchdog};
use crate::registry::ConnectionRegistry;
use crate::traits::error::RetroSockError;
use crate::traits::json::JsonCodec;
use crate::traits::transport::{Transport, TransportFactory};
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transport protocols this client implements, in preference order.
const CLIENT_TRANSPORTS: [&str; 2] = ["websocket", "xhr-polling"];

/// Header key the session id is injected under after handshake.
const SESSION_ID_HEADER: &str = "sessionId";

const KEEPALIVE_FRAME: &str = "2::";

/// Mutable connection state, guarded by the per-connection monitor.
struct Inner {
    session_id: Option<String>,
    heartbeat_timeout: Duration,
    closing_timeout: Duration,
    server_transports: Vec<String>,
    transport: Option<Arc<dyn Transport>>,
    sockets: HashMap<String, Arc<NamespaceSocket>>,
    acks: HashMap<u32, AckCallback>,
    next_ack_id: u32,
    /// The socket that triggered creation. The server never replies to the
    /// implicit CONNECT of the very first, default-namespace socket; this
    /// slot drives the short-circuit for its first `1::` frame.
    first_socket: Option<Arc<NamespaceSocket>>,
    keepalive_queued: bool,
    reconnect_task: Option<TaskHandle>,
    last_error: Option<RetroSockError>,
}

/// One multiplexed session to a Socket.IO 0.9 origin.
///
/// A connection performs the out-of-band handshake, negotiates and owns a
/// transport, multiplexes namespace sockets over it, matches
/// acknowledgements, runs the heartbeat watchdog, and buffers outbound
/// frames across transport outages. Connections are created through a
/// [`ConnectionRegistry`], never directly.
///
/// Transport loss does not trigger an automatic reconnect: the connection
/// stays `Interrupted` until the embedder calls [`reconnect`], typically
/// from a platform network-change notification.
///
/// [`reconnect`]: Connection::reconnect
pub struct Connection {
    url: Url,
    url_str: String,
    config: ConnectionConfig,
    registry: Arc<ConnectionRegistry>,
    codec: Arc<dyn JsonCodec>,
    factory: Arc<dyn TransportFactory>,
    headers: SharedHeaders,
    state: AtomicConnectionState,
    buffer: SendBuffer,
    watchdog: Watchdog,
    inner: Mutex<Inner>,
    weak: Weak<Connection>,
}

impl Connection {
    /// Create a connection for `socket` and spawn the connect worker that
    /// drives handshake and transport establishment.
    pub(crate) fn open(
        url: Url,
        url_str: String,
        socket: Arc<NamespaceSocket>,
        registry: Arc<ConnectionRegistry>,
        options: ConnectOptions,
    ) -> Arc<Self> {
        let connection = Arc::new_cyclic(|weak: &Weak<Connection>| {
            let watchdog_ref = weak.clone();
            let watchdog = Watchdog::spawn(move || {
                if let Some(connection) = watchdog_ref.upgrade() {
                    connection.heartbeat_timed_out();
                }
            });
            let mut sockets = HashMap::new();
            sockets.insert(socket.namespace().to_string(), Arc::clone(&socket));
            Connection {
                url,
                url_str,
                config: options.config,
                registry,
                codec: options.codec,
                factory: options.factory,
                headers: socket.headers(),
                state: AtomicConnectionState::new(ConnectionState::Init),
                buffer: SendBuffer::new(),
                watchdog,
                inner: Mutex::new(Inner {
                    session_id: None,
                    heartbeat_timeout: Duration::ZERO,
                    closing_timeout: Duration::ZERO,
                    server_transports: Vec::new(),
                    transport: None,
                    sockets,
                    acks: HashMap::new(),
                    next_ack_id: 1,
                    first_socket: Some(socket),
                    keepalive_queued: false,
                    reconnect_task: None,
                    last_error: None,
                }),
                weak: weak.clone(),
            }
        });

        let worker = Arc::clone(&connection);
        thread::spawn(move || {
            if worker.is_connected() {
                warn!("already connected, not attempting to connect");
                return;
            }
            if worker.state.get() == ConnectionState::Init && !worker.run_handshake() {
                return;
            }
            worker.connect_transport();
        });
        connection
    }

    /// The origin URL of this connection.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The session id assigned by the server, once handshaken.
    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_ready()
    }

    // ---- registration ----------------------------------------------------

    /// Attach a socket to this connection. Refuses (returning false) when
    /// the namespace is already registered or the connection is invalid.
    /// The socket inherits the connection's headers and a CONNECT frame is
    /// transmitted for its namespace (buffered until ready).
    pub fn register(&self, socket: &Arc<NamespaceSocket>) -> bool {
        let mut inner = self.inner.lock();
        if self.state.is_invalid() {
            return false;
        }
        let namespace = socket.namespace().to_string();
        if inner.sockets.contains_key(&namespace) {
            return false;
        }
        inner.sockets.insert(namespace.clone(), Arc::clone(socket));
        socket.adopt_headers(Arc::clone(&self.headers));
        let frame = Message::new(MessageKind::Connect, namespace, "").to_string();
        self.send_plain_locked(&mut inner, frame);
        true
    }

    /// Detach a socket: transmit the namespace disconnect, fire its
    /// `on_disconnect`, and shut the whole connection down when no
    /// namespaces remain.
    pub fn unregister(&self, socket: &Arc<NamespaceSocket>) {
        let (removed, empty) = {
            let mut inner = self.inner.lock();
            let frame = Message::new(MessageKind::Disconnect, socket.namespace(), "").to_string();
            self.send_plain_locked(&mut inner, frame);
            let removed = inner.sockets.remove(socket.namespace());
            (removed, inner.sockets.is_empty())
        };
        if let Some(socket) = removed {
            if let Err(e) = socket.handler().on_disconnect() {
                self.fault(RetroSockError::with_cause("error in on_disconnect handler", e));
                return;
            }
        }
        if empty {
            self.cleanup();
        }
    }

    // ---- outbound --------------------------------------------------------

    /// Send a plain text message for `socket`'s namespace. Supplying `ack`
    /// requests a server acknowledgement.
    pub fn send(&self, socket: &NamespaceSocket, ack: Option<AckCallback>, text: &str) {
        let mut message = Message::new(MessageKind::Text, socket.namespace(), text);
        let mut inner = self.inner.lock();
        self.synthesize_ack_locked(&mut inner, &mut message, ack);
        self.send_plain_locked(&mut inner, message.to_string());
    }

    /// Send a JSON message for `socket`'s namespace.
    pub fn send_json(&self, socket: &NamespaceSocket, ack: Option<AckCallback>, value: &Value) {
        let payload = match self.codec.encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.fault(RetroSockError::with_cause(
                    "error while encoding a JSON message",
                    e,
                ));
                return;
            }
        };
        let mut message = Message::new(MessageKind::Json, socket.namespace(), payload);
        let mut inner = self.inner.lock();
        self.synthesize_ack_locked(&mut inner, &mut message, ack);
        self.send_plain_locked(&mut inner, message.to_string());
    }

    /// Emit a named event with positional arguments for `socket`'s
    /// namespace.
    pub fn emit(
        &self,
        socket: &NamespaceSocket,
        event: &str,
        ack: Option<AckCallback>,
        args: Vec<Value>,
    ) {
        let mut envelope = Map::new();
        envelope.insert("name".to_string(), Value::String(event.to_string()));
        envelope.insert("args".to_string(), Value::Array(args));
        let payload = match self.codec.encode(&Value::Object(envelope)) {
            Ok(payload) => payload,
            Err(e) => {
                self.fault(RetroSockError::with_cause("error while emitting an event", e));
                return;
            }
        };
        let mut message = Message::new(MessageKind::Event, socket.namespace(), payload);
        let mut inner = self.inner.lock();
        self.synthesize_ack_locked(&mut inner, &mut message, ack);
        self.send_plain_locked(&mut inner, message.to_string());
    }

    /// Force a reconnect: the current transport is invalidated without a
    /// graceful disconnect and a fresh transport attempt is scheduled after
    /// the configured delay. Useful when the platform knows the network
    /// changed underneath a TCP connection that never noticed.
    pub fn reconnect(&self) {
        if self.state.is_invalid() {
            return;
        }
        let listeners = {
            let mut inner = self.inner.lock();
            if let Some(transport) = inner.transport.take() {
                transport.invalidate();
            }
            let listeners = self.set_state_locked(&inner, ConnectionState::Interrupted);
            if let Some(task) = inner.reconnect_task.take() {
                task.cancel();
            }
            let connection = self.weak.clone();
            inner.reconnect_task = Some(timer::schedule(self.config.reconnect_delay, move || {
                if let Some(connection) = connection.upgrade() {
                    connection.connect_transport();
                    connection.queue_keepalive();
                }
            }));
            listeners
        };
        self.notify_state(listeners, ConnectionState::Interrupted);
    }

    // ---- transport upcalls -----------------------------------------------

    /// The transport is established: flush buffered frames and start the
    /// heartbeat watchdog.
    pub fn transport_connected(&self) {
        let listeners = {
            let mut inner = self.inner.lock();
            let listeners = self.set_state_locked(&inner, ConnectionState::Ready);
            if let Some(task) = inner.reconnect_task.take() {
                task.cancel();
            }
            self.arm_watchdog_locked(&inner);
            self.flush_locked(&mut inner);
            inner.keepalive_queued = false;
            listeners
        };
        self.notify_state(listeners, ConnectionState::Ready);
    }

    /// The transport shut down cleanly.
    pub fn transport_disconnected(&self) {
        let listeners = {
            let mut inner = self.inner.lock();
            inner.last_error = None;
            self.set_state_locked(&inner, ConnectionState::Interrupted)
        };
        self.notify_state(listeners, ConnectionState::Interrupted);
    }

    /// The transport failed and is no longer usable.
    pub fn transport_error(&self, error: RetroSockError) {
        warn!("transport error: {error}");
        let listeners = {
            let mut inner = self.inner.lock();
            inner.last_error = Some(error);
            self.set_state_locked(&inner, ConnectionState::Interrupted)
        };
        self.notify_state(listeners, ConnectionState::Interrupted);
    }

    /// Raw data from a transport that does not preserve message boundaries.
    /// Unframed text is a single message.
    pub fn transport_data(&self, text: &str) {
        if !framing::is_framed(text) {
            self.transport_message(text);
            return;
        }
        match framing::decode(text) {
            Ok(payloads) => {
                for payload in payloads {
                    self.transport_message(&payload);
                }
            }
            Err(e) => {
                self.fault(RetroSockError::with_cause(
                    format!("Garbage from server: {text}"),
                    e,
                ));
            }
        }
    }

    /// One decoded frame from the transport.
    pub fn transport_message(&self, text: &str) {
        debug!("< {text}");
        let message: Message = match text.parse() {
            Ok(message) => message,
            Err(e) => {
                self.fault(RetroSockError::with_cause(
                    format!("Garbage from server: {text}"),
                    e,
                ));
                return;
            }
        };
        {
            let inner = self.inner.lock();
            self.arm_watchdog_locked(&inner);
        }
        self.dispatch(&message);
    }

    // ---- dispatch --------------------------------------------------------

    fn dispatch(&self, message: &Message) {
        match message.kind {
            MessageKind::Disconnect => self.dispatch_disconnect(message),
            MessageKind::Connect => self.dispatch_connect(message),
            MessageKind::Heartbeat => self.send_plain(KEEPALIVE_FRAME.to_string()),
            MessageKind::Text => self.dispatch_text(message),
            MessageKind::Json => self.dispatch_json(message),
            MessageKind::Event => self.dispatch_event(message),
            MessageKind::Ack => self.dispatch_ack(message),
            MessageKind::Error => self.dispatch_error(message),
            MessageKind::Noop => {}
        }
    }

    /// Resolve the sockets an inbound message targets. The empty endpoint
    /// addresses the connection itself, which fans out to every namespace
    /// for messages and events but only to the default namespace for
    /// connect/disconnect. A missing registration is a fault.
    fn targets_locked(
        &self,
        inner: &Inner,
        endpoint: &str,
        default_namespace_only: bool,
    ) -> Result<Vec<Arc<NamespaceSocket>>, RetroSockError> {
        if endpoint.is_empty() {
            if default_namespace_only {
                Ok(inner.sockets.get("").cloned().into_iter().collect())
            } else {
                Ok(inner.sockets.values().cloned().collect())
            }
        } else {
            inner
                .sockets
                .get(endpoint)
                .cloned()
                .map(|socket| vec![socket])
                .ok_or_else(|| {
                    RetroSockError::new(format!("cannot find socket for {endpoint:?}"))
                })
        }
    }

    fn targets(
        &self,
        endpoint: &str,
        default_namespace_only: bool,
    ) -> Result<Vec<Arc<NamespaceSocket>>, RetroSockError> {
        let inner = self.inner.lock();
        self.targets_locked(&inner, endpoint, default_namespace_only)
    }

    fn dispatch_disconnect(&self, message: &Message) {
        let targets = match self.targets(&message.endpoint, true) {
            Ok(targets) => targets,
            Err(e) => return self.fault(e),
        };
        for socket in targets {
            if let Err(e) = socket.handler().on_disconnect() {
                return self.fault(RetroSockError::with_cause(
                    "error in on_disconnect handler",
                    e,
                ));
            }
        }
        if message.data.ends_with("+0") {
            self.cleanup();
        }
    }

    fn dispatch_connect(&self, message: &Message) {
        let targets = {
            let mut inner = self.inner.lock();
            let first = inner.first_socket.take();
            match first {
                Some(first) if message.endpoint.is_empty() => {
                    if first.namespace().is_empty() {
                        Ok(vec![first])
                    } else {
                        // The server's reply covers the implicit default
                        // namespace only; announce the real namespace and
                        // wait for its own reply.
                        let frame =
                            Message::new(MessageKind::Connect, first.namespace(), "").to_string();
                        self.send_plain_locked(&mut inner, frame);
                        Ok(Vec::new())
                    }
                }
                _ => self.targets_locked(&inner, &message.endpoint, true),
            }
        };
        let targets = match targets {
            Ok(targets) => targets,
            Err(e) => return self.fault(e),
        };
        for socket in targets {
            if let Err(e) = socket.handler().on_connect() {
                return self.fault(RetroSockError::with_cause("error in on_connect handler", e));
            }
        }
    }

    fn dispatch_text(&self, message: &Message) {
        let targets = match self.targets(&message.endpoint, false) {
            Ok(targets) => targets,
            Err(e) => return self.fault(e),
        };
        let ack = RemoteAck::for_message(self.weak.clone(), message);
        for socket in targets {
            if let Err(e) = socket.handler().on_message(&message.data, ack.clone()) {
                return self.fault(RetroSockError::with_cause("error in on_message handler", e));
            }
        }
    }

    fn dispatch_json(&self, message: &Message) {
        let value = if message.data.trim() == "null" {
            None
        } else {
            match self.codec.decode(&message.data) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("malformed JSON message payload: {e}");
                    return;
                }
            }
        };
        let targets = match self.targets(&message.endpoint, false) {
            Ok(targets) => targets,
            Err(e) => return self.fault(e),
        };
        let ack = RemoteAck::for_message(self.weak.clone(), message);
        for socket in targets {
            if let Err(e) = socket.handler().on_json(value.clone(), ack.clone()) {
                return self.fault(RetroSockError::with_cause("error in on_json handler", e));
            }
        }
    }

    fn dispatch_event(&self, message: &Message) {
        let Ok(Value::Object(event)) = self.codec.decode(&message.data) else {
            warn!("malformed event payload: {}", message.data);
            return;
        };
        let Some(name) = event.get("name").and_then(Value::as_str) else {
            warn!("event payload without a name: {}", message.data);
            return;
        };
        let args = match event.get("args") {
            Some(Value::Array(args)) => args.clone(),
            _ => Vec::new(),
        };
        let targets = match self.targets(&message.endpoint, false) {
            Ok(targets) => targets,
            Err(e) => return self.fault(e),
        };
        let ack = RemoteAck::for_message(self.weak.clone(), message);
        for socket in targets {
            if let Err(e) = socket.handler().on_event(name, ack.clone(), args.clone()) {
                return self.fault(RetroSockError::with_cause("error in on_event handler", e));
            }
        }
    }

    fn dispatch_ack(&self, message: &Message) {
        let mut halves = message.data.splitn(2, '+');
        let id_field = halves.next().unwrap_or("");
        let Some(payload) = halves.next() else {
            // Bare id without arguments: echo an empty acknowledgement.
            self.send_plain(format!("6:::{id_field}"));
            return;
        };
        let Ok(id) = id_field.parse::<u32>() else {
            warn!("received malformed acknowledge id: {}", message.data);
            return;
        };
        let args = match self.codec.decode(payload) {
            Ok(Value::Array(args)) => args,
            Ok(_) | Err(_) => {
                warn!("received malformed acknowledge data: {}", message.data);
                return;
            }
        };
        let callback = self.inner.lock().acks.remove(&id);
        match callback {
            Some(callback) => callback(args),
            None => warn!("received unknown ack packet: {id}"),
        }
    }

    fn dispatch_error(&self, message: &Message) {
        let targets = match self.targets(&message.endpoint, false) {
            Ok(targets) => targets,
            Err(e) => return self.fault(e),
        };
        let error = RetroSockError::new(message.data.clone());
        for socket in targets {
            socket.handler().on_error(&error);
        }
        if message.data.ends_with("+0") {
            // The server advised us to stop reconnecting.
            self.cleanup();
        }
    }

    // ---- internals -------------------------------------------------------

    fn run_handshake(&self) -> bool {
        self.set_state(ConnectionState::Handshake);
        let headers_snapshot = self.headers.lock().clone();
        match handshake::perform(&self.url, &headers_snapshot, &self.config) {
            Ok(reply) => {
                debug!(
                    "handshake complete: session {} heartbeat {:?} closing {:?} transports {:?}",
                    reply.session_id, reply.heartbeat_timeout, reply.closing_timeout,
                    reply.transports
                );
                let listeners = {
                    let mut inner = self.inner.lock();
                    inner.session_id = Some(reply.session_id.clone());
                    inner.heartbeat_timeout = reply.heartbeat_timeout;
                    inner.closing_timeout = reply.closing_timeout;
                    inner.server_transports = reply.transports;
                    inner.sockets.values().cloned().collect::<Vec<_>>()
                };
                // The server expects the session id on every subsequent
                // request of this session.
                self.headers
                    .lock()
                    .insert(SESSION_ID_HEADER.to_string(), reply.session_id.clone());
                for socket in listeners {
                    socket.handler().on_session_id(&reply.session_id);
                }
                true
            }
            Err(e) => {
                self.fault(RetroSockError::with_cause("error while handshaking", e));
                false
            }
        }
    }

    /// Pick and connect a transport from the server-advertised list.
    pub(crate) fn connect_transport(&self) {
        if self.state.is_invalid() {
            return;
        }
        let (transport, listeners) = {
            let mut inner = self.inner.lock();
            let listeners = self.set_state_locked(&inner, ConnectionState::Connecting);
            let mut chosen = None;
            for name in CLIENT_TRANSPORTS {
                if inner.server_transports.iter().any(|t| t == name) {
                    if let Some(transport) = self.factory.create(name, &self.url, self.weak.clone())
                    {
                        chosen = Some(transport);
                        break;
                    }
                }
            }
            if let Some(transport) = &chosen {
                inner.transport = Some(Arc::clone(transport));
            }
            (chosen, listeners)
        };
        self.notify_state(listeners, ConnectionState::Connecting);
        let Some(transport) = transport else {
            self.fault(RetroSockError::new(
                "Server supports no available transports. You should reconfigure the server to support an available transport",
            ));
            return;
        };
        info!("connecting {} transport to {}", transport.name(), self.url_str);
        if let Err(e) = transport.connect() {
            self.transport_error(e);
        }
    }

    /// Single internal send primitive: hand to the transport while ready,
    /// buffer otherwise. A transport send failure re-buffers the frame; the
    /// transport reports the terminal error through its own path.
    fn send_plain_locked(&self, inner: &mut Inner, frame: String) {
        if self.state.is_ready() {
            if let Some(transport) = inner.transport.clone() {
                debug!("> {frame}");
                if let Err(e) = transport.send(&frame) {
                    debug!("send failed, buffering frame: {e}");
                    self.buffer.push(frame);
                }
                return;
            }
        }
        self.buffer.push(frame);
    }

    fn send_plain(&self, frame: String) {
        let mut inner = self.inner.lock();
        self.send_plain_locked(&mut inner, frame);
    }

    /// Drain the pending buffer into a freshly connected transport.
    fn flush_locked(&self, inner: &mut Inner) {
        let Some(transport) = inner.transport.clone() else {
            return;
        };
        if transport.can_send_bulk() {
            let frames = self.buffer.take_snapshot();
            if frames.is_empty() {
                return;
            }
            for frame in &frames {
                debug!("> {frame}");
            }
            if let Err(e) = transport.send_bulk(&frames) {
                debug!("bulk flush failed, restoring buffer: {e}");
                self.buffer.restore(frames);
            }
        } else {
            // Drain a snapshot rather than popping live: a failing send
            // re-buffers its frame, which must not be picked up again by
            // this same flush.
            for frame in self.buffer.take_snapshot() {
                self.send_plain_locked(inner, frame);
            }
        }
    }

    fn synthesize_ack_locked(
        &self,
        inner: &mut Inner,
        message: &mut Message,
        ack: Option<AckCallback>,
    ) {
        if let Some(ack) = ack {
            let id = inner.next_ack_id;
            inner.next_ack_id += 1;
            inner.acks.insert(id, ack);
            message.id = format!("{id}+");
        }
    }

    /// Emit the ack frame for an inbound message (see [`RemoteAck`]).
    pub(crate) fn send_remote_ack(&self, endpoint: &str, id: &str, args: &[Value]) {
        let payload = match self.codec.encode(&Value::Array(args.to_vec())) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode acknowledge arguments: {e}");
                return;
            }
        };
        let frame = Message::new(MessageKind::Ack, endpoint, format!("{id}{payload}")).to_string();
        self.send_plain(frame);
    }

    fn queue_keepalive(&self) {
        let mut inner = self.inner.lock();
        if !inner.keepalive_queued {
            self.send_plain_locked(&mut inner, KEEPALIVE_FRAME.to_string());
            inner.keepalive_queued = true;
        }
    }

    fn arm_watchdog_locked(&self, inner: &Inner) {
        if !self.state.is_invalid() {
            self.watchdog
                .arm(inner.closing_timeout + inner.heartbeat_timeout);
        }
    }

    fn heartbeat_timed_out(&self) {
        let cause = self.inner.lock().last_error.take();
        let message = "timeout error: no heartbeat from server within lifetime of the socket";
        let error = match cause {
            Some(cause) => RetroSockError::with_cause(message, cause),
            None => RetroSockError::new(message),
        };
        self.fault(error);
    }

    /// Record a state change under the lock; returns the sockets to notify
    /// once the lock is released. Empty when the change was absorbed by
    /// `Invalid`.
    fn set_state_locked(
        &self,
        inner: &Inner,
        state: ConnectionState,
    ) -> Vec<Arc<NamespaceSocket>> {
        if self.state.set(state) {
            inner.sockets.values().cloned().collect()
        } else {
            Vec::new()
        }
    }

    fn notify_state(&self, listeners: Vec<Arc<NamespaceSocket>>, state: ConnectionState) {
        for socket in listeners {
            socket.handler().on_state(state);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let listeners = {
            let inner = self.inner.lock();
            self.set_state_locked(&inner, state)
        };
        self.notify_state(listeners, state);
    }

    /// Deliver a fault to every registered namespace and shut down.
    pub(crate) fn fault(&self, error: RetroSockError) {
        tracing::error!("connection fault: {error}");
        let targets: Vec<_> = self.inner.lock().sockets.values().cloned().collect();
        for socket in targets {
            socket.handler().on_error(&error);
        }
        self.cleanup();
    }

    /// Idempotent teardown: the connection becomes permanently invalid, the
    /// transport is disconnected, namespaces are cleared and the connection
    /// leaves the registry.
    pub(crate) fn cleanup(&self) {
        let (transport, listeners) = {
            let mut inner = self.inner.lock();
            let listeners = self.set_state_locked(&inner, ConnectionState::Invalid);
            if let Some(task) = inner.reconnect_task.take() {
                task.cancel();
            }
            let transport = inner.transport.take();
            inner.sockets.clear();
            inner.acks.clear();
            inner.first_socket = None;
            (transport, listeners)
        };
        self.watchdog.cancel();
        if let Some(transport) = transport {
            transport.disconnect();
        }
        if let Some(me) = self.weak.upgrade() {
            self.registry.remove(&self.url_str, &me);
        }
        self.notify_state(listeners, ConnectionState::Invalid);
        debug!("cleanup complete for {}", self.url_str);
    }
}
