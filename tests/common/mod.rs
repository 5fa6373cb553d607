//! Common test utilities: an in-process handshake server, a scripted mock
//! transport, and a recording handler for asserting on callback traffic.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use retrosock::core::connection::Connection;
use retrosock::{
    ConnectOptions, ConnectionConfig, ConnectionState, RemoteAck, RetroSockError, Result,
    SerdeJsonCodec, SocketHandler, Transport, TransportFactory,
};
use reqwest::Url;
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A minimal HTTP server answering every request with one canned response.
pub struct MockServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    /// Serve a 200 handshake response with the given body.
    pub fn start(body: impl Into<String>) -> Self {
        let body = body.into();
        Self::start_raw(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ))
    }

    /// Serve a failing status with an empty body.
    pub fn start_error(status: &str) -> Self {
        Self::start_raw(format!(
            "HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ))
    }

    fn start_raw(response: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let stop_flag = Arc::clone(&stop);
        let request_log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                if stop_flag.load(Ordering::Acquire) {
                    return;
                }
                let Ok(mut stream) = stream else { return };
                let mut request = String::new();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    request.push_str(&line);
                }
                request_log.lock().push(request);
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self {
            addr,
            stop,
            requests,
        }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        let _ = TcpStream::connect(self.addr);
    }
}

pub fn handshake_body(session_id: &str, heartbeat: u64, closing: u64, transports: &str) -> String {
    format!("{session_id}:{heartbeat}:{closing}:{transports}")
}

/// Transport factory handing out scripted [`MockTransport`]s and recording
/// which protocol names the connection asked for.
pub struct MockTransportFactory {
    auto_connect: bool,
    can_bulk: bool,
    requested: Mutex<Vec<String>>,
    created: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportFactory {
    /// Transports that report `transport_connected` from inside `connect`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            auto_connect: true,
            can_bulk: false,
            requested: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Transports that stay silent until the test drives the upcalls.
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            auto_connect: false,
            can_bulk: false,
            requested: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Silent transports that advertise bulk sending.
    pub fn manual_bulk() -> Arc<Self> {
        Arc::new(Self {
            auto_connect: false,
            can_bulk: true,
            requested: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }

    /// Block until the connection has created transport number `index`.
    pub fn wait_for_transport(&self, index: usize) -> Arc<MockTransport> {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        loop {
            if let Some(transport) = self.created.lock().get(index) {
                return Arc::clone(transport);
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for transport {index}"
            );
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(
        &self,
        name: &str,
        _origin: &Url,
        connection: Weak<Connection>,
    ) -> Option<Arc<dyn Transport>> {
        self.requested.lock().push(name.to_string());
        let transport = Arc::new(MockTransport {
            connection,
            auto_connect: self.auto_connect,
            can_bulk: self.can_bulk,
            fail_bulk_once: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            invalidated: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            bulks: Mutex::new(Vec::new()),
        });
        self.created.lock().push(Arc::clone(&transport));
        Some(transport)
    }
}

/// Scripted transport: records outbound traffic, never talks to a network.
pub struct MockTransport {
    connection: Weak<Connection>,
    auto_connect: bool,
    can_bulk: bool,
    pub fail_bulk_once: AtomicBool,
    pub fail_send: AtomicBool,
    pub invalidated: AtomicBool,
    pub disconnected: AtomicBool,
    sent: Mutex<Vec<String>>,
    bulks: Mutex<Vec<Vec<String>>>,
}

impl MockTransport {
    pub fn connection(&self) -> Arc<Connection> {
        self.connection.upgrade().expect("connection is gone")
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn bulks(&self) -> Vec<Vec<String>> {
        self.bulks.lock().clone()
    }

    /// Block until the given frame has been sent.
    pub fn wait_for_frame(&self, frame: &str) {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        loop {
            if self.sent.lock().iter().any(|sent| sent == frame) {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for frame {frame:?}; sent so far: {:?}",
                self.sent()
            );
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(&self) -> Result<()> {
        if self.auto_connect {
            if let Some(connection) = self.connection.upgrade() {
                connection.transport_connected();
            }
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    fn send(&self, text: &str) -> Result<()> {
        if self.fail_send.load(Ordering::Acquire) {
            return Err(RetroSockError::new("scripted send failure"));
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn can_send_bulk(&self) -> bool {
        self.can_bulk
    }

    fn send_bulk(&self, texts: &[String]) -> Result<()> {
        if self.fail_bulk_once.swap(false, Ordering::AcqRel) {
            return Err(RetroSockError::new("scripted bulk failure"));
        }
        self.bulks.lock().push(texts.to_vec());
        Ok(())
    }
}

/// Everything a handler can observe, as channel messages.
#[derive(Debug)]
pub enum HandlerEvent {
    Connect,
    Disconnect,
    Message {
        text: String,
        ack: Option<RemoteAck>,
    },
    Json {
        value: Option<Value>,
        ack: Option<RemoteAck>,
    },
    Event {
        name: String,
        args: Vec<Value>,
        ack: Option<RemoteAck>,
    },
    Error(String),
    SessionId(String),
    State(ConnectionState),
}

pub struct RecordingHandler {
    events: Sender<HandlerEvent>,
}

pub fn recording_handler() -> (Arc<RecordingHandler>, Receiver<HandlerEvent>) {
    let (events, receiver) = unbounded();
    (Arc::new(RecordingHandler { events }), receiver)
}

impl SocketHandler for RecordingHandler {
    fn on_connect(&self) -> Result<()> {
        let _ = self.events.send(HandlerEvent::Connect);
        Ok(())
    }

    fn on_disconnect(&self) -> Result<()> {
        let _ = self.events.send(HandlerEvent::Disconnect);
        Ok(())
    }

    fn on_message(&self, text: &str, ack: Option<RemoteAck>) -> Result<()> {
        let _ = self.events.send(HandlerEvent::Message {
            text: text.to_string(),
            ack,
        });
        Ok(())
    }

    fn on_json(&self, value: Option<Value>, ack: Option<RemoteAck>) -> Result<()> {
        let _ = self.events.send(HandlerEvent::Json { value, ack });
        Ok(())
    }

    fn on_event(&self, name: &str, ack: Option<RemoteAck>, args: Vec<Value>) -> Result<()> {
        let _ = self.events.send(HandlerEvent::Event {
            name: name.to_string(),
            args,
            ack,
        });
        Ok(())
    }

    fn on_error(&self, error: &RetroSockError) {
        let _ = self.events.send(HandlerEvent::Error(error.message().to_string()));
    }

    fn on_session_id(&self, session_id: &str) {
        let _ = self
            .events
            .send(HandlerEvent::SessionId(session_id.to_string()));
    }

    fn on_state(&self, state: ConnectionState) {
        let _ = self.events.send(HandlerEvent::State(state));
    }
}

/// Route tracing output through the test harness (set TEST_VERBOSE to see
/// it).
pub fn init_test_logging() {
    if std::env::var("TEST_VERBOSE").is_ok() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }
}

/// Connect options wired to a mock factory, with a short reconnect delay so
/// tests do not wait out the production default.
pub fn mock_options(factory: Arc<MockTransportFactory>) -> ConnectOptions {
    init_test_logging();
    ConnectOptions {
        config: ConnectionConfig {
            reconnect_delay: Duration::from_millis(50),
            ..ConnectionConfig::default()
        },
        factory,
        codec: Arc::new(SerdeJsonCodec),
    }
}

/// Wait until the handler observes `wanted`, skipping unrelated events.
pub fn wait_for_state(receiver: &Receiver<HandlerEvent>, wanted: ConnectionState) {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        match receiver.recv_deadline(deadline) {
            Ok(HandlerEvent::State(state)) if state == wanted => return,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for state {wanted:?}"),
        }
    }
}

/// Wait for the first event matching `predicate`, skipping the rest.
pub fn wait_for_event(
    receiver: &Receiver<HandlerEvent>,
    predicate: impl Fn(&HandlerEvent) -> bool,
) -> HandlerEvent {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        match receiver.recv_deadline(deadline) {
            Ok(event) if predicate(&event) => return event,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for a matching event"),
        }
    }
}
