use crate::core::connection::Connection;
use crate::traits::error::{Result, RetroSockError};
use crate::traits::transport::Transport;
use parking_lot::Mutex;
use reqwest::Url;
use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::debug;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message as WsMessage, WebSocket};

pub(crate) const TRANSPORT_NAME: &str = "websocket";

/// How long a blocking read holds the socket before letting writers in.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// WebSocket transport over synchronous `tungstenite`.
///
/// The socket is shared between the reader thread and senders behind a
/// mutex; a short read timeout on the underlying stream keeps the reader
/// from starving senders. WebSocket frames preserve message boundaries, so
/// inbound text goes up through `transport_data` unwrapped.
pub struct WebSocketTransport {
    origin: Url,
    connection: Weak<Connection>,
    socket: Arc<Mutex<Option<Socket>>>,
    invalidated: Arc<AtomicBool>,
}

impl WebSocketTransport {
    pub fn create(origin: &Url, connection: Weak<Connection>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.clone(),
            connection,
            socket: Arc::new(Mutex::new(None)),
            invalidated: Arc::new(AtomicBool::new(false)),
        })
    }

    fn ws_url(&self) -> Result<String> {
        let connection = self
            .connection
            .upgrade()
            .ok_or_else(|| RetroSockError::new("connection is gone"))?;
        let session_id = connection
            .session_id()
            .ok_or_else(|| RetroSockError::new("websocket transport requires a session id"))?;
        let scheme = match self.origin.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        let host = self
            .origin
            .host_str()
            .ok_or_else(|| RetroSockError::new("origin URL has no host"))?;
        let authority = match self.origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(format!(
            "{scheme}://{authority}/socket.io/1/{TRANSPORT_NAME}/{session_id}"
        ))
    }

    fn spawn_reader(&self) {
        let socket = Arc::clone(&self.socket);
        let connection = self.connection.clone();
        let invalidated = Arc::clone(&self.invalidated);
        thread::spawn(move || loop {
            if invalidated.load(Ordering::Acquire) {
                return;
            }
            let event = {
                let mut guard = socket.lock();
                let Some(ws) = guard.as_mut() else { return };
                match ws.read() {
                    Ok(message) => Some(Ok(message)),
                    Err(tungstenite::Error::Io(e))
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::TimedOut =>
                    {
                        // Read timeout tick; release the lock so senders
                        // get a turn.
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            };
            match event {
                None => continue,
                Some(Ok(WsMessage::Text(text))) => {
                    let Some(connection) = connection.upgrade() else {
                        return;
                    };
                    connection.transport_data(&text);
                }
                Some(Ok(WsMessage::Close(_))) => {
                    debug!("websocket closed by server");
                    if let Some(connection) = connection.upgrade() {
                        connection.transport_disconnected();
                    }
                    return;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    if !invalidated.load(Ordering::Acquire) {
                        if let Some(connection) = connection.upgrade() {
                            connection
                                .transport_error(RetroSockError::with_cause("websocket failed", e));
                        }
                    }
                    return;
                }
            }
        });
    }
}

impl Transport for WebSocketTransport {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn connect(&self) -> Result<()> {
        let url = self.ws_url()?;
        debug!("opening websocket {url}");
        let (socket, _response) = tungstenite::connect(url.as_str())
            .map_err(|e| RetroSockError::with_cause(format!("websocket connect failed: {url}"), e))?;
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => {
                let _ = stream.set_read_timeout(Some(READ_POLL_INTERVAL));
            }
            MaybeTlsStream::NativeTls(stream) => {
                let _ = stream.get_ref().set_read_timeout(Some(READ_POLL_INTERVAL));
            }
            _ => {}
        }
        *self.socket.lock() = Some(socket);
        if let Some(connection) = self.connection.upgrade() {
            connection.transport_connected();
        }
        self.spawn_reader();
        Ok(())
    }

    fn disconnect(&self) {
        self.invalidated.store(true, Ordering::Release);
        if let Some(mut socket) = self.socket.lock().take() {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
        drop(self.socket.lock().take());
    }

    fn send(&self, text: &str) -> Result<()> {
        let mut guard = self.socket.lock();
        let ws = guard
            .as_mut()
            .ok_or_else(|| RetroSockError::new("websocket is not connected"))?;
        ws.send(WsMessage::Text(text.to_string()))
            .map_err(|e| RetroSockError::with_cause("websocket send failed", e))
    }
}
