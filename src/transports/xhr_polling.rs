use crate::codec::framing;
use crate::core::connection::Connection;
use crate::core::tls;
use crate::traits::error::{Result, RetroSockError};
use crate::traits::transport::Transport;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub(crate) const TRANSPORT_NAME: &str = "xhr-polling";

const CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// XHR long-poll transport over blocking `reqwest`.
///
/// A poll thread issues back-to-back GETs; the server parks each request
/// until it has data or its poll window closes. Responses may concatenate
/// several frames, so bodies go up through `transport_data`, which
/// unwraps the framed envelope. Sends POST to the same endpoint, several
/// frames at once as one framed body.
pub struct XhrPollingTransport {
    origin: Url,
    connection: Weak<Connection>,
    client: Mutex<Option<Client>>,
    endpoint: Mutex<Option<String>>,
    running: Arc<AtomicBool>,
}

impl XhrPollingTransport {
    pub fn create(origin: &Url, connection: Weak<Connection>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.clone(),
            connection,
            client: Mutex::new(None),
            endpoint: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    fn poll_url(&self) -> Result<String> {
        let connection = self
            .connection
            .upgrade()
            .ok_or_else(|| RetroSockError::new("connection is gone"))?;
        let session_id = connection
            .session_id()
            .ok_or_else(|| RetroSockError::new("xhr-polling transport requires a session id"))?;
        Ok(format!(
            "{}/socket.io/1/{TRANSPORT_NAME}/{session_id}",
            self.origin.as_str().trim_end_matches('/')
        ))
    }

    fn sender(&self) -> Result<(Client, String)> {
        let client = self
            .client
            .lock()
            .clone()
            .ok_or_else(|| RetroSockError::new("xhr-polling transport is not connected"))?;
        let endpoint = self
            .endpoint
            .lock()
            .clone()
            .ok_or_else(|| RetroSockError::new("xhr-polling transport is not connected"))?;
        Ok((client, endpoint))
    }

    fn post(&self, body: String) -> Result<()> {
        let (client, endpoint) = self.sender()?;
        client
            .post(&endpoint)
            .body(body)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| RetroSockError::with_cause("xhr-polling send failed", e))?;
        Ok(())
    }

    fn spawn_poller(&self, client: Client, endpoint: String) {
        let connection = self.connection.clone();
        let running = Arc::clone(&self.running);
        thread::spawn(move || loop {
            if !running.load(Ordering::Acquire) {
                return;
            }
            let body = client
                .get(&endpoint)
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text());
            match body {
                Ok(body) => {
                    if body.is_empty() {
                        continue;
                    }
                    let Some(connection) = connection.upgrade() else {
                        return;
                    };
                    connection.transport_data(&body);
                }
                Err(e) => {
                    if running.swap(false, Ordering::AcqRel) {
                        if let Some(connection) = connection.upgrade() {
                            connection
                                .transport_error(RetroSockError::with_cause("poll failed", e));
                        }
                    }
                    return;
                }
            }
        });
    }
}

impl Transport for XhrPollingTransport {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn connect(&self) -> Result<()> {
        let endpoint = self.poll_url()?;
        debug!("polling {endpoint}");
        let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
        // The server parks poll requests up to its heartbeat window; an
        // overall request timeout would cut healthy polls short.
        builder = builder.timeout(None);
        if matches!(self.origin.scheme(), "https" | "wss") {
            builder = tls::apply(builder);
        }
        let client = builder
            .build()
            .map_err(|e| RetroSockError::with_cause("failed to build polling client", e))?;

        *self.client.lock() = Some(client.clone());
        *self.endpoint.lock() = Some(endpoint.clone());
        self.running.store(true, Ordering::Release);

        if let Some(connection) = self.connection.upgrade() {
            connection.transport_connected();
        }
        self.spawn_poller(client, endpoint);
        Ok(())
    }

    fn disconnect(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn invalidate(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn send(&self, text: &str) -> Result<()> {
        self.post(text.to_string())
    }

    fn can_send_bulk(&self) -> bool {
        true
    }

    fn send_bulk(&self, texts: &[String]) -> Result<()> {
        match texts {
            [single] => self.send(single),
            _ => self.post(framing::encode(texts)),
        }
    }
}
