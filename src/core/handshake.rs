use crate::core::config::ConnectionConfig;
use crate::core::tls;
use crate::traits::error::{Result, RetroSockError};
use crate::traits::handler::Headers;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// The four fields of a successful handshake response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReply {
    pub session_id: String,
    pub heartbeat_timeout: Duration,
    pub closing_timeout: Duration,
    pub transports: Vec<String>,
}

fn handshake_url(origin: &Url) -> String {
    format!("{}/socket.io/1/", origin.as_str().trim_end_matches('/'))
}

fn is_secure(origin: &Url) -> bool {
    matches!(origin.scheme(), "https" | "wss")
}

/// Blocking GET against `<origin>/socket.io/1/` with the connection's
/// custom headers and, for secure origins, the process-wide TLS
/// configuration.
pub(crate) fn perform(
    origin: &Url,
    headers: &Headers,
    config: &ConnectionConfig,
) -> Result<HandshakeReply> {
    let endpoint = handshake_url(origin);
    debug!("handshaking against {endpoint}");

    let mut builder = reqwest::blocking::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout);
    if is_secure(origin) {
        builder = tls::apply(builder);
    }
    let client = builder
        .build()
        .map_err(|e| RetroSockError::with_cause("failed to build handshake client", e))?;

    let mut request = client.get(&endpoint);
    for (key, value) in headers {
        request = request.header(key.as_str(), value.as_str());
    }

    let response = request
        .send()
        .map_err(|e| RetroSockError::with_cause("handshake request failed", e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(RetroSockError::new(format!(
            "handshake rejected with status {status}"
        )));
    }
    let body = response
        .text()
        .map_err(|e| RetroSockError::with_cause("failed to read handshake response", e))?;
    parse_reply(&body)
}

/// Parse the first response line:
/// `sessionId:heartbeatSec:closeSec:transport1,transport2,...`.
fn parse_reply(body: &str) -> Result<HandshakeReply> {
    let line = body.lines().next().unwrap_or("");
    let fields: Vec<&str> = line.splitn(4, ':').collect();
    let [session_id, heartbeat, closing, transports] = fields[..] else {
        return Err(RetroSockError::new(format!(
            "malformed handshake response: {line:?}"
        )));
    };
    if session_id.is_empty() {
        return Err(RetroSockError::new("handshake returned an empty session id"));
    }
    let heartbeat_timeout = parse_seconds(heartbeat)?;
    let closing_timeout = parse_seconds(closing)?;
    Ok(HandshakeReply {
        session_id: session_id.to_string(),
        heartbeat_timeout,
        closing_timeout,
        transports: transports.split(',').map(str::to_string).collect(),
    })
}

fn parse_seconds(field: &str) -> Result<Duration> {
    field
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| RetroSockError::with_cause(format!("invalid handshake timeout {field:?}"), e))
}
