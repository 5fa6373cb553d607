//! Bundled transports: WebSocket and XHR long-poll.

pub mod websocket;
pub mod xhr_polling;

use crate::core::connection::Connection;
use crate::traits::transport::{Transport, TransportFactory};
use reqwest::Url;
use std::sync::{Arc, Weak};

pub use websocket::WebSocketTransport;
pub use xhr_polling::XhrPollingTransport;

/// Factory producing the bundled transports.
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create(
        &self,
        name: &str,
        origin: &Url,
        connection: Weak<Connection>,
    ) -> Option<Arc<dyn Transport>> {
        match name {
            websocket::TRANSPORT_NAME => Some(WebSocketTransport::create(origin, connection)),
            xhr_polling::TRANSPORT_NAME => Some(XhrPollingTransport::create(origin, connection)),
            _ => None,
        }
    }
}
