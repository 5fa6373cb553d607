use crate::codec::message::Message;
use crate::core::connection::Connection;
use serde_json::Value;
use std::fmt;
use std::sync::Weak;

/// One-shot callback stored for an outbound acknowledgement request,
/// invoked with the server's positional reply arguments.
pub type AckCallback = Box<dyn FnOnce(Vec<Value>) + Send + 'static>;

/// Handle for acknowledging an inbound message.
///
/// Present on dispatched messages whose sender requested an ack. Invoking
/// [`ack`](RemoteAck::ack) sends the reply frame back through the
/// connection; the handle holds only a non-owning back-reference, so a
/// late ack on a dead connection is a no-op.
#[derive(Clone)]
pub struct RemoteAck {
    connection: Weak<Connection>,
    endpoint: String,
    id: String,
}

impl RemoteAck {
    /// Build the ack handle for an inbound message, if it carries an id.
    /// The id is normalized to end with `+` when the server omitted it.
    pub(crate) fn for_message(
        connection: Weak<Connection>,
        message: &Message,
    ) -> Option<RemoteAck> {
        if message.id.is_empty() {
            return None;
        }
        let id = if message.id.ends_with('+') {
            message.id.clone()
        } else {
            format!("{}+", message.id)
        };
        Some(RemoteAck {
            connection,
            endpoint: message.endpoint.clone(),
            id,
        })
    }

    /// Send the acknowledgement with positional arguments.
    pub fn ack(&self, args: &[Value]) {
        if let Some(connection) = self.connection.upgrade() {
            connection.send_remote_ack(&self.endpoint, &self.id, args);
        }
    }
}

impl fmt::Debug for RemoteAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAck")
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .finish()
    }
}
