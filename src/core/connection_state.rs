use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle states of a connection.
///
/// `Invalid` is terminal and absorbing: once reached, no transition can
/// leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Created, handshake not yet attempted.
    Init = 0,
    /// The handshake request is in flight.
    Handshake = 1,
    /// A transport is being established.
    Connecting = 2,
    /// Transport up, frames flow.
    Ready = 3,
    /// Transport lost; a reconnect may be requested.
    Interrupted = 4,
    /// Shut down for good.
    Invalid = 5,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Handshake,
            2 => Self::Connecting,
            3 => Self::Ready,
            4 => Self::Interrupted,
            _ => Self::Invalid,
        }
    }

    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    pub fn is_invalid(self) -> bool {
        self == Self::Invalid
    }
}

/// Atomic cell holding a [`ConnectionState`].
///
/// Reads are lock-free; writes happen under the connection monitor.
/// The cell itself enforces `Invalid` absorption so that a racing late
/// writer can never resurrect a dead connection.
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Transition to `state`. Returns false (leaving the cell untouched)
    /// when the current state is `Invalid`.
    pub fn set(&self, state: ConnectionState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if ConnectionState::from_u8(current).is_invalid() {
                return false;
            }
            match self.0.compare_exchange(
                current,
                state as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_ready()
    }

    pub fn is_invalid(&self) -> bool {
        self.get().is_invalid()
    }
}
