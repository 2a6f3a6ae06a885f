//! Transport boundary
//!
//! A [`Port`] is one unidirectional (or, rarely, bidirectional) endpoint of
//! some MIDI backend. Received messages are fanned out to subscribers as raw
//! byte slices; a port that gets disconnected tells every subscriber with
//! [`Delivery::Closed`] so nobody waits on it forever.

use crate::endpoint::Endpoint;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Instant;

/// Error type for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MIDI endpoint '{name}' unavailable: {reason}")]
    EndpointUnavailable { name: String, reason: String },

    #[error("MIDI endpoint '{0}' is not writable")]
    NotWritable(String),

    #[error("MIDI endpoint '{0}' is not readable")]
    NotReadable(String),

    #[error("MIDI endpoint '{0}' is closed")]
    Closed(String),

    #[error("Failed to send to MIDI endpoint '{name}': {reason}")]
    SendFailed { name: String, reason: String },

    #[error("MIDI backend error: {0}")]
    Backend(String),
}

/// Direction(s) an endpoint supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Receives messages from the device (a MIDI input port)
    Read,
    /// Sends messages to the device (a MIDI output port)
    Write,
    /// Both directions in one endpoint
    ReadWrite,
    /// Something the driver does not know how to use
    Unsupported,
}

impl Capability {
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// What a subscriber receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery<'a> {
    /// One complete message, transport envelope already stripped
    Data(&'a [u8]),
    /// The port was disconnected
    Closed,
}

/// Subscriber callback
///
/// Called from the backend's driver thread. Must be fast and non-blocking.
pub type Callback = Box<dyn FnMut(Delivery<'_>) + Send>;

/// A physical endpoint as exposed by a backend
///
/// `connect`/`disconnect` act on the underlying device directly; reference
/// counting across several users is layered on top by [`Endpoint`].
pub trait Port: Send + Sync {
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Whether the underlying device connection is currently open
    fn is_connected(&self) -> bool;

    fn connect(&self) -> Result<(), TransportError>;

    /// Close the underlying connection; a no-op if already closed
    fn disconnect(&self);

    /// Send one message, optionally scheduled for `at`
    fn send(&self, bytes: &[u8], at: Option<Instant>) -> Result<(), TransportError>;

    fn subscribe(&self, callback: Callback) -> Result<Subscription, TransportError>;
}

/// Source of endpoints (a MIDI backend, or a mock in tests)
pub trait Transport {
    fn endpoints(&self) -> Result<Vec<Endpoint>, TransportError>;
}

/// Fan-out list shared between a port and its backend callback
#[derive(Default)]
pub struct SubscriberList {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

impl SubscriberList {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a callback; it stays registered until the returned handle drops
    pub fn subscribe(self: &Arc<Self>, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, callback));
        Subscription {
            list: Arc::downgrade(self),
            id,
        }
    }

    /// Hand a delivery to every subscriber
    pub fn deliver(&self, delivery: Delivery<'_>) {
        for (_, callback) in self.lock().iter_mut() {
            callback(delivery);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(existing, _)| *existing != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Callback)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unsubscribe handle; dropping it removes the callback
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    list: Weak<SubscriberList>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            list.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
