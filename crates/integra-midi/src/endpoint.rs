//! Shared, reference-counted endpoint handles
//!
//! Several users (discovery listeners, a device session, the application)
//! can hold the same [`Endpoint`]. Each one that needs the port open takes a
//! [`Lease`]; the underlying connection is opened by the first lease and
//! closed when the last one is released. A port that was already open before
//! the first lease is never closed from here.

use crate::transport::{Callback, Capability, Port, Subscription, TransportError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

struct Shared {
    port: Arc<dyn Port>,
    /// Outstanding leases
    leases: AtomicUsize,
    /// Whether releasing the last lease closes the port
    owns_connection: AtomicBool,
    /// Serializes open/close transitions
    transition: Mutex<()>,
}

/// Cloneable handle to one port
#[derive(Clone)]
pub struct Endpoint {
    shared: Arc<Shared>,
}

impl Endpoint {
    pub fn new(port: Arc<dyn Port>) -> Self {
        Self {
            shared: Arc::new(Shared {
                port,
                leases: AtomicUsize::new(0),
                owns_connection: AtomicBool::new(false),
                transition: Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.port.name()
    }

    pub fn capability(&self) -> Capability {
        self.shared.port.capability()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.port.is_connected()
    }

    /// Number of outstanding leases
    pub fn lease_count(&self) -> usize {
        self.shared.leases.load(Ordering::Acquire)
    }

    /// Open the port (if needed) and return a lease keeping it open
    pub fn open(&self) -> Result<Lease, TransportError> {
        let _guard = self.lock_transition();

        if self.shared.leases.load(Ordering::Acquire) == 0 {
            if self.shared.port.is_connected() {
                log::debug!("MIDI: '{}' already open, leaving it to its owner", self.name());
                self.shared.owns_connection.store(false, Ordering::Release);
            } else {
                self.shared.port.connect()?;
                log::debug!("MIDI: Opened '{}'", self.name());
                self.shared.owns_connection.store(true, Ordering::Release);
            }
        }

        self.shared.leases.fetch_add(1, Ordering::AcqRel);
        Ok(Lease {
            endpoint: self.clone(),
        })
    }

    fn release(&self) {
        let _guard = self.lock_transition();

        let previous = self.shared.leases.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 && self.shared.owns_connection.swap(false, Ordering::AcqRel) {
            self.shared.port.disconnect();
            log::debug!("MIDI: Closed '{}'", self.name());
        }
    }

    pub fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.send_at(bytes, None)
    }

    /// Send, scheduled for `at` when given
    pub fn send_at(&self, bytes: &[u8], at: Option<Instant>) -> Result<(), TransportError> {
        if !self.capability().can_write() {
            return Err(TransportError::NotWritable(self.name().to_string()));
        }
        self.shared.port.send(bytes, at)
    }

    pub fn subscribe(&self, callback: Callback) -> Result<Subscription, TransportError> {
        if !self.capability().can_read() {
            return Err(TransportError::NotReadable(self.name().to_string()));
        }
        self.shared.port.subscribe(callback)
    }

    fn lock_transition(&self) -> std::sync::MutexGuard<'_, ()> {
        self.shared
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Endpoint {}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name())
            .field("capability", &self.capability())
            .field("leases", &self.lease_count())
            .finish()
    }
}

/// Keeps an endpoint open until dropped
#[must_use = "dropping a Lease releases the endpoint immediately"]
pub struct Lease {
    endpoint: Endpoint,
}

impl Lease {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Release now
    pub fn release(self) {}
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.endpoint.release();
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Lease").field(&self.endpoint.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPort;

    #[test]
    fn test_last_lease_closes() {
        let port = MockPort::readable("INTEGRA-7");
        let endpoint = port.endpoint();

        let first = endpoint.open().unwrap();
        let second = endpoint.open().unwrap();
        assert_eq!(port.connects(), 1);
        assert_eq!(endpoint.lease_count(), 2);

        drop(first);
        assert!(port.is_connected());
        assert_eq!(port.disconnects(), 0);

        second.release();
        assert!(!port.is_connected());
        assert_eq!(port.disconnects(), 1);
        assert_eq!(endpoint.lease_count(), 0);
    }

    #[test]
    fn test_externally_opened_port_stays_open() {
        let port = MockPort::readable("INTEGRA-7");
        port.connect().unwrap();
        let endpoint = port.endpoint();

        let lease = endpoint.open().unwrap();
        drop(lease);

        assert!(port.is_connected());
        assert_eq!(port.connects(), 1);
        assert_eq!(port.disconnects(), 0);
    }

    #[test]
    fn test_reopen_after_close() {
        let port = MockPort::writable("INTEGRA-7");
        let endpoint = port.endpoint();

        drop(endpoint.open().unwrap());
        drop(endpoint.open().unwrap());

        assert_eq!(port.connects(), 2);
        assert_eq!(port.disconnects(), 2);
    }

    #[test]
    fn test_failed_open_takes_no_lease() {
        let port = MockPort::readable("Broken");
        port.fail_connect();
        let endpoint = port.endpoint();

        assert!(matches!(
            endpoint.open(),
            Err(TransportError::EndpointUnavailable { .. })
        ));
        assert_eq!(endpoint.lease_count(), 0);
    }

    #[test]
    fn test_direction_checks() {
        let input = MockPort::readable("In").endpoint();
        let output = MockPort::writable("Out").endpoint();

        assert!(matches!(input.send(&[0xF0, 0xF7]), Err(TransportError::NotWritable(_))));
        assert!(matches!(
            output.subscribe(Box::new(|_| {})),
            Err(TransportError::NotReadable(_))
        ));
    }

    #[test]
    fn test_clones_are_the_same_endpoint() {
        let port = MockPort::readable("In");
        let a = port.endpoint();
        let b = a.clone();
        let other = port.endpoint();

        assert_eq!(a, b);
        // A second handle to the same port is a separate endpoint
        assert_ne!(a, other);
    }
}
