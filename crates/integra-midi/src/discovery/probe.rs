//! Identity-probe pairing
//!
//! 1. Bidirectional and unknown endpoints pass straight through as singles.
//! 2. Every readable endpoint is opened and listened on with its own
//!    completion slot; an endpoint that fails to open is left out.
//! 3. After a settle delay (device drivers commonly drop the first messages
//!    after an open), each writable endpoint in turn is opened, sent an
//!    Identity Request and closed again once its window ends.
//! 4. The first pending slot that resolves with a SysEx frame inside the
//!    window pairs with the writable endpoint. A slot resolving to `Closed`
//!    leaves the pool and the window keeps going.
//! 5. Readable endpoints left unpaired become singles, then all listeners
//!    are torn down.
//!
//! Probes run one writable at a time so any reply can be attributed to the
//! request that caused it.

use super::slot::{CompletionSlot, SlotOutcome};
use super::{MatchedDevice, PairingStrategy};
use crate::endpoint::{Endpoint, Lease};
use crate::transport::{Capability, Delivery, Subscription, TransportError};
use flume::{Receiver, RecvTimeoutError, Sender};
use integra_core::protocol::{build_identity_request, is_sysex};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Pairs endpoints by which readable side answers an Identity Request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePairing {
    /// Pause between opening the listeners and the first probe
    settle: Duration,
    /// How long each writable endpoint waits for an answer
    timeout: Duration,
}

impl ProbePairing {
    pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

    pub fn new(settle: Duration, timeout: Duration) -> Self {
        Self { settle, timeout }
    }

    /// Send one probe on `writable` and wait for the first pending slot to answer
    fn probe(
        &self,
        writable: &Endpoint,
        replies: &Receiver<(usize, SlotOutcome)>,
        pending: &mut BTreeSet<usize>,
    ) -> Result<Option<(usize, Vec<u8>)>, TransportError> {
        let lease = writable.open()?;

        // Anything already queued belongs to an earlier window or to no probe at all
        for (index, outcome) in replies.drain() {
            if pending.remove(&index) {
                log::debug!(
                    "MIDI: Listener {} resolved outside a probe window ({:?})",
                    index,
                    outcome
                );
            }
        }

        lease.endpoint().send(&build_identity_request())?;
        log::debug!("[SYSEX OUT] Identity request on '{}'", writable.name());

        let deadline = Instant::now() + self.timeout;
        while !pending.is_empty() {
            match replies.recv_deadline(deadline) {
                Ok((index, SlotOutcome::Payload(bytes))) if pending.remove(&index) => {
                    return Ok(Some((index, bytes)));
                }
                Ok((index, SlotOutcome::Closed)) => {
                    if pending.remove(&index) {
                        log::debug!("MIDI: Listener {} closed during probe", index);
                    }
                }
                // Already resolved or dropped from the pool
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(None)
    }
}

impl Default for ProbePairing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SETTLE, Self::DEFAULT_TIMEOUT)
    }
}

/// An open, subscribed readable endpoint
struct Listener {
    endpoint: Endpoint,
    // Field order matters: unsubscribe before the lease closes the port
    _subscription: Subscription,
    _lease: Lease,
}

impl Listener {
    fn attach(
        index: usize,
        endpoint: &Endpoint,
        tx: Sender<(usize, SlotOutcome)>,
    ) -> Result<Self, TransportError> {
        let lease = endpoint.open()?;
        let slot = CompletionSlot::new(index, tx);
        let subscription = endpoint.subscribe(Box::new(move |delivery| match delivery {
            Delivery::Data(bytes) if is_sysex(bytes) => {
                slot.resolve(SlotOutcome::Payload(bytes.to_vec()));
            }
            Delivery::Data(_) => {}
            Delivery::Closed => {
                slot.resolve(SlotOutcome::Closed);
            }
        }))?;

        Ok(Self {
            endpoint: endpoint.clone(),
            _subscription: subscription,
            _lease: lease,
        })
    }
}

impl PairingStrategy for ProbePairing {
    fn pair(&self, endpoints: Vec<Endpoint>) -> Vec<MatchedDevice> {
        let mut devices = Vec::new();
        let mut readables = Vec::new();
        let mut writables = Vec::new();

        for endpoint in endpoints {
            match endpoint.capability() {
                Capability::Read => readables.push(endpoint),
                Capability::Write => writables.push(endpoint),
                Capability::ReadWrite | Capability::Unsupported => {
                    devices.push(MatchedDevice::Single(endpoint));
                }
            }
        }

        let (tx, replies) = flume::unbounded();
        let mut listeners = Vec::with_capacity(readables.len());
        for endpoint in &readables {
            match Listener::attach(listeners.len(), endpoint, tx.clone()) {
                Ok(listener) => listeners.push(listener),
                Err(e) => log::warn!("MIDI: Skipping input '{}': {}", endpoint.name(), e),
            }
        }
        drop(tx);

        let mut pending: BTreeSet<usize> = (0..listeners.len()).collect();
        let mut paired = vec![false; listeners.len()];

        if !listeners.is_empty() && !writables.is_empty() {
            std::thread::sleep(self.settle);
        }

        for writable in writables {
            match self.probe(&writable, &replies, &mut pending) {
                Ok(Some((index, identity))) => {
                    log::info!(
                        "MIDI: '{}' answered on '{}'",
                        writable.name(),
                        listeners[index].endpoint.name()
                    );
                    paired[index] = true;
                    devices.push(MatchedDevice::Pair {
                        writable,
                        readable: listeners[index].endpoint.clone(),
                        identity: Some(identity),
                    });
                }
                Ok(None) => {
                    log::debug!("MIDI: No answer to probe on '{}'", writable.name());
                    devices.push(MatchedDevice::Single(writable));
                }
                Err(TransportError::EndpointUnavailable { name, reason }) => {
                    log::warn!("MIDI: Skipping output '{}': {}", name, reason);
                }
                Err(e) => {
                    log::warn!("MIDI: Probe on '{}' failed: {}", writable.name(), e);
                    devices.push(MatchedDevice::Single(writable));
                }
            }
        }

        for (listener, paired) in listeners.iter().zip(&paired) {
            if !paired {
                devices.push(MatchedDevice::Single(listener.endpoint.clone()));
            }
        }

        drop(listeners);
        devices
    }
}
