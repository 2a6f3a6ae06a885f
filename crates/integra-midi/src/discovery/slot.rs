//! Single-assignment completion slots
//!
//! Every readable endpoint under probe gets one slot. The first resolution
//! is forwarded, tagged with the slot's index, on a channel shared by all
//! slots; later resolutions are dropped. Slots resolve from the backend's
//! driver thread while the prober blocks on the channel.

use flume::Sender;
use std::sync::atomic::{AtomicBool, Ordering};

/// How a slot was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// First SysEx frame received on the endpoint
    Payload(Vec<u8>),
    /// The endpoint was closed first
    Closed,
}

pub struct CompletionSlot {
    index: usize,
    resolved: AtomicBool,
    tx: Sender<(usize, SlotOutcome)>,
}

impl CompletionSlot {
    pub fn new(index: usize, tx: Sender<(usize, SlotOutcome)>) -> Self {
        Self {
            index,
            resolved: AtomicBool::new(false),
            tx,
        }
    }

    /// Resolve the slot; returns false (and drops `outcome`) if already resolved
    pub fn resolve(&self, outcome: SlotOutcome) -> bool {
        if self.resolved.swap(true, Ordering::AcqRel) {
            log::trace!("MIDI: Slot {} already resolved, dropping {:?}", self.index, outcome);
            return false;
        }
        // The prober may be gone already; nothing is waiting then
        let _ = self.tx.send((self.index, outcome));
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}
