//! Device discovery
//!
//! MIDI backends expose the two directions of one physical device as two
//! unrelated endpoints. Discovery pairs every writable endpoint with the
//! readable endpoint of the same device and reports everything else as a
//! standalone [`MatchedDevice::Single`].
//!
//! Two strategies are provided:
//! - [`ProbePairing`] sends an Identity Request on each writable endpoint and
//!   pairs it with whichever readable endpoint answers first
//! - [`NamePairing`] pairs endpoints whose display names are identical,
//!   without sending anything

mod name;
mod probe;
mod slot;

pub use name::NamePairing;
pub use probe::ProbePairing;

use crate::endpoint::Endpoint;
use crate::transport::{Transport, TransportError};
use integra_core::protocol::IdentityReply;

/// One discovered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedDevice {
    /// An endpoint with no counterpart
    Single(Endpoint),
    /// Both directions of one device
    Pair {
        writable: Endpoint,
        readable: Endpoint,
        /// Raw SysEx the readable side answered the probe with
        identity: Option<Vec<u8>>,
    },
}

impl MatchedDevice {
    pub fn name(&self) -> &str {
        match self {
            Self::Single(endpoint) => endpoint.name(),
            Self::Pair { writable, .. } => writable.name(),
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Self::Pair { .. })
    }

    /// Endpoint to send to, if the device has one
    pub fn writable(&self) -> Option<&Endpoint> {
        match self {
            Self::Single(endpoint) => endpoint.capability().can_write().then_some(endpoint),
            Self::Pair { writable, .. } => Some(writable),
        }
    }

    /// Endpoint to receive from, if the device has one
    pub fn readable(&self) -> Option<&Endpoint> {
        match self {
            Self::Single(endpoint) => endpoint.capability().can_read().then_some(endpoint),
            Self::Pair { readable, .. } => Some(readable),
        }
    }

    /// Decoded identity, if the probe answer was an Identity Reply
    pub fn identity(&self) -> Option<IdentityReply> {
        match self {
            Self::Pair {
                identity: Some(bytes),
                ..
            } => IdentityReply::parse(bytes),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(endpoint) => write!(f, "'{}' (single)", endpoint.name()),
            Self::Pair {
                writable, readable, ..
            } => write!(f, "'{}' -> '{}'", writable.name(), readable.name()),
        }
    }
}

/// Policy that groups endpoints into devices
///
/// Every endpoint handed in appears in at most one result; endpoints that
/// cannot be opened may be left out.
pub trait PairingStrategy: Send + Sync {
    fn pair(&self, endpoints: Vec<Endpoint>) -> Vec<MatchedDevice>;
}

/// Enumerate `transport` and group its endpoints with `strategy`
pub fn discover(
    transport: &dyn Transport,
    strategy: &dyn PairingStrategy,
) -> Result<Vec<MatchedDevice>, TransportError> {
    let endpoints = transport.endpoints()?;
    log::info!("MIDI: Discovering devices on {} endpoint(s)", endpoints.len());

    let devices = strategy.pair(endpoints);

    log::info!("MIDI: Found {} device(s)", devices.len());
    for device in &devices {
        log::info!("  - {}", device);
    }
    Ok(devices)
}
