//! Name-based pairing
//!
//! Many backends give both directions of a device the same display name.
//! Nothing is opened or sent, so this is safe to run while other
//! applications use the ports.

use super::{MatchedDevice, PairingStrategy};
use crate::endpoint::Endpoint;
use crate::transport::Capability;

/// Pairs a writable and a readable endpoint with identical names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamePairing;

impl PairingStrategy for NamePairing {
    fn pair(&self, endpoints: Vec<Endpoint>) -> Vec<MatchedDevice> {
        let mut devices = Vec::new();
        let mut readables: Vec<Option<Endpoint>> = Vec::new();
        let mut writables = Vec::new();

        for endpoint in endpoints {
            match endpoint.capability() {
                Capability::Read => readables.push(Some(endpoint)),
                Capability::Write => writables.push(endpoint),
                Capability::ReadWrite | Capability::Unsupported => {
                    devices.push(MatchedDevice::Single(endpoint));
                }
            }
        }

        for writable in writables {
            let counterpart = readables
                .iter_mut()
                .find(|slot| matches!(slot, Some(r) if r.name() == writable.name()))
                .and_then(Option::take);

            devices.push(match counterpart {
                Some(readable) => MatchedDevice::Pair {
                    writable,
                    readable,
                    identity: None,
                },
                None => MatchedDevice::Single(writable),
            });
        }

        devices.extend(readables.into_iter().flatten().map(MatchedDevice::Single));
        devices
    }
}
