//! Session with one discovered INTEGRA-7
//!
//! Holds both directions open for its lifetime. Every SysEx frame received
//! on the readable side goes through a bounded channel; request methods
//! drain stale frames, send, then wait on the channel with a deadline.

use crate::discovery::MatchedDevice;
use crate::endpoint::{Endpoint, Lease};
use crate::transport::{Delivery, Subscription, TransportError};
use flume::Receiver;
use integra_core::protocol::{
    build_identity_request, build_read_request, build_write_request, effective_address, is_sysex,
    note_off, note_on, parse_data_reply, BaseAddress, DeviceId, IdentityReply, ProtocolError,
};
use integra_core::{AddressSpaceBuffer, BufferError, Byte7, Nibble};
use std::time::{Duration, Instant};

/// Frames buffered between the MIDI thread and a waiting request
const REPLY_QUEUE: usize = 256;

/// Error type for device session operations
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device '{0}' cannot both send and receive")]
    NotBidirectional(String),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

pub struct IntegraDevice {
    name: String,
    device_id: DeviceId,
    output: Endpoint,
    replies: Receiver<Vec<u8>>,
    // Dropped in order: stop listening, then release both ports
    _subscription: Subscription,
    _input: Lease,
    _output: Lease,
}

impl IntegraDevice {
    /// Open both directions of `device` and start collecting replies
    pub fn connect(device: &MatchedDevice, device_id: DeviceId) -> Result<Self, DeviceError> {
        let (Some(output), Some(input)) = (device.writable(), device.readable()) else {
            return Err(DeviceError::NotBidirectional(device.name().to_string()));
        };

        let output_lease = output.open()?;
        let input_lease = input.open()?;

        let (tx, replies) = flume::bounded(REPLY_QUEUE);
        let subscription = input.subscribe(Box::new(move |delivery| {
            if let Delivery::Data(bytes) = delivery {
                if is_sysex(bytes) && tx.try_send(bytes.to_vec()).is_err() {
                    log::warn!("[SYSEX IN] Reply queue full, dropping {} bytes", bytes.len());
                }
            }
        }))?;

        log::info!(
            "MIDI: Session with '{}' (device ID {})",
            device.name(),
            device_id
        );

        Ok(Self {
            name: device.name().to_string(),
            device_id,
            output: output.clone(),
            replies,
            _subscription: subscription,
            _input: input_lease,
            _output: output_lease,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn note_on(&self, channel: Nibble, note: Byte7, velocity: Byte7) -> Result<(), DeviceError> {
        self.send(&note_on(channel, note, velocity))
    }

    pub fn note_off(&self, channel: Nibble, note: Byte7, velocity: Byte7) -> Result<(), DeviceError> {
        self.send(&note_off(channel, note, velocity))
    }

    /// Ask the device to identify itself
    pub fn identify(&self, timeout: Duration) -> Result<IdentityReply, DeviceError> {
        self.drain();
        self.send(&build_identity_request())?;

        let deadline = Instant::now() + timeout;
        loop {
            let frame = self.next_frame(deadline, timeout)?;
            if let Some(reply) = IdentityReply::parse(&frame) {
                return Ok(reply);
            }
        }
    }

    /// Read `size` bytes at `base + offset`
    ///
    /// The device may answer with several DT1 frames; they are collected until
    /// the whole window is covered. Frames outside the window are ignored.
    pub fn read(
        &self,
        base: BaseAddress,
        offset: u32,
        size: u32,
        timeout: Duration,
    ) -> Result<AddressSpaceBuffer, DeviceError> {
        let request = build_read_request(base, offset, size, self.device_id)?;
        let start = effective_address(base, offset)?.value();
        let end = start + size;

        self.drain();
        self.send(&request)?;

        let mut buffer = AddressSpaceBuffer::new();
        let deadline = Instant::now() + timeout;
        while buffer.covered() < size as usize {
            let frame = self.next_frame(deadline, timeout)?;
            let Some(reply) = parse_data_reply(&frame) else {
                continue;
            };

            if !self.device_id.is_broadcast() && reply.device_id != self.device_id {
                log::debug!("[SYSEX IN] Ignoring reply from device ID {}", reply.device_id);
                continue;
            }
            if reply.address.value() < start || reply.end_address() > end {
                log::debug!(
                    "[SYSEX IN] Ignoring reply at {:#010x} outside the requested window",
                    reply.address.to_packed()
                );
                continue;
            }
            if !reply.checksum_ok() {
                log::warn!(
                    "[SYSEX IN] Checksum mismatch at {:#010x} (got {:#04x})",
                    reply.address.to_packed(),
                    reply.checksum.value()
                );
            }

            if let Err(e) = buffer.insert_reply(&reply) {
                log::debug!("[SYSEX IN] Dropping reply: {}", e);
            }
        }

        Ok(buffer)
    }

    /// Write `payload` at `base + offset`
    pub fn write(&self, base: BaseAddress, offset: u32, payload: &[u8]) -> Result<(), DeviceError> {
        let frame = build_write_request(base, offset, payload, self.device_id)?;
        self.send(&frame)
    }

    fn send(&self, bytes: &[u8]) -> Result<(), DeviceError> {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("[SYSEX OUT] {:02X?}", bytes);
        }
        self.output.send(bytes)?;
        Ok(())
    }

    fn next_frame(&self, deadline: Instant, timeout: Duration) -> Result<Vec<u8>, DeviceError> {
        self.replies
            .recv_deadline(deadline)
            .map_err(|_| DeviceError::Timeout(timeout))
    }

    /// Discard frames that arrived before the next request
    fn drain(&self) {
        let stale = self.replies.drain().count();
        if stale > 0 {
            log::debug!("[SYSEX IN] Discarded {} unsolicited frame(s)", stale);
        }
    }
}

impl std::fmt::Debug for IntegraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegraDevice")
            .field("name", &self.name)
            .field("device_id", &self.device_id)
            .finish()
    }
}
