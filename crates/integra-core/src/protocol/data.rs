use super::{
    checksum, DeviceId, ProtocolError, CMD_DT1, CMD_RQ1, MODEL_ID, ROLAND_ID, SYSEX_END,
    SYSEX_START,
};
use crate::int::{Byte7, Int7};

/// F0, manufacturer, device ID, three model ID bytes, command
const HEADER_LEN: usize = 7;
const ADDRESS_LEN: usize = 4;
/// Checksum and F7
const TRAILER_LEN: usize = 2;
const REQUEST_LEN: usize = HEADER_LEN + ADDRESS_LEN * 2 + TRAILER_LEN;

/// RQ1: ask the device for `size` bytes starting at `address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub device_id: DeviceId,
    pub address: Int7,
    pub size: Int7,
}

impl DataRequest {
    pub fn encode(&self) -> Vec<u8> {
        let size = self.size.to_bytes();
        let mut frame = Vec::with_capacity(REQUEST_LEN);
        push_header(&mut frame, self.device_id, CMD_RQ1);
        frame.extend_from_slice(&self.address.to_bytes());
        frame.extend_from_slice(&size);
        frame.push(checksum(self.address, &size).value());
        frame.push(SYSEX_END);
        frame
    }

    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != REQUEST_LEN {
            return None;
        }
        let device_id = parse_header(bytes, CMD_RQ1)?;
        Some(Self {
            device_id,
            address: read_int7(&bytes[HEADER_LEN..])?,
            size: read_int7(&bytes[HEADER_LEN + ADDRESS_LEN..])?,
        })
    }
}

/// DT1: `payload` stored at `address`
///
/// Sent to write parameters and received as the answer to an RQ1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    pub device_id: DeviceId,
    pub address: Int7,
    pub payload: Vec<u8>,
    /// Checksum byte as carried on the wire
    pub checksum: Byte7,
}

impl DataSet {
    /// Build a frame to send, validating the payload and computing the checksum
    pub fn new(device_id: DeviceId, address: Int7, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if let Some((index, &value)) = payload.iter().enumerate().find(|(_, b)| **b & 0x80 != 0) {
            return Err(ProtocolError::PayloadOutOfRange { index, value });
        }
        Ok(Self {
            device_id,
            address,
            checksum: checksum(address, &payload),
            payload,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_LEN + ADDRESS_LEN + self.payload.len() + TRAILER_LEN);
        push_header(&mut frame, self.device_id, CMD_DT1);
        frame.extend_from_slice(&self.address.to_bytes());
        frame.extend_from_slice(&self.payload);
        frame.push(self.checksum.value());
        frame.push(SYSEX_END);
        frame
    }

    /// Decode a received frame
    ///
    /// The checksum is carried as-is and not verified; see [`DataSet::checksum_ok`].
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN + ADDRESS_LEN + TRAILER_LEN {
            return None;
        }
        let device_id = parse_header(bytes, CMD_DT1)?;
        let checksum_at = bytes.len() - TRAILER_LEN;
        Some(Self {
            device_id,
            address: read_int7(&bytes[HEADER_LEN..])?,
            payload: bytes[HEADER_LEN + ADDRESS_LEN..checksum_at].to_vec(),
            checksum: Byte7::masked(bytes[checksum_at]),
        })
    }

    /// Whether the carried checksum matches the address and payload
    pub fn checksum_ok(&self) -> bool {
        checksum(self.address, &self.payload) == self.checksum
    }

    /// Linear address one past the last payload byte
    pub fn end_address(&self) -> u32 {
        self.address.value() + self.payload.len() as u32
    }
}

fn push_header(frame: &mut Vec<u8>, device_id: DeviceId, command: u8) {
    frame.push(SYSEX_START);
    frame.push(ROLAND_ID);
    frame.push(device_id.byte().value());
    frame.extend_from_slice(&MODEL_ID);
    frame.push(command);
}

/// Validate delimiters, manufacturer, model and command; return the device ID
fn parse_header(bytes: &[u8], command: u8) -> Option<DeviceId> {
    if bytes[0] != SYSEX_START
        || bytes[1] != ROLAND_ID
        || bytes[3..6] != MODEL_ID
        || bytes[6] != command
        || bytes[bytes.len() - 1] != SYSEX_END
    {
        return None;
    }
    DeviceId::new(bytes[2])
}

fn read_int7(bytes: &[u8]) -> Option<Int7> {
    match bytes {
        [msb, mmsb, mlsb, lsb, ..] => Some(Int7::from_digits(
            Byte7::masked(*msb),
            Byte7::masked(*mmsb),
            Byte7::masked(*mlsb),
            Byte7::masked(*lsb),
        )),
        _ => None,
    }
}
