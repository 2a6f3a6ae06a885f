//! Roland SysEx codec
//!
//! Builds and parses the frames the synthesizer understands:
//!
//! ```text
//! Identity Request   F0 7E 7F 06 01 F7
//! Identity Reply     F0 7E dev 06 02 mfr famLo famHi numLo numHi r0 r1 r2 r3 F7
//! Data Request 1     F0 41 dev 00 00 64 11 a3 a2 a1 a0 s3 s2 s1 s0 cs F7
//! Data Set 1         F0 41 dev 00 00 64 12 a3 a2 a1 a0 data... cs F7
//! ```
//!
//! Every byte between the delimiters has bit 7 clear. Parsers return `None`
//! on any mismatch so callers can try them in sequence; [`Frame::parse`] does
//! exactly that.

mod address;
mod channel;
mod data;
mod identity;

pub use address::{effective_address, BaseAddress};
pub use channel::{note_off, note_on};
pub use data::{DataRequest, DataSet};
pub use identity::IdentityReply;

use crate::int::{Byte7, Int7, IntError};

/// SysEx start delimiter
pub const SYSEX_START: u8 = 0xF0;
/// SysEx end delimiter
pub const SYSEX_END: u8 = 0xF7;
/// Universal non-realtime SysEx ID
pub const UNIVERSAL_NON_REALTIME: u8 = 0x7E;
/// Broadcast device ID / "all call" channel
pub const BROADCAST: u8 = 0x7F;
/// Roland manufacturer ID
pub const ROLAND_ID: u8 = 0x41;
/// Model ID that follows the device ID in data-set frames
pub const MODEL_ID: [u8; 3] = [0x00, 0x00, 0x64];
/// Data Request 1 command
pub const CMD_RQ1: u8 = 0x11;
/// Data Set 1 command
pub const CMD_DT1: u8 = 0x12;

/// Error type for frame construction and decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("offset {offset:#x} is outside the addressable range of {base:?}")]
    OffsetOutOfRange { base: BaseAddress, offset: u32 },

    #[error("payload byte {value:#04x} at index {index} has bit 7 set")]
    PayloadOutOfRange { index: usize, value: u8 },

    #[error(transparent)]
    Int(#[from] IntError),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Protocol-level device address (front-panel device ID 17-32, or broadcast)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(Byte7);

impl DeviceId {
    /// Factory setting, shown as "17" on the device
    pub const DEFAULT: Self = Self(Byte7::masked(0x10));
    pub const BROADCAST: Self = Self(Byte7::masked(BROADCAST));

    /// Resolve a raw ID byte: 0x10..=0x1F or the broadcast value 0x7F
    pub fn new(raw: u8) -> Option<Self> {
        match raw {
            0x10..=0x1F | BROADCAST => Some(Self(Byte7::masked(raw))),
            _ => None,
        }
    }

    pub fn byte(self) -> Byte7 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self.0 == BROADCAST
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_broadcast() {
            write!(f, "broadcast")
        } else {
            write!(f, "{}", self.0.value() - 0x10 + 17)
        }
    }
}

/// Checksum over address digits and data bytes
///
/// Chosen so that `(sum(address) + sum(data) + checksum) % 128 == 0`.
pub fn checksum(address: Int7, data: &[u8]) -> Byte7 {
    let total = address
        .digits()
        .into_iter()
        .fold(Byte7::ZERO, |acc, digit| acc + digit);
    let total = data.iter().fold(total, |acc, &byte| acc + byte);
    match total.value() {
        0 => Byte7::ZERO,
        remainder => Byte7::masked(0x80 - remainder),
    }
}

/// Whether a raw message is a complete SysEx frame
pub fn is_sysex(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == SYSEX_START && bytes[bytes.len() - 1] == SYSEX_END
}

/// Every frame shape this codec understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    IdentityRequest,
    IdentityReply(IdentityReply),
    DataRequest(DataRequest),
    DataSet(DataSet),
}

impl Frame {
    /// Try each decoder in turn and return the first match
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if identity::is_identity_request(bytes) {
            return Some(Self::IdentityRequest);
        }
        IdentityReply::parse(bytes)
            .map(Self::IdentityReply)
            .or_else(|| DataRequest::parse(bytes).map(Self::DataRequest))
            .or_else(|| DataSet::parse(bytes).map(Self::DataSet))
    }

    /// Like [`Frame::parse`], with a reason on failure
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::parse(bytes).ok_or_else(|| ProtocolError::MalformedFrame(describe(bytes)))
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::IdentityRequest => build_identity_request(),
            Self::IdentityReply(reply) => reply.encode(),
            Self::DataRequest(request) => request.encode(),
            Self::DataSet(set) => set.encode(),
        }
    }
}

fn describe(bytes: &[u8]) -> String {
    if !is_sysex(bytes) {
        return format!("{} bytes without F0..F7 delimiters", bytes.len());
    }
    match bytes.get(1) {
        Some(&UNIVERSAL_NON_REALTIME) => format!("unrecognized universal message ({} bytes)", bytes.len()),
        Some(&ROLAND_ID) => format!("unrecognized Roland message ({} bytes)", bytes.len()),
        Some(id) => format!("unknown manufacturer {:#04x}", id),
        None => "empty frame".to_string(),
    }
}

/// `F0 7E 7F 06 01 F7`
pub fn build_identity_request() -> Vec<u8> {
    identity::IDENTITY_REQUEST.to_vec()
}

pub fn parse_identity_reply(bytes: &[u8]) -> Option<IdentityReply> {
    IdentityReply::parse(bytes)
}

/// Build an RQ1 frame asking for `size` bytes at `base + offset`
pub fn build_read_request(
    base: BaseAddress,
    offset: u32,
    size: u32,
    device_id: DeviceId,
) -> Result<Vec<u8>, ProtocolError> {
    let request = DataRequest {
        device_id,
        address: effective_address(base, offset)?,
        size: Int7::new(size)?,
    };
    Ok(request.encode())
}

/// Build a DT1 frame writing `payload` at `base + offset`
pub fn build_write_request(
    base: BaseAddress,
    offset: u32,
    payload: &[u8],
    device_id: DeviceId,
) -> Result<Vec<u8>, ProtocolError> {
    let set = DataSet::new(device_id, effective_address(base, offset)?, payload.to_vec())?;
    Ok(set.encode())
}

pub fn parse_data_reply(bytes: &[u8]) -> Option<DataSet> {
    DataSet::parse(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_device_id_resolution() {
        assert_eq!(DeviceId::new(0x10), Some(DeviceId::DEFAULT));
        assert!(DeviceId::new(0x1F).is_some());
        assert_eq!(DeviceId::new(0x7F), Some(DeviceId::BROADCAST));
        assert_eq!(DeviceId::new(0x0F), None);
        assert_eq!(DeviceId::new(0x20), None);

        assert_eq!(DeviceId::DEFAULT.to_string(), "17");
        assert_eq!(DeviceId::new(0x1F).unwrap().to_string(), "32");
        assert_eq!(DeviceId::BROADCAST.to_string(), "broadcast");
    }

    #[test]
    fn test_checksum_vector() {
        let address = effective_address(BaseAddress::TemporaryStudioSet, 0x00_0600).unwrap();
        assert_eq!(address.to_packed(), 0x1800_0600);
        assert_eq!(checksum(address, &[0x02]), Byte7::masked(0x60));
    }

    #[test]
    fn test_checksum_zero_remainder() {
        // 0x40 + 0x40 == 0x80 -> remainder 0
        let address = Int7::from_packed(0x4000_0000).unwrap();
        assert_eq!(checksum(address, &[0x40]), Byte7::ZERO);
    }

    #[test]
    fn test_build_read_request() {
        let frame = build_read_request(
            BaseAddress::TemporaryStudioSet,
            0x00_0600,
            0x40,
            DeviceId::DEFAULT,
        )
        .unwrap();
        assert_eq!(
            frame,
            vec![
                0xF0, 0x41, 0x10, 0x00, 0x00, 0x64, 0x11, 0x18, 0x00, 0x06, 0x00, 0x00, 0x00,
                0x00, 0x40, 0x22, 0xF7
            ]
        );
    }

    #[test]
    fn test_build_write_request() {
        let frame = build_write_request(
            BaseAddress::TemporaryStudioSet,
            0x00_0600,
            &[0x02],
            DeviceId::DEFAULT,
        )
        .unwrap();
        assert_eq!(
            frame,
            vec![0xF0, 0x41, 0x10, 0x00, 0x00, 0x64, 0x12, 0x18, 0x00, 0x06, 0x00, 0x02, 0x60, 0xF7]
        );
    }

    #[test]
    fn test_requests_reject_out_of_range() {
        let err = build_read_request(BaseAddress::System, 0x0100_0000, 1, DeviceId::DEFAULT);
        assert!(matches!(err, Err(ProtocolError::OffsetOutOfRange { .. })));

        let err = build_read_request(BaseAddress::System, 0, 0x1000_0000, DeviceId::DEFAULT);
        assert!(matches!(err, Err(ProtocolError::Int(IntError::OutOfRange { .. }))));

        let err = build_write_request(BaseAddress::System, 0, &[0x01, 0x80], DeviceId::DEFAULT);
        assert_eq!(
            err,
            Err(ProtocolError::PayloadOutOfRange {
                index: 1,
                value: 0x80
            })
        );
    }

    #[test]
    fn test_frame_parse_takes_first_match() {
        assert_eq!(
            Frame::parse(&build_identity_request()),
            Some(Frame::IdentityRequest)
        );

        let reply = [
            0xF0, 0x7E, 0x10, 0x06, 0x02, 0x41, 0x64, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0xF7,
        ];
        assert!(matches!(Frame::parse(&reply), Some(Frame::IdentityReply(_))));

        let read = build_read_request(BaseAddress::Setup, 0, 1, DeviceId::DEFAULT).unwrap();
        assert!(matches!(Frame::parse(&read), Some(Frame::DataRequest(_))));

        let write = build_write_request(BaseAddress::Setup, 0, &[1, 2], DeviceId::DEFAULT).unwrap();
        match Frame::parse(&write) {
            Some(Frame::DataSet(set)) => assert_eq!(set.payload, vec![1, 2]),
            other => panic!("Expected DataSet, got {:?}", other),
        }

        assert_eq!(Frame::parse(&[0x90, 0x3C, 0x7F]), None);
        assert!(matches!(
            Frame::decode(&[0xF0, 0x43, 0x00, 0xF7]),
            Err(ProtocolError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_frame_encode_matches_builders() {
        let write = build_write_request(BaseAddress::System, 0x10, &[5], DeviceId::DEFAULT).unwrap();
        let frame = Frame::decode(&write).unwrap();
        assert_eq!(frame.encode(), write);
    }

    proptest! {
        #[test]
        fn prop_checksum_zeroes_sum(
            address in 0u32..=0x0FFF_FFFF,
            data in prop::collection::vec(0u8..0x80, 0..32),
        ) {
            let address = Int7::new(address).unwrap();
            let cs = checksum(address, &data);
            let total: u32 = address.to_bytes().iter().map(|&b| b as u32).sum::<u32>()
                + data.iter().map(|&b| b as u32).sum::<u32>()
                + cs.as_u32();
            prop_assert_eq!(total % 128, 0);
            prop_assert!(cs.value() < 0x80);
        }
    }
}
