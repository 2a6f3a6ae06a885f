use super::{DeviceId, BROADCAST, SYSEX_END, SYSEX_START, UNIVERSAL_NON_REALTIME};
use crate::int::{Byte7, Short7};

pub(super) const IDENTITY_REQUEST: [u8; 6] = [
    SYSEX_START,
    UNIVERSAL_NON_REALTIME,
    BROADCAST,
    SUB_ID_GENERAL_INFO,
    SUB_ID_IDENTITY_REQUEST,
    SYSEX_END,
];

const SUB_ID_GENERAL_INFO: u8 = 0x06;
const SUB_ID_IDENTITY_REQUEST: u8 = 0x01;
const SUB_ID_IDENTITY_REPLY: u8 = 0x02;

/// Bytes after the leading F0, up to and including F7
const IDENTITY_REPLY_BODY_LEN: usize = 14;

/// Decoded universal Identity Reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityReply {
    pub device_id: DeviceId,
    pub manufacturer: Byte7,
    /// Device family code (sent LSB first)
    pub family: Short7,
    /// Device family number (sent LSB first)
    pub family_number: Short7,
    pub revision: [Byte7; 4],
}

impl IdentityReply {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let body = bytes.strip_prefix(&[SYSEX_START])?;
        if body.len() != IDENTITY_REPLY_BODY_LEN
            || body[0] != UNIVERSAL_NON_REALTIME
            || body[2..4] != [SUB_ID_GENERAL_INFO, SUB_ID_IDENTITY_REPLY]
            || body[13] != SYSEX_END
        {
            return None;
        }

        let device_id = DeviceId::new(body[1])?;
        let digit = |i: usize| Byte7::new(body[i]).ok();

        Some(Self {
            device_id,
            manufacturer: digit(4)?,
            family: Short7::from_digits(digit(6)?, digit(5)?),
            family_number: Short7::from_digits(digit(8)?, digit(7)?),
            revision: [digit(9)?, digit(10)?, digit(11)?, digit(12)?],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(IDENTITY_REPLY_BODY_LEN + 1);
        frame.extend_from_slice(&[
            SYSEX_START,
            UNIVERSAL_NON_REALTIME,
            self.device_id.byte().value(),
            SUB_ID_GENERAL_INFO,
            SUB_ID_IDENTITY_REPLY,
            self.manufacturer.value(),
            self.family.lsb().value(),
            self.family.msb().value(),
            self.family_number.lsb().value(),
            self.family_number.msb().value(),
        ]);
        frame.extend(self.revision.iter().map(|r| r.value()));
        frame.push(SYSEX_END);
        frame
    }
}

pub(super) fn is_identity_request(bytes: &[u8]) -> bool {
    matches!(
        bytes,
        [SYSEX_START, UNIVERSAL_NON_REALTIME, channel, SUB_ID_GENERAL_INFO, SUB_ID_IDENTITY_REQUEST, SYSEX_END]
            if *channel < 0x80
    )
}
