use super::ProtocolError;
use crate::int::{Byte7, Int7, Nibble};

const SETUP: Int7 = digits(0x01, 0x00);
const SYSTEM: Int7 = digits(0x02, 0x00);
const TEMPORARY_STUDIO_SET: Int7 = digits(0x18, 0x00);
const TEMPORARY_TONE: Int7 = digits(0x19, 0x00);
/// Distance between two parts' temporary tone blocks (packed 00 20 00 00)
const TEMPORARY_TONE_STRIDE: Int7 = digits(0x00, 0x20);

/// Offsets must fit in the low three digits
const OFFSET_LIMIT: u32 = 0x0100_0000;

const fn digits(msb: u8, mmsb: u8) -> Int7 {
    Int7::from_digits(Byte7::masked(msb), Byte7::masked(mmsb), Byte7::ZERO, Byte7::ZERO)
}

/// Symbolic memory region that requests are relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseAddress {
    /// 01 00 00 00
    Setup,
    /// 02 00 00 00
    System,
    /// 18 00 00 00
    TemporaryStudioSet,
    /// 19 00 00 00 for part index 0, then every 00 20 00 00
    TemporaryTone(Nibble),
}

impl BaseAddress {
    pub fn address(self) -> Int7 {
        match self {
            Self::Setup => SETUP,
            Self::System => SYSTEM,
            Self::TemporaryStudioSet => TEMPORARY_STUDIO_SET,
            Self::TemporaryTone(part) => TEMPORARY_TONE + TEMPORARY_TONE_STRIDE * part,
        }
    }
}

/// `base + offset` with 28-bit wraparound
///
/// `offset` is in byte-packed notation and must fit in the low three digits.
pub fn effective_address(base: BaseAddress, offset: u32) -> Result<Int7, ProtocolError> {
    if offset >= OFFSET_LIMIT {
        return Err(ProtocolError::OffsetOutOfRange { base, offset });
    }
    let offset_digits =
        Int7::from_packed(offset).map_err(|_| ProtocolError::OffsetOutOfRange { base, offset })?;
    Ok(base.address() + offset_digits)
}
