use super::{IntError, SevenBit};

/// A 4-bit value (MIDI channel, part index)
///
/// Backed by a byte with the upper four bits always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nibble(u8);

impl Nibble {
    pub const ZERO: Self = Self(0);
    pub const MAX_VALUE: Self = Self(0x0F);

    /// Create from a raw byte, failing if any of the upper four bits are set
    pub fn new(value: u8) -> Result<Self, IntError> {
        Self::checked(value as u32)
    }

    /// Create from the low 4 bits of a raw byte
    pub const fn masked(value: u8) -> Self {
        Self(value & 0x0F)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl SevenBit for Nibble {
    const BITS: u32 = 4;

    fn get(self) -> u32 {
        self.0 as u32
    }

    fn truncate(value: u32) -> Self {
        Self((value & 0x0F) as u8)
    }
}

impl TryFrom<u8> for Nibble {
    type Error = IntError;

    fn try_from(value: u8) -> Result<Self, IntError> {
        Self::new(value)
    }
}

impl From<Nibble> for u8 {
    fn from(n: Nibble) -> u8 {
        n.0
    }
}
