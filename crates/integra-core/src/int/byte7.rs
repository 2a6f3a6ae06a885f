use super::{IntError, Nibble, SevenBit};

/// A 7-bit value stored in an 8-bit cell with bit 7 always clear
///
/// This is the unit of every SysEx data byte: the transport reserves the top
/// bit to tell status bytes from data bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Byte7(u8);

impl Byte7 {
    pub const ZERO: Self = Self(0);
    pub const MAX_VALUE: Self = Self(0x7F);

    /// Create from a raw byte, failing if bit 7 is set
    pub fn new(value: u8) -> Result<Self, IntError> {
        Self::checked(value as u32)
    }

    /// Create from the low 7 bits of a raw byte
    pub const fn masked(value: u8) -> Self {
        Self(value & 0x7F)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn as_u16(self) -> u16 {
        self.0 as u16
    }

    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }
}

impl SevenBit for Byte7 {
    const BITS: u32 = 7;

    fn get(self) -> u32 {
        self.0 as u32
    }

    fn truncate(value: u32) -> Self {
        Self((value & 0x7F) as u8)
    }
}

impl TryFrom<u8> for Byte7 {
    type Error = IntError;

    fn try_from(value: u8) -> Result<Self, IntError> {
        Self::new(value)
    }
}

impl From<Byte7> for u8 {
    fn from(v: Byte7) -> u8 {
        v.0
    }
}

impl From<Byte7> for u16 {
    fn from(v: Byte7) -> u16 {
        v.0 as u16
    }
}

impl From<Nibble> for Byte7 {
    fn from(n: Nibble) -> Self {
        Self(n.value())
    }
}
