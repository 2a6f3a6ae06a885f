use super::{Byte7, IntError, SevenBit};

/// A 14-bit value carried as two 7-bit digits, `msb * 0x80 + lsb`
#[derive(Debug, Clone, Copy, Default)]
pub struct Short7 {
    msb: Byte7,
    lsb: Byte7,
}

impl Short7 {
    pub const ZERO: Self = Self {
        msb: Byte7::ZERO,
        lsb: Byte7::ZERO,
    };

    /// Create from a plain value, failing above 0x3FFF
    pub fn new(value: u16) -> Result<Self, IntError> {
        Self::checked(value as u32)
    }

    pub const fn from_digits(msb: Byte7, lsb: Byte7) -> Self {
        Self { msb, lsb }
    }

    pub const fn msb(self) -> Byte7 {
        self.msb
    }

    pub const fn lsb(self) -> Byte7 {
        self.lsb
    }

    pub const fn value(self) -> u16 {
        ((self.msb.value() as u16) << 7) | self.lsb.value() as u16
    }
}

impl SevenBit for Short7 {
    const BITS: u32 = 14;

    fn get(self) -> u32 {
        self.value() as u32
    }

    fn truncate(value: u32) -> Self {
        Self {
            msb: Byte7::truncate(value >> 7),
            lsb: Byte7::truncate(value),
        }
    }
}

impl From<Short7> for u16 {
    fn from(v: Short7) -> u16 {
        v.value()
    }
}

impl From<Byte7> for Short7 {
    fn from(b: Byte7) -> Self {
        Self::from_digits(Byte7::ZERO, b)
    }
}
