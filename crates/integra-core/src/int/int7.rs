use super::{Byte7, IntError, Short7, SevenBit};

/// A 28-bit value carried as four big-endian 7-bit digits
///
/// `msb * 0x80^3 + mmsb * 0x80^2 + mlsb * 0x80 + lsb`. This is the shape of
/// every device address and transfer size in the data-set protocol.
///
/// Addresses in the device documentation are written byte-packed, one digit
/// per byte (`0x18000600` is digits `18 00 06 00`); [`Int7::from_packed`] and
/// [`Int7::to_packed`] convert that notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int7 {
    msb: Byte7,
    mmsb: Byte7,
    mlsb: Byte7,
    lsb: Byte7,
}

impl Int7 {
    pub const ZERO: Self = Self::from_digits(Byte7::ZERO, Byte7::ZERO, Byte7::ZERO, Byte7::ZERO);

    /// Create from a plain value, failing above 0x0FFF_FFFF
    pub fn new(value: u32) -> Result<Self, IntError> {
        Self::checked(value)
    }

    pub const fn from_digits(msb: Byte7, mmsb: Byte7, mlsb: Byte7, lsb: Byte7) -> Self {
        Self {
            msb,
            mmsb,
            mlsb,
            lsb,
        }
    }

    /// Create from byte-packed notation, failing if any byte has bit 7 set
    pub fn from_packed(packed: u32) -> Result<Self, IntError> {
        if packed & 0x8080_8080 != 0 {
            return Err(IntError::OutOfRange {
                value: packed,
                bits: Self::BITS,
            });
        }
        let [msb, mmsb, mlsb, lsb] = packed.to_be_bytes();
        Ok(Self::from_digits(
            Byte7::masked(msb),
            Byte7::masked(mmsb),
            Byte7::masked(mlsb),
            Byte7::masked(lsb),
        ))
    }

    /// Byte-packed notation, one digit per byte
    pub const fn to_packed(self) -> u32 {
        u32::from_be_bytes(self.to_bytes())
    }

    pub const fn msb(self) -> Byte7 {
        self.msb
    }

    pub const fn mmsb(self) -> Byte7 {
        self.mmsb
    }

    pub const fn mlsb(self) -> Byte7 {
        self.mlsb
    }

    pub const fn lsb(self) -> Byte7 {
        self.lsb
    }

    pub const fn digits(self) -> [Byte7; 4] {
        [self.msb, self.mmsb, self.mlsb, self.lsb]
    }

    /// Digits as wire bytes, most significant first
    pub const fn to_bytes(self) -> [u8; 4] {
        [
            self.msb.value(),
            self.mmsb.value(),
            self.mlsb.value(),
            self.lsb.value(),
        ]
    }

    pub const fn value(self) -> u32 {
        ((self.msb.value() as u32) << 21)
            | ((self.mmsb.value() as u32) << 14)
            | ((self.mlsb.value() as u32) << 7)
            | self.lsb.value() as u32
    }
}

impl SevenBit for Int7 {
    const BITS: u32 = 28;

    fn get(self) -> u32 {
        self.value()
    }

    fn truncate(value: u32) -> Self {
        Self::from_digits(
            Byte7::truncate(value >> 21),
            Byte7::truncate(value >> 14),
            Byte7::truncate(value >> 7),
            Byte7::truncate(value),
        )
    }
}

impl From<Byte7> for Int7 {
    fn from(b: Byte7) -> Self {
        Self::from_digits(Byte7::ZERO, Byte7::ZERO, Byte7::ZERO, b)
    }
}

impl From<Short7> for Int7 {
    fn from(s: Short7) -> Self {
        Self::from_digits(Byte7::ZERO, Byte7::ZERO, s.msb(), s.lsb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_packed_notation() {
        let addr = Int7::from_packed(0x1800_0600).unwrap();
        assert_eq!(addr.to_bytes(), [0x18, 0x00, 0x06, 0x00]);
        assert_eq!(addr.to_packed(), 0x1800_0600);
        assert_eq!(addr.value(), (0x18 << 21) | (0x06 << 7));

        assert!(Int7::from_packed(0x0000_0080).is_err());
        assert!(Int7::from_packed(0x8000_0000).is_err());
    }

    #[test]
    fn test_add_carries_between_digits() {
        let addr = Int7::from_packed(0x1800_007F).unwrap();
        assert_eq!((addr + 1u8).to_packed(), 0x1800_0100);

        let max = Int7::new(0x0FFF_FFFF).unwrap();
        assert_eq!(max + 1u8, Int7::ZERO);
    }

    #[test]
    fn test_widening_from_smaller_types() {
        let s = Short7::new(0x3FFF).unwrap();
        assert_eq!(Int7::from(s).value(), 0x3FFF);
        assert_eq!(Int7::from(Byte7::MAX_VALUE), 0x7Fu32);
    }

    proptest! {
        #[test]
        fn prop_digit_round_trip(v in 0u32..=0x0FFF_FFFF) {
            let i = Int7::new(v).unwrap();
            prop_assert_eq!(Int7::from_digits(i.msb(), i.mmsb(), i.mlsb(), i.lsb()), i);
            prop_assert_eq!(i.value(), v);
        }

        #[test]
        fn prop_add_wraps_mod_2_28(a in 0u32..=0x0FFF_FFFF, b in 0u32..=0x0FFF_FFFF) {
            let sum = Int7::truncate(a) + Int7::truncate(b);
            prop_assert_eq!(sum.value(), (a + b) % 0x1000_0000);
        }
    }
}
