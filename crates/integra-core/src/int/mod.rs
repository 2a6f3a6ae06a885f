//! Fixed-width unsigned integers for 7-bit MIDI data
//!
//! Every byte inside a SysEx frame must keep its top bit clear, so the
//! protocol carries numbers as big-endian sequences of 7-bit digits.
//! These types keep that invariant in the type system:
//!
//! - [`Nibble`] - 4 bits (MIDI channel, part index)
//! - [`Byte7`] - 7 bits in an 8-bit cell
//! - [`Short7`] - 14 bits as two `Byte7` digits
//! - [`Int7`] - 28 bits as four `Byte7` digits (device addresses and sizes)
//!
//! All arithmetic wraps at the type's width. Mixed arithmetic and comparison
//! (between these types and with machine integers) go through the plain
//! unsigned value, never through the digit bytes.

mod byte7;
mod int7;
mod nibble;
mod short7;

pub use byte7::Byte7;
pub use int7::Int7;
pub use nibble::Nibble;
pub use short7::Short7;

use std::cmp::Ordering;

/// Error type for bounded integer construction and arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntError {
    #[error("value {value:#x} does not fit in {bits} bits")]
    OutOfRange { value: u32, bits: u32 },

    #[error("division by zero")]
    DivideByZero,
}

/// Common interface of the bounded-width integers
///
/// `get` returns the plain unsigned value; `truncate` masks an arbitrary
/// `u32` down to the type's width. Together they define every operator.
pub trait SevenBit: Copy + Sized {
    /// Number of significant bits
    const BITS: u32;
    /// Largest representable value
    const MAX: u32 = (1 << Self::BITS) - 1;

    /// Plain unsigned value
    fn get(self) -> u32;

    /// Build from the low `BITS` bits of `value` (lossy)
    fn truncate(value: u32) -> Self;

    /// Build from `value`, failing if it does not fit
    fn checked(value: u32) -> Result<Self, IntError> {
        if value > Self::MAX {
            Err(IntError::OutOfRange {
                value,
                bits: Self::BITS,
            })
        } else {
            Ok(Self::truncate(value))
        }
    }
}

macro_rules! impl_seven_bit_ops {
    ($($ty:ident),+ $(,)?) => {$(
        impl<T: Into<u32>> std::ops::Add<T> for $ty {
            type Output = Self;
            fn add(self, rhs: T) -> Self {
                Self::truncate(self.get().wrapping_add(rhs.into()))
            }
        }

        impl<T: Into<u32>> std::ops::Sub<T> for $ty {
            type Output = Self;
            fn sub(self, rhs: T) -> Self {
                Self::truncate(self.get().wrapping_sub(rhs.into()))
            }
        }

        impl<T: Into<u32>> std::ops::Mul<T> for $ty {
            type Output = Self;
            fn mul(self, rhs: T) -> Self {
                Self::truncate(self.get().wrapping_mul(rhs.into()))
            }
        }

        impl<T: Into<u32>> std::ops::BitAnd<T> for $ty {
            type Output = Self;
            fn bitand(self, rhs: T) -> Self {
                Self::truncate(self.get() & rhs.into())
            }
        }

        impl<T: Into<u32>> std::ops::BitOr<T> for $ty {
            type Output = Self;
            fn bitor(self, rhs: T) -> Self {
                Self::truncate(self.get() | rhs.into())
            }
        }

        impl<T: Into<u32>> std::ops::BitXor<T> for $ty {
            type Output = Self;
            fn bitxor(self, rhs: T) -> Self {
                Self::truncate(self.get() ^ rhs.into())
            }
        }

        impl<T: Into<u32>> std::ops::AddAssign<T> for $ty {
            fn add_assign(&mut self, rhs: T) {
                *self = *self + rhs;
            }
        }

        impl<T: Into<u32>> std::ops::SubAssign<T> for $ty {
            fn sub_assign(&mut self, rhs: T) {
                *self = *self - rhs;
            }
        }

        /// Flips only the significant bits
        impl std::ops::Not for $ty {
            type Output = Self;
            fn not(self) -> Self {
                Self::truncate(!self.get())
            }
        }

        impl $ty {
            /// Bitwise complement within the type's width
            pub fn complement(self) -> Self {
                !self
            }

            /// Integer division, failing on a zero divisor
            pub fn try_div<T: Into<u32>>(self, rhs: T) -> Result<Self, IntError> {
                match rhs.into() {
                    0 => Err(IntError::DivideByZero),
                    d => Ok(Self::truncate(self.get() / d)),
                }
            }

            /// Remainder, failing on a zero divisor
            pub fn try_rem<T: Into<u32>>(self, rhs: T) -> Result<Self, IntError> {
                match rhs.into() {
                    0 => Err(IntError::DivideByZero),
                    d => Ok(Self::truncate(self.get() % d)),
                }
            }
        }

        impl From<$ty> for u32 {
            fn from(v: $ty) -> u32 {
                v.get()
            }
        }

        impl From<$ty> for u64 {
            fn from(v: $ty) -> u64 {
                v.get() as u64
            }
        }

        impl From<$ty> for usize {
            fn from(v: $ty) -> usize {
                v.get() as usize
            }
        }

        impl TryFrom<u32> for $ty {
            type Error = IntError;
            fn try_from(value: u32) -> Result<Self, IntError> {
                Self::checked(value)
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.get() == other.get()
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.get().cmp(&other.get())
            }
        }

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.get().hash(state);
            }
        }

        impl PartialEq<u32> for $ty {
            fn eq(&self, other: &u32) -> bool {
                self.get() == *other
            }
        }

        impl PartialOrd<u32> for $ty {
            fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
                self.get().partial_cmp(other)
            }
        }

        impl PartialEq<$ty> for u32 {
            fn eq(&self, other: &$ty) -> bool {
                *self == other.get()
            }
        }

        impl PartialOrd<$ty> for u32 {
            fn partial_cmp(&self, other: &$ty) -> Option<Ordering> {
                self.partial_cmp(&other.get())
            }
        }

        impl PartialEq<u8> for $ty {
            fn eq(&self, other: &u8) -> bool {
                self.get() == *other as u32
            }
        }

        impl PartialOrd<u8> for $ty {
            fn partial_cmp(&self, other: &u8) -> Option<Ordering> {
                self.get().partial_cmp(&(*other as u32))
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.get(), f)
            }
        }

        impl std::fmt::LowerHex for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::LowerHex::fmt(&self.get(), f)
            }
        }

        impl std::fmt::UpperHex for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::UpperHex::fmt(&self.get(), f)
            }
        }
    )+};
}

impl_seven_bit_ops!(Nibble, Byte7, Short7, Int7);

macro_rules! impl_cross_cmp {
    ($lhs:ident => $($rhs:ident),+) => {$(
        impl PartialEq<$rhs> for $lhs {
            fn eq(&self, other: &$rhs) -> bool {
                self.get() == other.get()
            }
        }

        impl PartialOrd<$rhs> for $lhs {
            fn partial_cmp(&self, other: &$rhs) -> Option<Ordering> {
                self.get().partial_cmp(&other.get())
            }
        }
    )+};
}

impl_cross_cmp!(Nibble => Byte7, Short7, Int7);
impl_cross_cmp!(Byte7 => Nibble, Short7, Int7);
impl_cross_cmp!(Short7 => Nibble, Byte7, Int7);
impl_cross_cmp!(Int7 => Nibble, Byte7, Short7);
