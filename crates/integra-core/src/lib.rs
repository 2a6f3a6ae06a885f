//! Protocol core for the Roland INTEGRA-7 SysEx interface
//!
//! This crate is I/O free. It provides:
//! - Fixed-width 7-bit-safe integers ([`Nibble`], [`Byte7`], [`Short7`], [`Int7`])
//! - The SysEx codec (identity request/reply, RQ1/DT1 data frames, checksums)
//! - A sparse [`AddressSpaceBuffer`] for assembling data-set replies
//!
//! # Data flow
//!
//! ```text
//! BaseAddress + offset → Int7 address → RQ1 frame → device
//! device → DT1 frames → DataSet → AddressSpaceBuffer → caller
//! ```

pub mod address_space;
pub mod int;
pub mod protocol;

pub use address_space::{AddressSpaceBuffer, BufferError};
pub use int::{Byte7, Int7, IntError, Nibble, SevenBit, Short7};
pub use protocol::{
    build_identity_request, build_read_request, build_write_request, checksum,
    effective_address, parse_data_reply, parse_identity_reply, BaseAddress, DataRequest, DataSet,
    DeviceId, Frame, IdentityReply, ProtocolError,
};
