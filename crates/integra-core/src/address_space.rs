//! Sparse byte store keyed by linear device address
//!
//! Data-set replies arrive as scattered chunks (one per DT1 frame). The buffer
//! keeps them in non-overlapping, address-ordered chunks and serves point and
//! range reads over whatever has been covered so far.
//!
//! Chunks that touch end-to-start are coalesced on insert, so any range that
//! is fully covered always lies inside a single chunk. Inserting over bytes
//! that are already covered is rejected with [`BufferError::Unsupported`].

use crate::protocol::DataSet;
use std::collections::BTreeMap;
use std::ops::Range;

/// Error type for address-space operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("address {0:#x} has not been written")]
    Uncovered(u32),

    #[error("unsupported buffer operation: {0}")]
    Unsupported(String),

    #[error("chunk at {addr:#x} with {len} bytes exceeds the address space")]
    OutOfRange { addr: u32, len: usize },
}

/// Sparse, range-indexed byte store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSpaceBuffer {
    /// Chunk start address -> chunk bytes. Ranges never overlap or touch.
    chunks: BTreeMap<u32, Vec<u8>>,
    /// One past the highest address ever written
    size: u32,
}

impl AddressSpaceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with one initial chunk at `base`
    pub fn from_chunk(base: impl Into<u32>, bytes: Vec<u8>) -> Result<Self, BufferError> {
        let mut buffer = Self::new();
        let base = base.into();
        let end = chunk_end(base, bytes.len())?;
        if !bytes.is_empty() {
            buffer.chunks.insert(base, bytes);
            buffer.size = end;
        }
        Ok(buffer)
    }

    /// One past the highest address ever written
    pub fn len(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Lowest covered address
    pub fn start(&self) -> Option<u32> {
        self.chunks.keys().next().copied()
    }

    /// Number of bytes actually covered (gaps excluded)
    pub fn covered(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    pub fn contains(&self, addr: impl Into<u32>) -> bool {
        self.chunk_at(addr.into()).is_some()
    }

    /// Read one byte
    pub fn get(&self, addr: impl Into<u32>) -> Result<u8, BufferError> {
        let addr = addr.into();
        self.chunk_at(addr)
            .map(|(start, bytes)| bytes[(addr - start) as usize])
            .ok_or(BufferError::Uncovered(addr))
    }

    /// Read a half-open range; every byte must have been written
    pub fn get_range(&self, range: Range<u32>) -> Result<&[u8], BufferError> {
        if range.is_empty() {
            return Ok(&[]);
        }
        let (start, bytes) = self
            .chunk_at(range.start)
            .ok_or(BufferError::Uncovered(range.start))?;
        let chunk_end = start + bytes.len() as u32;
        if range.end > chunk_end {
            // Adjacent chunks are always merged, so whatever follows is a gap
            return Err(BufferError::Uncovered(chunk_end));
        }
        Ok(&bytes[(range.start - start) as usize..(range.end - start) as usize])
    }

    /// Insert a contiguous chunk at `addr`
    ///
    /// The chunk must not overlap anything already written. Chunks that touch
    /// an existing one are merged with it.
    pub fn insert(&mut self, addr: impl Into<u32>, bytes: &[u8]) -> Result<(), BufferError> {
        let addr = addr.into();
        let end = chunk_end(addr, bytes.len())?;
        if bytes.is_empty() {
            return Ok(());
        }

        // Only the chunk starting before `end` with the highest start can overlap
        if let Some((&start, existing)) = self.chunks.range(..end).next_back() {
            let existing_end = start + existing.len() as u32;
            if existing_end > addr {
                return Err(BufferError::Unsupported(format!(
                    "insert {:#x}..{:#x} overlaps written range {:#x}..{:#x}",
                    addr, end, start, existing_end
                )));
            }
        }

        let mut merged_start = addr;
        let mut merged = Vec::with_capacity(bytes.len());

        let preceding = self
            .chunks
            .range(..addr)
            .next_back()
            .filter(|(start, existing)| **start + existing.len() as u32 == addr)
            .map(|(start, _)| *start);
        if let Some(start) = preceding {
            if let Some(existing) = self.chunks.remove(&start) {
                merged_start = start;
                merged = existing;
            }
        }

        merged.extend_from_slice(bytes);

        if let Some(following) = self.chunks.remove(&end) {
            merged.extend_from_slice(&following);
        }

        self.chunks.insert(merged_start, merged);
        self.size = self.size.max(end);
        Ok(())
    }

    /// Insert at the current end of the buffer
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.insert(self.size, bytes)
    }

    /// Insert the payload of a decoded data-set frame at its address
    pub fn insert_reply(&mut self, reply: &DataSet) -> Result<(), BufferError> {
        self.insert(reply.address, &reply.payload)
    }

    /// Every covered byte with its address, ascending
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.chunks.iter().flat_map(|(&start, bytes)| {
            bytes
                .iter()
                .enumerate()
                .map(move |(i, &b)| (start + i as u32, b))
        })
    }

    /// Covered chunks with their address ranges, ascending
    pub fn chunks(&self) -> impl Iterator<Item = (Range<u32>, &[u8])> + '_ {
        self.chunks
            .iter()
            .map(|(&start, bytes)| (start..start + bytes.len() as u32, bytes.as_slice()))
    }

    /// Dense copy from the lowest covered address to `len()`, gaps as 0x00
    pub fn to_dense(&self) -> Vec<u8> {
        let Some(base) = self.start() else {
            return Vec::new();
        };
        let mut dense = vec![0u8; (self.size - base) as usize];
        for (start, bytes) in &self.chunks {
            let offset = (start - base) as usize;
            dense[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        dense
    }

    fn chunk_at(&self, addr: u32) -> Option<(u32, &[u8])> {
        self.chunks
            .range(..=addr)
            .next_back()
            .filter(|(start, bytes)| addr < **start + bytes.len() as u32)
            .map(|(&start, bytes)| (start, bytes.as_slice()))
    }
}

fn chunk_end(addr: u32, len: usize) -> Result<u32, BufferError> {
    u32::try_from(len)
        .ok()
        .and_then(|len| addr.checked_add(len))
        .ok_or(BufferError::OutOfRange { addr, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::Int7;
    use proptest::prelude::*;

    #[test]
    fn test_empty_buffer() {
        let buffer = AddressSpaceBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.get(0u32), Err(BufferError::Uncovered(0)));
        assert!(buffer.to_dense().is_empty());
    }

    #[test]
    fn test_from_chunk() {
        let buffer = AddressSpaceBuffer::from_chunk(0x100u32, vec![1, 2, 3]).unwrap();
        assert_eq!(buffer.len(), 0x103);
        assert_eq!(buffer.start(), Some(0x100));
        assert_eq!(buffer.get(0x101u32), Ok(2));
        assert_eq!(buffer.get(0xFFu32), Err(BufferError::Uncovered(0xFF)));
    }

    #[test]
    fn test_insert_then_read_back() {
        let mut buffer = AddressSpaceBuffer::new();
        buffer.insert(0x10u32, &[0xA, 0xB, 0xC, 0xD]).unwrap();
        assert_eq!(buffer.get_range(0x10..0x14), Ok(&[0xA, 0xB, 0xC, 0xD][..]));
        assert_eq!(buffer.get_range(0x11..0x13), Ok(&[0xB, 0xC][..]));
        assert_eq!(buffer.get(0x14u32), Err(BufferError::Uncovered(0x14)));
    }

    #[test]
    fn test_gap_reads_fail() {
        let mut buffer = AddressSpaceBuffer::new();
        buffer.insert(0u32, &[1, 2]).unwrap();
        buffer.insert(4u32, &[5, 6]).unwrap();

        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.covered(), 4);
        assert_eq!(buffer.get(2u32), Err(BufferError::Uncovered(2)));
        assert_eq!(buffer.get_range(0..6), Err(BufferError::Uncovered(2)));
        assert_eq!(buffer.get_range(3..5), Err(BufferError::Uncovered(3)));
        assert_eq!(buffer.to_dense(), vec![1, 2, 0, 0, 5, 6]);
    }

    #[test]
    fn test_touching_chunks_coalesce() {
        let mut buffer = AddressSpaceBuffer::new();
        buffer.insert(0u32, &[1, 2]).unwrap();
        buffer.insert(4u32, &[5, 6]).unwrap();
        buffer.insert(2u32, &[3, 4]).unwrap();

        assert_eq!(buffer.chunks().count(), 1);
        assert_eq!(buffer.get_range(0..6), Ok(&[1, 2, 3, 4, 5, 6][..]));
    }

    #[test]
    fn test_overlapping_insert_is_unsupported() {
        let mut buffer = AddressSpaceBuffer::new();
        buffer.insert(10u32, &[0; 4]).unwrap();

        for addr in [8u32, 10, 12, 13] {
            let err = buffer.insert(addr, &[1, 1, 1]).unwrap_err();
            assert!(matches!(err, BufferError::Unsupported(_)), "addr {}", addr);
        }
        // Untouched after failed inserts
        assert_eq!(buffer.get_range(10..14), Ok(&[0, 0, 0, 0][..]));
        assert_eq!(buffer.len(), 14);
    }

    #[test]
    fn test_append_at_size() {
        let mut buffer = AddressSpaceBuffer::from_chunk(0x20u32, vec![1]).unwrap();
        buffer.append(&[2, 3]).unwrap();
        assert_eq!(buffer.len(), 0x23);
        assert_eq!(buffer.get_range(0x20..0x23), Ok(&[1, 2, 3][..]));
    }

    #[test]
    fn test_iter_is_ascending_and_skips_gaps() {
        let mut buffer = AddressSpaceBuffer::new();
        buffer.insert(8u32, &[8, 9]).unwrap();
        buffer.insert(1u32, &[1]).unwrap();

        let items: Vec<(u32, u8)> = buffer.iter().collect();
        assert_eq!(items, vec![(1, 1), (8, 8), (9, 9)]);
    }

    #[test]
    fn test_int7_addresses() {
        let base = Int7::from_packed(0x1800_007F).unwrap();
        let mut buffer = AddressSpaceBuffer::new();
        buffer.insert(base, &[0x11, 0x22]).unwrap();

        // Linear addressing carries into the next digit
        let next = Int7::from_packed(0x1800_0100).unwrap();
        assert_eq!(buffer.get(next), Ok(0x22));
    }

    #[test]
    fn test_address_overflow() {
        let mut buffer = AddressSpaceBuffer::new();
        let err = buffer.insert(u32::MAX, &[1, 2]).unwrap_err();
        assert!(matches!(err, BufferError::OutOfRange { .. }));
    }

    proptest! {
        #[test]
        fn prop_insert_read_back(
            addr in 0u32..0x0100_0000,
            bytes in prop::collection::vec(0u8..0x80, 1..64),
        ) {
            let mut buffer = AddressSpaceBuffer::new();
            buffer.insert(addr, &bytes).unwrap();
            let end = addr + bytes.len() as u32;
            prop_assert_eq!(buffer.get_range(addr..end).unwrap(), &bytes[..]);
            prop_assert_eq!(buffer.len(), end);
            prop_assert!(buffer.get(end).is_err());
        }
    }
}
