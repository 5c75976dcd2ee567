// blocks/common.rs
//! Common types and helper functions for MDF3 block encoding.
//!
//! This module provides:
//! - [`BlockId`]: the 2-character type code of a block
//! - [`BlockHeader`]: the 20-byte header present in all MDF3 blocks
//! - Little-endian field helpers ([`Unpacker`], `put_*` writers) used by the
//!   explicit record layouts
//! - Fixed-width string helpers for the ASCII fields of the fixed records

use crate::{Error, Result};
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Size of the common block header: marker, type code, length, link count.
pub const BLOCK_HEADER_SIZE: usize = 20;

/// Size of one link slot on disk.
pub const LINK_SIZE: usize = 8;

/// Marker bytes in front of every block.
pub const BLOCK_MARKER: [u8; 2] = *b"##";

// ============================================================================
// Block type code
// ============================================================================

/// Two-character block type code (e.g. `HD`, `DG`, `CN`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub [u8; 2]);

impl BlockId {
    /// Header block, the root of the graph.
    pub const HD: BlockId = BlockId(*b"HD");
    /// Text block.
    pub const TX: BlockId = BlockId(*b"TX");
    /// Program block with producer-specific data.
    pub const PR: BlockId = BlockId(*b"PR");
    /// Data group block.
    pub const DG: BlockId = BlockId(*b"DG");
    /// Channel group block.
    pub const CG: BlockId = BlockId(*b"CG");
    /// Channel block.
    pub const CN: BlockId = BlockId(*b"CN");
    /// Conversion formula block.
    pub const CC: BlockId = BlockId(*b"CC");
    /// Trigger block.
    pub const TR: BlockId = BlockId(*b"TR");
    /// Channel dependency block.
    pub const CD: BlockId = BlockId(*b"CD");
    /// Channel extension (source) block.
    pub const CE: BlockId = BlockId(*b"CE");
    /// Sample reduction block.
    pub const SR: BlockId = BlockId(*b"SR");

    /// Build a type code from its two ASCII characters.
    pub const fn new(code: &[u8; 2]) -> Self {
        BlockId(*code)
    }

    /// The raw code bytes.
    pub const fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl core::fmt::Display for BlockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BlockId(\"{self}\")")
    }
}

// ============================================================================
// Block header
// ============================================================================

/// The common header in front of every block.
///
/// The marker is not stored: it is always `"##"` on disk and validated on
/// parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    /// Block type code.
    pub id: BlockId,
    /// Total length of the block in bytes, including this header.
    pub length: u64,
    /// Number of link fields in this block.
    pub link_count: u64,
}

impl BlockHeader {
    /// Header for a block of type `id` with `link_count` links and no payload.
    pub fn new(id: BlockId, link_count: usize) -> Self {
        Self {
            id,
            length: (BLOCK_HEADER_SIZE + link_count * LINK_SIZE) as u64,
            link_count: link_count as u64,
        }
    }

    /// Serializes the header to its 20-byte on-disk form.
    ///
    /// - marker: 2 bytes (`"##"`)
    /// - id: 2 bytes
    /// - length: 8 bytes
    /// - link_count: 8 bytes
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buffer = [0u8; BLOCK_HEADER_SIZE];
        buffer[0..2].copy_from_slice(&BLOCK_MARKER);
        buffer[2..4].copy_from_slice(&self.id.0);
        buffer[4..12].copy_from_slice(&self.length.to_le_bytes());
        buffer[12..20].copy_from_slice(&self.link_count.to_le_bytes());
        buffer
    }

    /// Parse a block header from the first 20 bytes of `bytes`.
    ///
    /// `offset` is the file position of the block and is only used for error
    /// reporting.
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self> {
        validate_buffer_size(bytes, BLOCK_HEADER_SIZE)?;

        let marker = [bytes[0], bytes[1]];
        if marker != BLOCK_MARKER {
            return Err(Error::MalformedHeader { offset, marker });
        }

        Ok(Self {
            id: BlockId([bytes[2], bytes[3]]),
            length: read_u64(bytes, 4),
            link_count: read_u64(bytes, 12),
        })
    }

    /// Bytes occupied by the header and the link table.
    pub fn links_end(&self) -> u64 {
        BLOCK_HEADER_SIZE as u64 + self.link_count.saturating_mul(LINK_SIZE as u64)
    }

    /// Bytes following the link table (fixed record plus variable part).
    ///
    /// Fails when the declared length cannot hold the header and links.
    pub fn payload_len(&self, offset: u64) -> Result<u64> {
        let minimum = self.links_end();
        if self.length < minimum {
            return Err(Error::InvalidBlockLength {
                offset,
                length: self.length,
                minimum,
            });
        }
        Ok(self.length - minimum)
    }
}

// ============================================================================
// Byte Parsing Helpers
// ============================================================================

/// Read a u64 from a byte slice at the given offset (little-endian).
///
/// # Panics
/// Panics if `offset + 8 > bytes.len()`.
#[inline]
pub fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

/// Read a u16 from a byte slice at the given offset (little-endian).
#[inline]
pub fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Cursor over a fixed record buffer, reading little-endian fields in order.
///
/// Records are unpacked from a buffer that is always exactly the record size,
/// so the accessors index without bounds errors.
pub struct Unpacker<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        raw
    }

    pub fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    pub fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    pub fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    pub fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.take())
    }

    pub fn bytes<const N: usize>(&mut self) -> [u8; N] {
        self.take()
    }
}

#[inline]
pub fn put_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_u64(buffer: &mut Vec<u8>, value: u64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn put_f64(buffer: &mut Vec<u8>, value: f64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

// ============================================================================
// Fixed-width strings
// ============================================================================

/// Copy `source` into a NUL-padded fixed-width field, truncating if longer.
pub fn encode_fixed_string<const N: usize>(source: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let src = source.as_bytes();
    let len = core::cmp::min(src.len(), N);
    field[..len].copy_from_slice(&src[..len]);
    field
}

/// Decode a fixed-width ASCII field, dropping trailing NUL and space padding.
pub fn decode_fixed_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
        .trim_end_matches(' ')
        .to_owned()
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a buffer has at least `expected` bytes.
///
/// Returns `Err(TooShortBuffer)` if the buffer is too small.
#[inline]
pub fn validate_buffer_size(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(Error::TooShortBuffer {
            actual: bytes.len(),
            expected,
            file: file!(),
            line: line!(),
        });
    }
    Ok(())
}

/// Calculate padding needed to reach 8-byte alignment.
#[inline]
pub const fn padding_to_align_8(size: u64) -> u64 {
    (8 - (size % 8)) % 8
}

/// Safely convert a u64 length or offset to usize for buffer sizing.
///
/// On 32-bit targets a value above `usize::MAX` is reported as an error
/// instead of silently truncating.
#[inline]
pub fn u64_to_usize(value: u64, context: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        Error::BlockSerializationError(format!(
            "{} value {} exceeds maximum addressable size on this platform",
            context, value
        ))
    })
}

/// Convert an item count to a `u16` count field.
#[inline]
pub fn count_to_u16(count: usize, context: &str) -> Result<u16> {
    u16::try_from(count).map_err(|_| {
        Error::BlockSerializationError(format!(
            "{} {} does not fit a 16-bit count field",
            count, context
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_little_endian() {
        let h = BlockHeader {
            id: BlockId::CG,
            length: 0x0102,
            link_count: 4,
        };
        let bytes = h.to_bytes();
        assert_eq!(&bytes[0..4], b"##CG");
        assert_eq!(bytes[4], 0x02);
        assert_eq!(bytes[5], 0x01);
        assert_eq!(bytes[12], 4);
        assert_eq!(BlockHeader::from_bytes(&bytes, 0).unwrap(), h);
    }

    #[test]
    fn header_rejects_bad_marker() {
        let mut bytes = BlockHeader::new(BlockId::TX, 0).to_bytes();
        bytes[0] = b'#';
        bytes[1] = b'x';
        match BlockHeader::from_bytes(&bytes, 128) {
            Err(Error::MalformedHeader { offset, marker }) => {
                assert_eq!(offset, 128);
                assert_eq!(&marker, b"#x");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn payload_len_requires_room_for_links() {
        let h = BlockHeader {
            id: BlockId::DG,
            length: 30,
            link_count: 4,
        };
        assert!(matches!(
            h.payload_len(64),
            Err(Error::InvalidBlockLength { minimum: 52, .. })
        ));
    }

    #[test]
    fn fixed_strings_pad_and_trim() {
        let field: [u8; 8] = encode_fixed_string("abc");
        assert_eq!(&field, b"abc\0\0\0\0\0");
        assert_eq!(decode_fixed_string(&field), "abc");
        let truncated: [u8; 2] = encode_fixed_string("abcdef");
        assert_eq!(&truncated, b"ab");
        assert_eq!(decode_fixed_string(b"3.30    "), "3.30");
    }

    #[test]
    fn block_id_display() {
        assert_eq!(alloc::format!("{}", BlockId::HD), "HD");
        assert_eq!(alloc::format!("{}", BlockId([0, b'A'])), "\\x00A");
    }
}
