use super::block::{Block, Envelope};
use super::common::{BLOCK_HEADER_SIZE, BlockHeader, u64_to_usize};
use super::record::{Record, VarElement};
use crate::file::RandomAccessFile;
use crate::{Error, Result};
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

/// A block whose fixed part is the record `R`.
///
/// The type code and link count come from `R`; the variable part is kept as
/// raw bytes and can be viewed as a sequence of `R::Element`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBlock<R: Record> {
    pub envelope: Envelope,
    pub record: R,
    data: Vec<u8>,
}

impl<R: Record> Default for TypedBlock<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> TypedBlock<R> {
    /// An unlinked block with a zeroed record and empty variable part.
    pub fn new() -> Self {
        Self::with_record(R::default())
    }

    pub fn with_record(record: R) -> Self {
        let mut block = Self {
            envelope: Envelope::new(R::ID, R::LINK_COUNT),
            record,
            data: Vec::new(),
        };
        block.sync_header();
        block
    }

    /// Read the block at `offset`, checking that its type code is `R::ID`.
    pub fn read_from(file: &mut dyn RandomAccessFile, offset: u64) -> Result<Self> {
        let mut raw = [0u8; BLOCK_HEADER_SIZE];
        file.read_at(offset, &mut raw)?;
        let header = BlockHeader::from_bytes(&raw, offset)?;
        if header.id != R::ID {
            return Err(Error::TypeMismatch {
                expected: R::ID,
                actual: header.id,
            });
        }
        let mut block = Self::new();
        block.read(file, offset, header)?;
        Ok(block)
    }

    /// Parse a block from a buffer that starts with its header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut file = crate::file::MemoryFile::from_vec(bytes.to_vec());
        Self::read_from(&mut file, 0)
    }

    pub fn link(&self, slot: usize) -> u64 {
        self.envelope.links.get(slot)
    }

    pub fn has_link(&self, slot: usize) -> bool {
        self.envelope.links.has(slot)
    }

    pub fn set_link(&mut self, slot: usize, offset: u64) -> Result<()> {
        self.envelope.links.set(slot, offset)
    }

    /// Replace the variable part.
    pub fn set_variable(&mut self, data: Vec<u8>) {
        self.data = data;
        self.sync_header();
    }

    /// Number of whole elements in the variable part.
    pub fn element_count(&self) -> usize {
        self.data.len() / R::Element::WIDTH
    }

    /// The variable-part element at `index`.
    pub fn element(&self, index: usize) -> Option<R::Element> {
        let start = index.checked_mul(R::Element::WIDTH)?;
        let end = start.checked_add(R::Element::WIDTH)?;
        self.data.get(start..end).map(R::Element::decode)
    }

    /// All whole elements of the variable part.
    pub fn elements(&self) -> Vec<R::Element> {
        self.data
            .chunks_exact(R::Element::WIDTH)
            .map(R::Element::decode)
            .collect()
    }

    pub fn set_elements(&mut self, elements: &[R::Element]) {
        let mut data = Vec::with_capacity(elements.len() * R::Element::WIDTH);
        for element in elements {
            element.encode(&mut data);
        }
        self.set_variable(data);
    }
}

impl<R: Record> Block for TypedBlock<R> {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn declared_links(&self) -> Option<usize> {
        Some(R::LINK_COUNT)
    }

    fn fixed_size(&self) -> usize {
        R::SIZE
    }

    fn fixed_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(R::SIZE);
        self.record.pack(&mut buffer);
        debug_assert_eq!(buffer.len(), R::SIZE, "{} record packed to wrong size", R::ID);
        buffer
    }

    fn variable(&self) -> &[u8] {
        &self.data
    }

    fn read_data(
        &mut self,
        file: &mut dyn RandomAccessFile,
        offset: u64,
        remaining: u64,
    ) -> Result<()> {
        // Older revisions may store a shorter record; the missing tail stays zero.
        let fixed = core::cmp::min(R::SIZE as u64, remaining) as usize;
        let mut raw = vec![0u8; R::SIZE];
        file.read_at(offset, &mut raw[..fixed])?;
        if fixed < R::SIZE {
            tracing::warn!(
                offset,
                id = %R::ID,
                available = fixed,
                size = R::SIZE,
                "short fixed record, remaining fields left at zero"
            );
        }
        self.record = R::unpack(&raw);

        let variable = remaining - fixed as u64;
        self.data = vec![0u8; u64_to_usize(variable, "variable part")?];
        if variable > 0 {
            file.read_at(offset + fixed as u64, &mut self.data)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockId, common::put_u16, common::read_u64};

    fn first_link(bytes: &[u8]) -> u64 {
        read_u64(bytes, BLOCK_HEADER_SIZE)
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair {
        a: u16,
        b: u16,
    }

    impl Record for Pair {
        const ID: BlockId = BlockId::new(b"ZZ");
        const LINK_COUNT: usize = 2;
        const SIZE: usize = 4;
        type Element = u16;

        fn unpack(bytes: &[u8]) -> Self {
            let mut r = crate::blocks::common::Unpacker::new(bytes);
            Self {
                a: r.u16(),
                b: r.u16(),
            }
        }

        fn pack(&self, buffer: &mut Vec<u8>) {
            put_u16(buffer, self.a);
            put_u16(buffer, self.b);
        }
    }

    #[test]
    fn new_block_header_accounts_for_record() {
        let block = TypedBlock::<Pair>::new();
        assert_eq!(block.header().id, Pair::ID);
        assert_eq!(block.header().link_count, 2);
        assert_eq!(block.header().length, 20 + 16 + 4);
        assert_eq!(block.size(), 0);
        assert_eq!(block.data(0).unwrap(), None);
    }

    #[test]
    fn roundtrip_with_variable_part() {
        let mut block = TypedBlock::with_record(Pair { a: 7, b: 9 });
        block.set_link(1, 0x80).unwrap();
        block.set_elements(&[1, 2, 3]);
        let bytes = block.to_bytes();
        assert_eq!(bytes.len() as u64, block.header().length);
        assert_eq!(first_link(&bytes), 0);

        let parsed = TypedBlock::<Pair>::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.record, Pair { a: 7, b: 9 });
        assert_eq!(parsed.link(1), 0x80);
        assert_eq!(parsed.elements(), vec![1, 2, 3]);
        assert_eq!(parsed.element(3), None);
        assert_eq!(parsed.size(), 6);
        assert_eq!(parsed.data(0).unwrap().map(<[u8]>::len), Some(6));
        assert!(matches!(
            parsed.data(1),
            Err(Error::InvalidDataSegment { index: 1 })
        ));
    }

    #[test]
    fn short_fixed_part_is_zero_padded() {
        // Declared length only holds the first field of the record.
        let mut bytes = BlockHeader {
            id: Pair::ID,
            length: 20 + 16 + 2,
            link_count: 2,
        }
        .to_bytes()
        .to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&5u16.to_le_bytes());

        let parsed = TypedBlock::<Pair>::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.record, Pair { a: 5, b: 0 });
        assert_eq!(parsed.size(), 0);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut other = TypedBlock::<Pair>::new();
        other.envelope.header.id = BlockId::TX;
        let bytes = other.envelope.header.to_bytes();
        let mut file = crate::file::MemoryFile::from_vec(bytes.to_vec());
        assert!(matches!(
            TypedBlock::<Pair>::read_from(&mut file, 0),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
