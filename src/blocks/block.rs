//! The generic block envelope.
//!
//! Every block on disk is a [`BlockHeader`], a [`LinkTable`], a fixed record
//! and a variable tail. [`Block`] exposes that shape uniformly so the
//! container can read, size and serialize blocks without knowing their kind.

use super::common::{BLOCK_HEADER_SIZE, BlockHeader, BlockId, LINK_SIZE, u64_to_usize};
use super::link_table::LinkTable;
use crate::file::RandomAccessFile;
use crate::{Error, Result};
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Debug;

/// Header, link table and file position shared by every block kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Header as last read from or written to disk.
    pub header: BlockHeader,
    pub links: LinkTable,
    /// File position, `0` until the block was read or written.
    pub offset: u64,
}

impl Envelope {
    pub fn new(id: BlockId, link_count: usize) -> Self {
        Self {
            header: BlockHeader::new(id, link_count),
            links: LinkTable::new(link_count),
            offset: 0,
        }
    }
}

/// Uniform view of a block regardless of its concrete kind.
pub trait Block: Debug + Any {
    fn envelope(&self) -> &Envelope;

    fn envelope_mut(&mut self) -> &mut Envelope;

    /// Link count declared by the block kind, `None` when the table follows
    /// whatever the header says.
    fn declared_links(&self) -> Option<usize>;

    /// Size of the packed fixed record.
    fn fixed_size(&self) -> usize;

    /// The packed fixed record.
    fn fixed_bytes(&self) -> Vec<u8>;

    /// The variable part.
    fn variable(&self) -> &[u8];

    /// Consume `remaining` payload bytes starting at `offset`.
    fn read_data(
        &mut self,
        file: &mut dyn RandomAccessFile,
        offset: u64,
        remaining: u64,
    ) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn id(&self) -> BlockId {
        self.envelope().header.id
    }

    fn header(&self) -> &BlockHeader {
        &self.envelope().header
    }

    fn offset(&self) -> u64 {
        self.envelope().offset
    }

    fn links(&self) -> &LinkTable {
        &self.envelope().links
    }

    fn links_mut(&mut self) -> &mut LinkTable {
        &mut self.envelope_mut().links
    }

    /// Byte length of the variable part.
    fn size(&self) -> u64 {
        self.variable().len() as u64
    }

    /// The variable segment at `index`.
    ///
    /// Only segment `0` exists; it is `None` when the variable part is empty.
    fn data(&self, index: usize) -> Result<Option<&[u8]>> {
        if index != 0 {
            return Err(Error::InvalidDataSegment { index });
        }
        let data = self.variable();
        Ok(if data.is_empty() { None } else { Some(data) })
    }

    /// Header describing the block as it would be written now.
    fn encoded_header(&self) -> BlockHeader {
        let links = self.links().len();
        BlockHeader {
            id: self.id(),
            length: (BLOCK_HEADER_SIZE + links * LINK_SIZE + self.fixed_size()) as u64
                + self.size(),
            link_count: links as u64,
        }
    }

    /// Refresh the stored header from the current links and payload.
    fn sync_header(&mut self) {
        let header = self.encoded_header();
        self.envelope_mut().header = header;
    }

    /// Populate the block from the file, given its already parsed header.
    ///
    /// Reads the link table directly after the header, then hands the rest of
    /// the declared length to [`Block::read_data`]. On failure the block is
    /// left partially populated and must be discarded.
    fn read(
        &mut self,
        file: &mut dyn RandomAccessFile,
        offset: u64,
        header: BlockHeader,
    ) -> Result<()> {
        let payload = header.payload_len(offset)?;
        let available = file.len().saturating_sub(offset);
        if header.length > available {
            return Err(Error::TruncatedRead {
                offset,
                expected: header.length,
                actual: available,
            });
        }
        let link_bytes = u64_to_usize(header.links_end(), "link table")? - BLOCK_HEADER_SIZE;

        let mut raw = vec![0u8; link_bytes];
        file.read_at(offset + BLOCK_HEADER_SIZE as u64, &mut raw)?;
        let mut links = LinkTable::from_bytes(&raw);

        if let Some(declared) = self.declared_links() {
            if links.len() > declared && links.iter().skip(declared).any(|l| l != 0) {
                tracing::warn!(
                    offset,
                    id = %header.id,
                    on_disk = links.len(),
                    declared,
                    "dropping links beyond the declared link count"
                );
            }
            links.resize(declared);
        }

        let envelope = self.envelope_mut();
        envelope.header = header;
        envelope.offset = offset;
        envelope.links = links;

        self.read_data(file, offset + header.links_end(), payload)
    }

    /// Serialize header, links, fixed record and variable part.
    fn to_bytes(&self) -> Vec<u8> {
        let header = self.encoded_header();
        let mut buffer = Vec::with_capacity(header.length as usize);
        buffer.extend_from_slice(&header.to_bytes());
        self.links().write_to(&mut buffer);
        buffer.extend_from_slice(&self.fixed_bytes());
        buffer.extend_from_slice(self.variable());
        buffer
    }
}

impl dyn Block {
    pub fn is<T: Block>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Block>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Block>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Take ownership of the concrete block, handing the box back on a
    /// kind mismatch.
    pub fn downcast<T: Block>(self: Box<Self>) -> core::result::Result<Box<T>, Box<dyn Block>> {
        if self.is::<T>() {
            match self.into_any().downcast::<T>() {
                Ok(block) => Ok(block),
                Err(_) => unreachable!("type checked above"),
            }
        } else {
            Err(self)
        }
    }
}

/// A block of a kind without a registered layout.
///
/// Keeps every link the header announces and the payload as raw bytes, so
/// newer block kinds survive a read/write cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub envelope: Envelope,
    pub payload: Vec<u8>,
}

impl RawBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            envelope: Envelope::new(id, 0),
            payload: Vec::new(),
        }
    }
}

impl Block for RawBlock {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn declared_links(&self) -> Option<usize> {
        None
    }

    fn fixed_size(&self) -> usize {
        0
    }

    fn fixed_bytes(&self) -> Vec<u8> {
        Vec::new()
    }

    fn variable(&self) -> &[u8] {
        &self.payload
    }

    fn read_data(
        &mut self,
        file: &mut dyn RandomAccessFile,
        offset: u64,
        remaining: u64,
    ) -> Result<()> {
        self.payload = vec![0u8; u64_to_usize(remaining, "block payload")?];
        file.read_at(offset, &mut self.payload)
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
