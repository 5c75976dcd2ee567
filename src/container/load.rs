// Lazy loading of blocks from the graph
use super::Mdf3File;
use crate::blocks::{
    BLOCK_HEADER_SIZE, Block, BlockHeader, BlockId, HEADER_BLOCK_OFFSET, Record, TypedBlock,
};
use crate::file::RandomAccessFile;
use crate::{Error, Result};
use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::vec;

impl<F: RandomAccessFile> Mdf3File<F> {
    /// Load the block at `offset`, whatever its kind.
    ///
    /// Offset 0 means "no block" and returns `Ok(None)` without touching the
    /// file. The type code picks the block kind through the factory; a bad
    /// marker fails with [`Error::MalformedHeader`] before links or payload
    /// are read.
    pub fn load_block(&mut self, offset: u64) -> Result<Option<Box<dyn Block>>> {
        self.load_checked(offset, None)
    }

    /// Follow link `slot` of `parent`.
    ///
    /// An empty slot yields `Ok(None)`. With `expected` set, a block of any
    /// other kind fails with [`Error::TypeMismatch`].
    pub fn load_link(
        &mut self,
        parent: &dyn Block,
        slot: usize,
        expected: Option<BlockId>,
    ) -> Result<Option<Box<dyn Block>>> {
        self.load_checked(parent.links().get(slot), expected)
    }

    /// Load the block at `offset` as record kind `R`.
    pub fn load_block_as<R: Record>(&mut self, offset: u64) -> Result<Option<TypedBlock<R>>> {
        if offset == 0 {
            return Ok(None);
        }
        let file = self.file_mut()?;
        let block = TypedBlock::<R>::read_from(file, offset)?;
        tracing::debug!(offset, id = %R::ID, length = block.header().length, "loaded block");
        Ok(Some(block))
    }

    /// Follow link `slot` of `parent`, expecting record kind `R`.
    pub fn load_link_as<R: Record>(
        &mut self,
        parent: &dyn Block,
        slot: usize,
    ) -> Result<Option<TypedBlock<R>>> {
        self.load_block_as(parent.links().get(slot))
    }

    fn load_checked(
        &mut self,
        offset: u64,
        expected: Option<BlockId>,
    ) -> Result<Option<Box<dyn Block>>> {
        if offset == 0 {
            return Ok(None);
        }
        let file = self.file.as_mut().ok_or(Error::FileClosed)?;

        let mut raw = [0u8; BLOCK_HEADER_SIZE];
        file.read_at(offset, &mut raw)?;
        let header = BlockHeader::from_bytes(&raw, offset)?;
        if let Some(expected) = expected {
            if header.id != expected {
                return Err(Error::TypeMismatch {
                    expected,
                    actual: header.id,
                });
            }
        }

        let mut block = self.factory.create(header.id, offset)?;
        block.read(file, offset, header)?;
        tracing::debug!(offset, id = %header.id, length = header.length, "loaded block");
        Ok(Some(block))
    }

    /// The nearest offset above `start` that a block reachable from the root
    /// header links to, or the end of the file.
    ///
    /// Link targets that hold no block (data regions) bound the result but
    /// are not followed.
    pub(super) fn region_end(&mut self, start: u64) -> Result<u64> {
        let mut end = self.file_mut()?.len();
        let mut seen = BTreeSet::new();
        let mut pending = vec![HEADER_BLOCK_OFFSET];
        while let Some(offset) = pending.pop() {
            if !seen.insert(offset) {
                continue;
            }
            if offset > start {
                end = end.min(offset);
            }
            let block = match self.load_checked(offset, None) {
                Ok(Some(block)) => block,
                Ok(None)
                | Err(Error::MalformedHeader { .. })
                | Err(Error::TruncatedRead { .. })
                | Err(Error::InvalidBlockLength { .. })
                | Err(Error::UnknownBlockType { .. }) => continue,
                Err(e) => return Err(e),
            };
            pending.extend(block.links().iter().filter(|&link| link != 0));
        }
        tracing::debug!(start, end, blocks = seen.len(), "bounded data region");
        Ok(end)
    }
}
