//! The MDF3 container: an open file plus its root header.
//!
//! [`Mdf3File`] owns the file handle, the identification preamble and the
//! root header block at offset 64. Opening a file loads the header together
//! with the blocks it owns (first data group, comment, program) into a
//! [`RootChain`]. Everything deeper in the block graph is loaded on demand
//! with [`Mdf3File::load_link`] and is not cached.
//!
//! # Example
//!
//! ```no_run
//! use mdf3_rs::blocks::{ChannelGroupRecord, DataGroupRecord};
//! use mdf3_rs::{Mdf3File, Result};
//!
//! fn list_groups(path: &str) -> Result<()> {
//!     let mut file = Mdf3File::open(path, false)?;
//!     println!("author: {}", file.header().record.author());
//!
//!     let Some(dg) = file.root_chain().first_data_group.clone() else {
//!         return Ok(());
//!     };
//!     let mut next = file.load_link_as::<ChannelGroupRecord>(&dg, DataGroupRecord::LINK_FIRST_CG)?;
//!     while let Some(cg) = next {
//!         println!("record {} has {} rows", cg.record.record_id, cg.record.record_count);
//!         next = file.load_link_as::<ChannelGroupRecord>(&cg, ChannelGroupRecord::LINK_NEXT_CG)?;
//!     }
//!     Ok(())
//! }
//! ```

use crate::blocks::{
    Block, BlockFactory, DataGroupBlock, DataGroupRecord, HEADER_BLOCK_OFFSET, HeaderBlock,
    HeaderRecord, ID_BLOCK_SIZE, IdentificationBlock, ProgramBlock, TextBlock,
};
use crate::file::RandomAccessFile;
use crate::record_count::{RecordCountTable, RecordKey};
use crate::{Error, Result};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

mod load;
mod write;

#[cfg(feature = "std")]
use crate::file::DiskFile;
#[cfg(feature = "std")]
use std::path::Path;

/// How a file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Allow writes through the container.
    pub update: bool,
    /// Reject blocks with unregistered type codes instead of keeping them raw.
    pub strict_block_types: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn strict_block_types(mut self, strict: bool) -> Self {
        self.strict_block_types = strict;
        self
    }
}

/// The blocks owned by the root header, loaded together with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootChain {
    pub first_data_group: Option<DataGroupBlock>,
    pub comment: Option<TextBlock>,
    pub program: Option<ProgramBlock>,
}

impl RootChain {
    /// The loaded blocks in link order.
    pub fn blocks(&self) -> impl Iterator<Item = &dyn Block> + '_ {
        let first_data_group = self.first_data_group.as_ref().map(|b| b as &dyn Block);
        let comment = self.comment.as_ref().map(|b| b as &dyn Block);
        let program = self.program.as_ref().map(|b| b as &dyn Block);
        first_data_group.into_iter().chain(comment).chain(program)
    }

    pub fn len(&self) -> usize {
        self.blocks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An open MDF3 file.
///
/// All I/O goes through `&mut self`. Dropping the container closes it;
/// call [`Mdf3File::close`] to see errors from the final writes.
#[derive(Debug)]
pub struct Mdf3File<F: RandomAccessFile> {
    file: Option<F>,
    writable: bool,
    identification: IdentificationBlock,
    header: HeaderBlock,
    header_dirty: bool,
    chain: RootChain,
    factory: BlockFactory,
    record_counts: RecordCountTable,
    /// Channel group that receives the final count of each record kind.
    bindings: BTreeMap<RecordKey, u64>,
    /// Data groups whose data link was set by `append_record`.
    started_regions: BTreeSet<u64>,
    /// The last write appended data rather than a block.
    data_tail: bool,
}

#[cfg(feature = "std")]
impl Mdf3File<DiskFile> {
    /// Open an existing file. `update` allows writes.
    pub fn open<P: AsRef<Path>>(path: P, update: bool) -> Result<Self> {
        Self::open_with(path, OpenOptions::new().update(update))
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), update = options.update, "opening file");
        let file = DiskFile::open(path, options.update)?;
        Self::from_file(file, options)
    }

    /// Create a new file, replacing any existing one.
    ///
    /// `producer` goes into the program identifier, `version` is the numeric
    /// format version (e.g. 330 for 3.30).
    pub fn create<P: AsRef<Path>>(path: P, producer: &str, version: u16) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), producer, version, "creating file");
        let file = DiskFile::create(path)?;
        Self::create_in(file, producer, version)
    }
}

impl<F: RandomAccessFile> Mdf3File<F> {
    /// Open the MDF3 contents of `file`.
    ///
    /// Validates the identification block, then loads the root header and
    /// its chain in link order. A malformed or truncated preamble or header
    /// fails the open.
    pub fn from_file(mut file: F, options: OpenOptions) -> Result<Self> {
        let mut raw = [0u8; ID_BLOCK_SIZE];
        file.read_at(0, &mut raw)?;
        let identification = IdentificationBlock::from_bytes(&raw)?;
        if identification.is_unfinalized() {
            tracing::warn!(
                flags = identification.unfinalized_flags,
                "file was not finalized by its producer"
            );
        }

        let header = HeaderBlock::read_from(&mut file, HEADER_BLOCK_OFFSET)?;
        let mut container = Self {
            file: Some(file),
            writable: options.update,
            identification,
            header,
            header_dirty: false,
            chain: RootChain::default(),
            factory: BlockFactory::default().strict(options.strict_block_types),
            record_counts: RecordCountTable::new(),
            bindings: BTreeMap::new(),
            started_regions: BTreeSet::new(),
            data_tail: false,
        };
        container.load_root_chain()?;
        tracing::debug!(
            program = %container.identification.program_id,
            version = container.identification.version_number,
            chain = container.chain.len(),
            "opened"
        );
        Ok(container)
    }

    /// Initialise an empty MDF3 file in `file`.
    ///
    /// Writes the identification block and a fresh root header stamped with
    /// the current time.
    pub fn create_in(mut file: F, producer: &str, version: u16) -> Result<Self> {
        let identification = IdentificationBlock::new(producer, version);
        file.write_at(0, &identification.to_bytes())?;

        #[allow(unused_mut)]
        let mut record = HeaderRecord::default();
        #[cfg(feature = "std")]
        record.stamp_now();
        let mut header = HeaderBlock::with_record(record);
        file.write_at(HEADER_BLOCK_OFFSET, &header.to_bytes())?;
        header.envelope.offset = HEADER_BLOCK_OFFSET;

        Ok(Self {
            file: Some(file),
            writable: true,
            identification,
            header,
            header_dirty: false,
            chain: RootChain::default(),
            factory: BlockFactory::default(),
            record_counts: RecordCountTable::new(),
            bindings: BTreeMap::new(),
            started_regions: BTreeSet::new(),
            data_tail: false,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn identification(&self) -> &IdentificationBlock {
        &self.identification
    }

    pub fn header(&self) -> &HeaderBlock {
        &self.header
    }

    /// Mutable access to the root header; the header is rewritten on close.
    pub fn header_mut(&mut self) -> &mut HeaderBlock {
        self.header_dirty = true;
        &mut self.header
    }

    pub fn root_chain(&self) -> &RootChain {
        &self.chain
    }

    pub fn record_counts(&self) -> &RecordCountTable {
        &self.record_counts
    }

    pub fn factory(&self) -> &BlockFactory {
        &self.factory
    }

    /// Register additional block kinds or change the unknown-type policy.
    pub fn factory_mut(&mut self) -> &mut BlockFactory {
        &mut self.factory
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// The underlying file handle.
    pub fn get_ref(&self) -> Result<&F> {
        self.file.as_ref().ok_or(Error::FileClosed)
    }

    fn file_mut(&mut self) -> Result<&mut F> {
        self.file.as_mut().ok_or(Error::FileClosed)
    }

    fn writable_file(&mut self) -> Result<&mut F> {
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        self.file_mut()
    }

    // ------------------------------------------------------------------------
    // Closing
    // ------------------------------------------------------------------------

    /// Finalise and release the file.
    ///
    /// Writes the record count of every bound channel group, rewrites the
    /// root header if it was modified, and flushes. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.finish().map(drop)
    }

    /// Close the container and hand back the file handle.
    pub fn into_file(mut self) -> Result<F> {
        self.finish()?.ok_or(Error::FileClosed)
    }

    fn finish(&mut self) -> Result<Option<F>> {
        if self.file.is_none() {
            return Ok(None);
        }
        if self.writable {
            self.finalize_record_counts()?;
            if self.header_dirty {
                let header: &dyn Block = &self.header;
                let bytes = header.to_bytes();
                let offset = header.offset();
                self.file_mut()?.write_at(offset, &bytes)?;
                self.header_dirty = false;
            }
        }
        let mut file = self.file.take();
        if let Some(file) = file.as_mut() {
            file.flush()?;
        }
        tracing::debug!(records = self.record_counts.len(), "closed");
        Ok(file)
    }

    fn load_root_chain(&mut self) -> Result<()> {
        let first_data_group = self.header.link(HeaderRecord::LINK_FIRST_DG);
        let comment = self.header.link(HeaderRecord::LINK_COMMENT);
        let program = self.header.link(HeaderRecord::LINK_PROGRAM);
        self.chain = RootChain {
            first_data_group: self.load_block_as(first_data_group)?,
            comment: self.load_block_as(comment)?,
            program: self.load_block_as(program)?,
        };
        tracing::debug!(first_data_group, comment, program, "loaded root chain");
        Ok(())
    }

    /// Offsets of every data group, in chain order.
    pub fn data_group_offsets(&mut self) -> Result<Vec<u64>> {
        let mut offsets = Vec::new();
        let mut seen = BTreeSet::new();
        let mut next = self.header.link(HeaderRecord::LINK_FIRST_DG);
        while next != 0 {
            if !seen.insert(next) {
                return Err(Error::BlockLinkError(alloc::format!(
                    "data group chain loops back to {next:#x}"
                )));
            }
            offsets.push(next);
            next = match self.load_block_as::<DataGroupRecord>(next)? {
                Some(dg) => dg.link(DataGroupRecord::LINK_NEXT_DG),
                None => 0,
            };
        }
        Ok(offsets)
    }
}

impl<F: RandomAccessFile> Drop for Mdf3File<F> {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(error) = self.close() {
                tracing::warn!(%error, "closing on drop failed");
            }
        }
    }
}
