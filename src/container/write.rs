// Appending blocks and data, patching links, record-count upkeep
use super::Mdf3File;
use crate::blocks::common::padding_to_align_8;
use crate::blocks::{
    BLOCK_HEADER_SIZE, Block, BlockHeader, ChannelGroupRecord, DataGroupBlock, DataGroupRecord,
    HEADER_BLOCK_OFFSET, HeaderBlock, HeaderRecord, LINK_SIZE, ProgramBlock, TextBlock,
    u64_to_usize,
};
use crate::file::RandomAccessFile;
use crate::record_count::{RecordKey, RecordLayout, ScanSummary};
use crate::{Error, Result};
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

fn read_header<F: RandomAccessFile>(file: &mut F, offset: u64) -> Result<BlockHeader> {
    let mut raw = [0u8; BLOCK_HEADER_SIZE];
    file.read_at(offset, &mut raw)?;
    BlockHeader::from_bytes(&raw, offset)
}

impl<F: RandomAccessFile> Mdf3File<F> {
    /// Append `block` at the 8-byte aligned end of the file.
    ///
    /// A block written directly after appended data follows it without
    /// padding, so the data region ends where the block starts. The header
    /// length is recomputed and the block takes the new offset.
    pub fn write_block(&mut self, block: &mut dyn Block) -> Result<u64> {
        let after_data = self.data_tail;
        let file = self.writable_file()?;
        let end = file.len();
        let align = if after_data { 0 } else { padding_to_align_8(end) };
        if align != 0 {
            file.write_at(end, &vec![0u8; align as usize])?;
        }
        let offset = end + align;

        block.sync_header();
        file.write_at(offset, &block.to_bytes())?;
        block.envelope_mut().offset = offset;
        self.data_tail = false;
        tracing::debug!(offset, id = %block.id(), length = block.header().length, "wrote block");
        Ok(offset)
    }

    /// Write `block` over its previous image at `block.offset()`.
    ///
    /// The on-disk length must not change. Copies held by the container (root
    /// header and root chain) are replaced when `block` is one of them.
    pub fn rewrite_block(&mut self, block: &dyn Block) -> Result<()> {
        let offset = block.offset();
        if offset == 0 {
            return Err(Error::BlockLinkError(format!(
                "{} block has not been written yet",
                block.id()
            )));
        }
        let file = self.writable_file()?;
        let on_disk = read_header(file, offset)?;
        let encoded = block.encoded_header();
        if on_disk.id != encoded.id || on_disk.length != encoded.length {
            return Err(Error::BlockSerializationError(format!(
                "cannot rewrite {} block at {offset:#x}: {} bytes on disk, {} now",
                encoded.id, on_disk.length, encoded.length
            )));
        }
        file.write_at(offset, &block.to_bytes())?;

        if offset == HEADER_BLOCK_OFFSET {
            if let Some(header) = block.downcast_ref::<HeaderBlock>() {
                self.header = header.clone();
            }
            self.header_dirty = false;
        }
        let chain = &mut self.chain;
        if let Some(dg) = block.downcast_ref::<DataGroupBlock>() {
            if chain.first_data_group.as_ref().is_some_and(|c| c.offset() == offset) {
                chain.first_data_group = Some(dg.clone());
            }
        } else if let Some(text) = block.downcast_ref::<TextBlock>() {
            if chain.comment.as_ref().is_some_and(|c| c.offset() == offset) {
                chain.comment = Some(text.clone());
            }
        } else if let Some(program) = block.downcast_ref::<ProgramBlock>() {
            if chain.program.as_ref().is_some_and(|c| c.offset() == offset) {
                chain.program = Some(program.clone());
            }
        }
        Ok(())
    }

    /// Point link `slot` of the block at `block_offset` to `target`.
    ///
    /// Patches the eight link bytes in place. The root header and the first
    /// data group kept in memory are updated as well.
    pub fn update_link(&mut self, block_offset: u64, slot: usize, target: u64) -> Result<()> {
        let file = self.writable_file()?;
        let header = read_header(file, block_offset)?;
        let len = u64_to_usize(header.link_count, "link count")?;
        if slot >= len {
            return Err(Error::LinkSlotOutOfRange { index: slot, len });
        }
        let position = block_offset + (BLOCK_HEADER_SIZE + slot * LINK_SIZE) as u64;
        file.write_at(position, &target.to_le_bytes())?;
        if block_offset == HEADER_BLOCK_OFFSET {
            self.header.set_link(slot, target)?;
        }
        if let Some(dg) = self.chain.first_data_group.as_mut() {
            if dg.offset() == block_offset && slot < dg.links().len() {
                dg.set_link(slot, target)?;
            }
        }
        Ok(())
    }

    /// Append raw bytes at the end of the file, unaligned.
    pub fn append_data(&mut self, bytes: &[u8]) -> Result<u64> {
        let file = self.writable_file()?;
        let offset = file.len();
        file.write_at(offset, bytes)?;
        self.data_tail = true;
        Ok(offset)
    }

    /// Append one row of the data group `key.group`.
    ///
    /// `row` is stored as given, record id tags included. The first row a
    /// data group receives becomes the target of its data link when that link
    /// is still empty. Rows of one data group must be appended without other
    /// writes in between. Returns the 0-based slot of the row among rows of
    /// the same kind.
    pub fn append_record(&mut self, key: RecordKey, row: &[u8]) -> Result<u64> {
        let offset = self.append_data(row)?;
        if !self.started_regions.contains(&key.group) {
            self.start_region(key.group, offset)?;
        }
        let slot = self.record_counts.observe(key, offset);
        tracing::trace!(
            group = key.group,
            record_id = key.record_id,
            offset,
            slot,
            "appended record"
        );
        Ok(slot)
    }

    fn start_region(&mut self, group: u64, offset: u64) -> Result<()> {
        let index = u64_to_usize(group, "data group index")?;
        let offsets = self.data_group_offsets()?;
        let Some(&dg_offset) = offsets.get(index) else {
            return Err(Error::BlockLinkError(format!(
                "no data group {group} to hold records"
            )));
        };
        let dg = self.load_block_as::<DataGroupRecord>(dg_offset)?;
        if dg.is_some_and(|dg| !dg.has_link(DataGroupRecord::LINK_DATA)) {
            self.update_link(dg_offset, DataGroupRecord::LINK_DATA, offset)?;
        }
        self.started_regions.insert(group);
        Ok(())
    }

    /// Have the channel group at `cg_offset` receive the row count of `key`
    /// when the file is closed.
    pub fn bind_channel_group(&mut self, key: RecordKey, cg_offset: u64) -> Result<()> {
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        if cg_offset == 0 {
            return Err(Error::BlockLinkError(format!(
                "record {} of group {} bound to offset 0",
                key.record_id, key.group
            )));
        }
        self.bindings.insert(key, cg_offset);
        Ok(())
    }

    pub(super) fn finalize_record_counts(&mut self) -> Result<()> {
        let bindings: Vec<(RecordKey, u64)> =
            self.bindings.iter().map(|(k, v)| (*k, *v)).collect();
        for (key, cg_offset) in bindings {
            let count = self.record_counts.count(key);
            let Some(mut cg) = self.load_block_as::<ChannelGroupRecord>(cg_offset)? else {
                continue;
            };
            cg.record.record_count = u32::try_from(count).map_err(|_| {
                Error::BlockSerializationError(format!(
                    "{count} records of id {} do not fit a channel group",
                    key.record_id
                ))
            })?;
            self.rewrite_block(&cg)?;
            tracing::debug!(
                group = key.group,
                record_id = key.record_id,
                count,
                cg_offset,
                "finalized record count"
            );
        }
        self.bindings.clear();
        Ok(())
    }

    /// Write `dg` and append it to the data group chain.
    pub fn add_data_group(&mut self, dg: &mut DataGroupBlock) -> Result<u64> {
        let offsets = self.data_group_offsets()?;
        let offset = self.write_block(dg)?;
        match offsets.last() {
            Some(&last) => self.update_link(last, DataGroupRecord::LINK_NEXT_DG, offset)?,
            None => {
                self.update_link(HEADER_BLOCK_OFFSET, HeaderRecord::LINK_FIRST_DG, offset)?;
                self.chain.first_data_group = Some(dg.clone());
            }
        }
        Ok(offset)
    }

    /// Write `text` as the file comment and link it from the root header.
    pub fn set_comment(&mut self, text: &str) -> Result<u64> {
        let mut block = TextBlock::from_text(text);
        let offset = self.write_block(&mut block)?;
        self.update_link(HEADER_BLOCK_OFFSET, HeaderRecord::LINK_COMMENT, offset)?;
        self.chain.comment = Some(block);
        Ok(offset)
    }

    /// Write producer-specific bytes as the program block.
    pub fn set_program(&mut self, data: &[u8]) -> Result<u64> {
        let mut block = ProgramBlock::with_data(data.to_vec());
        let offset = self.write_block(&mut block)?;
        self.update_link(HEADER_BLOCK_OFFSET, HeaderRecord::LINK_PROGRAM, offset)?;
        self.chain.program = Some(block);
        Ok(offset)
    }

    /// Rebuild the record counts of data group `index` from its data region.
    ///
    /// The row layout comes from the group's channel groups. When they
    /// declare row counts, exactly that many bytes are scanned and must be
    /// present in the file. Otherwise the region ends at the nearest offset
    /// above it that the block graph links to (or at the end of the file),
    /// and the scan stops early at the first row it does not recognise.
    pub fn scan_data_group(&mut self, index: usize) -> Result<ScanSummary> {
        let offsets = self.data_group_offsets()?;
        let Some(&dg_offset) = offsets.get(index) else {
            return Err(Error::BlockLinkError(format!("no data group {index}")));
        };
        let Some(dg) = self.load_block_as::<DataGroupRecord>(dg_offset)? else {
            return Ok(ScanSummary::default());
        };

        let mut layout = RecordLayout::new(dg.record.record_id_count);
        let mut declared_bytes = 0u64;
        let mut seen = BTreeSet::new();
        let mut next = self.load_link_as::<ChannelGroupRecord>(&dg, DataGroupRecord::LINK_FIRST_CG)?;
        while let Some(cg) = next {
            if !seen.insert(cg.offset()) {
                return Err(Error::BlockLinkError(format!(
                    "channel group chain loops back to {:#x}",
                    cg.offset()
                )));
            }
            let size = usize::from(cg.record.record_size);
            layout.insert(u64::from(cg.record.record_id), size);
            let row_len = (size + layout.tag_len()) as u64;
            let rows = u64::from(cg.record.record_count);
            declared_bytes = declared_bytes.saturating_add(rows.saturating_mul(row_len));
            next = self.load_link_as::<ChannelGroupRecord>(&cg, ChannelGroupRecord::LINK_NEXT_CG)?;
        }

        let group = index as u64;
        self.record_counts.clear_group(group);
        let data = dg.link(DataGroupRecord::LINK_DATA);
        if data == 0 || layout.is_empty() {
            return Ok(ScanSummary::default());
        }

        let length = if declared_bytes > 0 {
            declared_bytes
        } else {
            self.region_end(data)?.saturating_sub(data)
        };
        let file = self.file_mut()?;
        let available = file.len().saturating_sub(data);
        if length > available {
            return Err(Error::TruncatedRead {
                offset: data,
                expected: length,
                actual: available,
            });
        }
        let mut stream = vec![0u8; u64_to_usize(length, "data region")?];
        file.read_at(data, &mut stream)?;

        let summary = if declared_bytes > 0 {
            self.record_counts.scan(&stream, data, group, &layout)?
        } else {
            self.record_counts.scan_prefix(&stream, data, group, &layout)?
        };
        tracing::debug!(
            group,
            data,
            rows = summary.rows,
            bytes = summary.consumed,
            "scanned data group"
        );
        Ok(summary)
    }
}
