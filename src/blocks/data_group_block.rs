use super::common::{Unpacker, put_u16, put_u32};
use super::{BlockId, Record, TypedBlock};
use alloc::vec::Vec;

/// Data Group record (##DG) - groups channel groups that share one data
/// region.
///
/// When `record_id_count` is nonzero the rows of the data region are tagged
/// with a leading record id naming their channel group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataGroupRecord {
    /// Number of channel groups in this data group.
    pub channel_group_count: u16,
    /// Number of record ids per row (0, 1 or 2).
    pub record_id_count: u16,
    pub reserved: u32,
}

impl DataGroupRecord {
    /// Link to the next data group block (0 if last).
    pub const LINK_NEXT_DG: usize = 0;
    /// Link to the first channel group block.
    pub const LINK_FIRST_CG: usize = 1;
    /// Link to the trigger block.
    pub const LINK_TRIGGER: usize = 2;
    /// Link to the raw data region (not a block).
    pub const LINK_DATA: usize = 3;
}

impl Record for DataGroupRecord {
    const ID: BlockId = BlockId::DG;
    const LINK_COUNT: usize = 4;
    const SIZE: usize = 8;
    type Element = u8;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            channel_group_count: r.u16(),
            record_id_count: r.u16(),
            reserved: r.u32(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.channel_group_count);
        put_u16(buffer, self.record_id_count);
        put_u32(buffer, self.reserved);
    }
}

pub type DataGroupBlock = TypedBlock<DataGroupRecord>;
