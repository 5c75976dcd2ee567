use super::common::{Unpacker, put_u16, put_u32};
use super::{BlockId, Record, TypedBlock};
use alloc::vec::Vec;

/// Channel Group record (##CG) - channels that are always sampled together
/// and share one row layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelGroupRecord {
    pub record_id: u16,     // 2 bytes
    pub channel_count: u16, // 2 bytes
    pub record_size: u16,   // 2 bytes, row size without record ids
    pub record_count: u32,  // 4 bytes
}

impl ChannelGroupRecord {
    pub const LINK_NEXT_CG: usize = 0;
    pub const LINK_FIRST_CN: usize = 1;
    pub const LINK_COMMENT: usize = 2;
    pub const LINK_FIRST_SR: usize = 3;
}

impl Record for ChannelGroupRecord {
    const ID: BlockId = BlockId::CG;
    const LINK_COUNT: usize = 4;
    const SIZE: usize = 10;
    type Element = u8;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            record_id: r.u16(),
            channel_count: r.u16(),
            record_size: r.u16(),
            record_count: r.u32(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.record_id);
        put_u16(buffer, self.channel_count);
        put_u16(buffer, self.record_size);
        put_u32(buffer, self.record_count);
    }
}

pub type ChannelGroupBlock = TypedBlock<ChannelGroupRecord>;
