use super::common::{Unpacker, put_f64, put_u32};
use super::{BlockId, Record, TypedBlock};
use alloc::vec::Vec;

/// Sample reduction record (##SR) - an alternative, coarser row set for a
/// channel group.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleReductionRecord {
    pub reduced_count: u32,
    /// Length of one reduction interval in seconds.
    pub interval: f64,
}

impl SampleReductionRecord {
    pub const LINK_NEXT_SR: usize = 0;
    pub const LINK_DATA: usize = 1;
}

impl Record for SampleReductionRecord {
    const ID: BlockId = BlockId::SR;
    const LINK_COUNT: usize = 2;
    const SIZE: usize = 12;
    type Element = u8;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            reduced_count: r.u32(),
            interval: r.f64(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u32(buffer, self.reduced_count);
        put_f64(buffer, self.interval);
    }
}

pub type SampleReductionBlock = TypedBlock<SampleReductionRecord>;
