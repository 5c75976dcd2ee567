use super::{BlockId, Record, TypedBlock};
use alloc::vec::Vec;

/// Program block (##PR): producer-specific bytes, opaque to the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramRecord;

impl Record for ProgramRecord {
    const ID: BlockId = BlockId::PR;
    const LINK_COUNT: usize = 0;
    const SIZE: usize = 0;
    type Element = u8;

    fn unpack(_bytes: &[u8]) -> Self {
        ProgramRecord
    }

    fn pack(&self, _buffer: &mut Vec<u8>) {}
}

pub type ProgramBlock = TypedBlock<ProgramRecord>;

impl TypedBlock<ProgramRecord> {
    pub fn with_data(data: Vec<u8>) -> Self {
        let mut block = Self::new();
        block.set_variable(data);
        block
    }
}
