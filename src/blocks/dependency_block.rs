use super::common::{Unpacker, count_to_u16, put_u16};
use super::{BlockId, Record, TypedBlock};
use crate::Result;
use alloc::vec::Vec;

/// Channel dependency record (##CD).
///
/// The dependencies follow in the variable part as link triplets
/// (data group, channel group, channel).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DependencyRecord {
    pub dependency_type: u16,
    pub dependency_count: u16,
}

/// Offsets of the blocks naming one dependent channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelRef {
    pub data_group: u64,
    pub channel_group: u64,
    pub channel: u64,
}

impl Record for DependencyRecord {
    const ID: BlockId = BlockId::CD;
    const LINK_COUNT: usize = 0;
    const SIZE: usize = 4;
    type Element = u64;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            dependency_type: r.u16(),
            dependency_count: r.u16(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.dependency_type);
        put_u16(buffer, self.dependency_count);
    }
}

pub type DependencyBlock = TypedBlock<DependencyRecord>;

impl TypedBlock<DependencyRecord> {
    pub fn dependencies(&self) -> Vec<ChannelRef> {
        self.elements()
            .chunks_exact(3)
            .map(|t| ChannelRef {
                data_group: t[0],
                channel_group: t[1],
                channel: t[2],
            })
            .collect()
    }

    pub fn set_dependencies(&mut self, dependencies: &[ChannelRef]) -> Result<()> {
        let count = count_to_u16(dependencies.len(), "channel dependencies")?;
        let links: Vec<u64> = dependencies
            .iter()
            .flat_map(|d| [d.data_group, d.channel_group, d.channel])
            .collect();
        self.record.dependency_count = count;
        self.set_elements(&links);
        Ok(())
    }
}
