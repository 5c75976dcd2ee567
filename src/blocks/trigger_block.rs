use super::common::{Unpacker, count_to_u16, put_u16};
use super::{BlockId, Record, TypedBlock};
use crate::Result;
use alloc::vec::Vec;

/// Trigger record (##TR); the events follow as `f64` triplets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerRecord {
    pub trigger_count: u16,
}

impl TriggerRecord {
    pub const LINK_COMMENT: usize = 0;
}

/// One trigger event: trigger time plus pre- and post-trigger durations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerEvent {
    pub time: f64,
    pub pre_time: f64,
    pub post_time: f64,
}

impl Record for TriggerRecord {
    const ID: BlockId = BlockId::TR;
    const LINK_COUNT: usize = 1;
    const SIZE: usize = 2;
    type Element = f64;

    fn unpack(bytes: &[u8]) -> Self {
        Self {
            trigger_count: Unpacker::new(bytes).u16(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.trigger_count);
    }
}

pub type TriggerBlock = TypedBlock<TriggerRecord>;

impl TypedBlock<TriggerRecord> {
    /// Events stored in the variable part; a trailing partial triplet is
    /// ignored.
    pub fn events(&self) -> Vec<TriggerEvent> {
        self.elements()
            .chunks_exact(3)
            .map(|t| TriggerEvent {
                time: t[0],
                pre_time: t[1],
                post_time: t[2],
            })
            .collect()
    }

    pub fn set_events(&mut self, events: &[TriggerEvent]) -> Result<()> {
        let count = count_to_u16(events.len(), "trigger events")?;
        let values: Vec<f64> = events
            .iter()
            .flat_map(|e| [e.time, e.pre_time, e.post_time])
            .collect();
        self.record.trigger_count = count;
        self.set_elements(&values);
        Ok(())
    }
}
