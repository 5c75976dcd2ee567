use super::common::{LINK_SIZE, read_u64};
use crate::{Error, Result};
use alloc::vec;
use alloc::vec::Vec;

/// Index-addressed link slots of a block.
///
/// Each slot is an absolute file offset; `0` means "no referenced block".
/// Reads outside the table are tolerated and report no link, writes outside
/// the table fail with [`Error::LinkSlotOutOfRange`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkTable {
    slots: Vec<u64>,
}

impl LinkTable {
    /// A table of `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![0; len],
        }
    }

    pub fn from_vec(slots: Vec<u64>) -> Self {
        Self { slots }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True iff `index` is in range and the slot holds a nonzero offset.
    pub fn has(&self, index: usize) -> bool {
        self.get(index) != 0
    }

    /// The offset stored at `index`, or `0` when `index` is out of range.
    pub fn get(&self, index: usize) -> u64 {
        self.slots.get(index).copied().unwrap_or(0)
    }

    /// Store `offset` at `index`.
    pub fn set(&mut self, index: usize, offset: u64) -> Result<()> {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = offset;
                Ok(())
            }
            None => Err(Error::LinkSlotOutOfRange { index, len }),
        }
    }

    /// Grow or shrink the table; new slots are empty.
    pub fn resize(&mut self, len: usize) {
        self.slots.resize(len, 0);
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.slots.iter().copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.slots
    }

    /// Size of the table on disk.
    pub fn byte_len(&self) -> usize {
        self.slots.len() * LINK_SIZE
    }

    /// Append the little-endian encoding of every slot to `buffer`.
    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        for slot in &self.slots {
            buffer.extend_from_slice(&slot.to_le_bytes());
        }
    }

    /// Decode a table from `bytes`, one slot per 8 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let slots = (0..bytes.len() / LINK_SIZE)
            .map(|i| read_u64(bytes, i * LINK_SIZE))
            .collect();
        Self { slots }
    }
}
