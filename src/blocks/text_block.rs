use super::{Block, BlockId, Record, TypedBlock};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Text block (##TX): no links, no fixed fields, NUL-terminated text in the
/// variable part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextRecord;

impl Record for TextRecord {
    const ID: BlockId = BlockId::TX;
    const LINK_COUNT: usize = 0;
    const SIZE: usize = 0;
    type Element = u8;

    fn unpack(_bytes: &[u8]) -> Self {
        TextRecord
    }

    fn pack(&self, _buffer: &mut Vec<u8>) {}
}

pub type TextBlock = TypedBlock<TextRecord>;

impl TypedBlock<TextRecord> {
    /// A text block holding `text` followed by a NUL terminator.
    pub fn from_text(text: &str) -> Self {
        let mut block = Self::new();
        let mut data = Vec::with_capacity(text.len() + 1);
        data.extend_from_slice(text.as_bytes());
        data.push(0);
        block.set_variable(data);
        block
    }

    /// The stored text with NUL padding removed.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.variable())
            .trim_matches('\0')
            .to_string()
    }
}
