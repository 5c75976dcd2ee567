use super::common::{Unpacker, put_u16};
use super::{BlockId, Record, TypedBlock};
use alloc::vec::Vec;

/// Channel extension record (##CE) - describes where a channel's data came
/// from. The type-specific description follows as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtensionRecord {
    pub extension_type: u16,
}

/// Known extension types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtensionType {
    /// ECU described by module number, address and identifiers.
    Dim,
    /// CAN message described by identifier, channel and names.
    VectorCan,
    Other(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            2 => ExtensionType::Dim,
            19 => ExtensionType::VectorCan,
            other => ExtensionType::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            ExtensionType::Dim => 2,
            ExtensionType::VectorCan => 19,
            ExtensionType::Other(v) => v,
        }
    }
}

impl Record for ExtensionRecord {
    const ID: BlockId = BlockId::CE;
    const LINK_COUNT: usize = 0;
    const SIZE: usize = 2;
    type Element = u8;

    fn unpack(bytes: &[u8]) -> Self {
        Self {
            extension_type: Unpacker::new(bytes).u16(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.extension_type);
    }
}

pub type ExtensionBlock = TypedBlock<ExtensionRecord>;

impl TypedBlock<ExtensionRecord> {
    pub fn new_with_type(extension_type: ExtensionType, description: Vec<u8>) -> Self {
        let mut block = Self::with_record(ExtensionRecord {
            extension_type: extension_type.to_u16(),
        });
        block.set_variable(description);
        block
    }

    pub fn extension_type(&self) -> ExtensionType {
        ExtensionType::from_u16(self.record.extension_type)
    }
}
