use super::common::{
    Unpacker, decode_fixed_string, encode_fixed_string, put_f64, put_u16,
};
use super::{BlockId, Record, TypedBlock};
use alloc::string::String;
use alloc::vec::Vec;

/// Channel record (##CN) - placement of one signal inside the rows of its
/// channel group.
///
/// Only the layout is described here; decoding sample values is left to
/// higher layers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelRecord {
    /// 0 = data channel, 1 = time (master) channel.
    pub channel_type: u16,
    pub short_name: [u8; 32],
    #[cfg_attr(feature = "serde", serde(with = "description_bytes"))]
    pub description: [u8; 128],
    pub start_bit: u16,
    pub bit_count: u16,
    pub data_type: u16,
    pub range_valid: u16,
    pub min: f64,
    pub max: f64,
    pub sample_rate: f64,
    pub additional_byte_offset: u16,
}

impl Default for ChannelRecord {
    fn default() -> Self {
        Self {
            channel_type: 0,
            short_name: [0; 32],
            description: [0; 128],
            start_bit: 0,
            bit_count: 0,
            data_type: 0,
            range_valid: 0,
            min: 0.0,
            max: 0.0,
            sample_rate: 0.0,
            additional_byte_offset: 0,
        }
    }
}

impl ChannelRecord {
    pub const LINK_NEXT_CN: usize = 0;
    pub const LINK_CONVERSION: usize = 1;
    pub const LINK_EXTENSION: usize = 2;
    pub const LINK_DEPENDENCY: usize = 3;
    pub const LINK_COMMENT: usize = 4;
    pub const LINK_LONG_NAME: usize = 5;
    pub const LINK_DISPLAY_NAME: usize = 6;

    pub fn short_name(&self) -> String {
        decode_fixed_string(&self.short_name)
    }

    pub fn set_short_name(&mut self, name: &str) {
        self.short_name = encode_fixed_string(name);
    }

    pub fn description(&self) -> String {
        decode_fixed_string(&self.description)
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = encode_fixed_string(description);
    }
}

impl Record for ChannelRecord {
    const ID: BlockId = BlockId::CN;
    const LINK_COUNT: usize = 7;
    const SIZE: usize = 196;
    type Element = u8;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            channel_type: r.u16(),
            short_name: r.bytes(),
            description: r.bytes(),
            start_bit: r.u16(),
            bit_count: r.u16(),
            data_type: r.u16(),
            range_valid: r.u16(),
            min: r.f64(),
            max: r.f64(),
            sample_rate: r.f64(),
            additional_byte_offset: r.u16(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.channel_type);
        buffer.extend_from_slice(&self.short_name);
        buffer.extend_from_slice(&self.description);
        put_u16(buffer, self.start_bit);
        put_u16(buffer, self.bit_count);
        put_u16(buffer, self.data_type);
        put_u16(buffer, self.range_valid);
        put_f64(buffer, self.min);
        put_f64(buffer, self.max);
        put_f64(buffer, self.sample_rate);
        put_u16(buffer, self.additional_byte_offset);
    }
}

pub type ChannelBlock = TypedBlock<ChannelRecord>;

// serde only implements arrays up to 32 elements.
#[cfg(feature = "serde")]
mod description_bytes {
    use alloc::vec::Vec;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8; 128], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 128], D::Error> {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        raw.try_into()
            .map_err(|v: Vec<u8>| D::Error::invalid_length(v.len(), &"128 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_offsets() {
        let mut record = ChannelRecord::default();
        record.channel_type = 1;
        record.set_short_name("time");
        record.bit_count = 64;
        record.additional_byte_offset = 0xABCD;
        let mut buffer = Vec::new();
        record.pack(&mut buffer);
        assert_eq!(buffer.len(), ChannelRecord::SIZE);
        assert_eq!(&buffer[2..6], b"time");
        assert_eq!(&buffer[164..166], &64u16.to_le_bytes());
        assert_eq!(&buffer[194..196], &0xABCDu16.to_le_bytes());
        let parsed = ChannelRecord::unpack(&buffer);
        assert_eq!(parsed.short_name(), "time");
        assert_eq!(parsed, record);
    }
}
