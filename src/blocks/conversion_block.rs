use super::common::{
    Unpacker, count_to_u16, decode_fixed_string, encode_fixed_string, put_f64, put_u16,
};
use super::{BlockId, Record, TypedBlock};
use crate::Result;
use alloc::string::String;
use alloc::vec::Vec;

/// Conversion formula record (##CC).
///
/// The formula parameters live in the variable part as `f64` values; their
/// meaning depends on `conversion_type` and is not interpreted here.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionRecord {
    pub range_valid: u16,
    pub min: f64,
    pub max: f64,
    pub unit: [u8; 20],
    pub conversion_type: u16,
    pub parameter_count: u16,
}

impl ConversionRecord {
    pub fn unit(&self) -> String {
        decode_fixed_string(&self.unit)
    }

    pub fn set_unit(&mut self, unit: &str) {
        self.unit = encode_fixed_string(unit);
    }
}

impl Record for ConversionRecord {
    const ID: BlockId = BlockId::CC;
    const LINK_COUNT: usize = 0;
    const SIZE: usize = 42;
    type Element = f64;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            range_valid: r.u16(),
            min: r.f64(),
            max: r.f64(),
            unit: r.bytes(),
            conversion_type: r.u16(),
            parameter_count: r.u16(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        put_u16(buffer, self.range_valid);
        put_f64(buffer, self.min);
        put_f64(buffer, self.max);
        buffer.extend_from_slice(&self.unit);
        put_u16(buffer, self.conversion_type);
        put_u16(buffer, self.parameter_count);
    }
}

pub type ConversionBlock = TypedBlock<ConversionRecord>;

impl TypedBlock<ConversionRecord> {
    /// Store the formula parameters and keep `parameter_count` in step.
    pub fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        self.record.parameter_count = count_to_u16(parameters.len(), "conversion parameters")?;
        self.set_elements(parameters);
        Ok(())
    }
}
