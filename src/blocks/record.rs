//! Fixed record layouts and variable-part elements.
//!
//! A [`Record`] is the typed, fixed-size payload of one block kind. It is
//! never reinterpreted from memory: every record spells out its on-disk
//! layout in [`Record::unpack`] and [`Record::pack`].

use super::common::BlockId;
use alloc::vec::Vec;
use core::fmt::Debug;

/// Fixed-width little-endian value stored in the variable part of a block.
pub trait VarElement: Copy + Default + Debug + PartialEq + 'static {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decode one element from exactly [`Self::WIDTH`] bytes.
    fn decode(bytes: &[u8]) -> Self;

    /// Append the encoding of `self` to `buffer`.
    fn encode(&self, buffer: &mut Vec<u8>);
}

macro_rules! impl_var_element {
    ($($ty:ty),*) => {
        $(
            impl VarElement for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_le_bytes(raw)
                }

                fn encode(&self, buffer: &mut Vec<u8>) {
                    buffer.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_var_element!(u8, u16, u32, u64, f64);

/// Fixed-size record layout of one block kind.
///
/// `Default` must produce the all-zero record: a block whose on-disk fixed
/// part is shorter than [`Record::SIZE`] keeps the default for every field
/// past the available prefix.
pub trait Record: Default + Clone + Debug + 'static {
    /// Type code written into the block header.
    const ID: BlockId;

    /// Number of link slots of this block kind.
    const LINK_COUNT: usize;

    /// Size of the packed record in bytes.
    const SIZE: usize;

    /// Element type of the variable part.
    type Element: VarElement;

    /// Decode the record from exactly [`Record::SIZE`] bytes.
    fn unpack(bytes: &[u8]) -> Self;

    /// Append exactly [`Record::SIZE`] bytes to `buffer`.
    fn pack(&self, buffer: &mut Vec<u8>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_are_little_endian() {
        let mut buffer = Vec::new();
        0x0102u16.encode(&mut buffer);
        1.5f64.encode(&mut buffer);
        assert_eq!(&buffer[..2], &[0x02, 0x01]);
        assert_eq!(u16::decode(&buffer[..2]), 0x0102);
        assert_eq!(f64::decode(&buffer[2..]), 1.5);
        assert_eq!(<u64 as VarElement>::WIDTH, 8);
    }
}
