// blocks/identification_block.rs
use super::common::{read_u16, validate_buffer_size};
use crate::{Error, Result};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::{self, from_utf8};

/// Size of the identification area in front of the header block.
pub const ID_BLOCK_SIZE: usize = 64;

/// Identification Block - the 64-byte preamble at the start of every MDF3 file.
///
/// It identifies the file as MDF, names the producing program and declares
/// the defaults (byte order, float format, code page) for the rest of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdentificationBlock {
    /// File identifier string ("MDF     " or "UnFinMF ").
    pub file_id: String,
    /// Format version string (e.g., "3.30    ").
    pub format_version: String,
    /// Program identifier string (tool that created the file).
    pub program_id: String,
    /// Default byte order, 0 = little endian.
    pub byte_order: u16,
    /// Default floating-point format, 0 = IEEE 754.
    pub float_format: u16,
    /// Numeric version (e.g., 330 for version 3.30).
    pub version_number: u16,
    /// Code page of the text fields, 0 = unspecified.
    pub code_page: u16,
    /// Standard unfinalized flags.
    pub unfinalized_flags: u16,
    /// Custom unfinalized flags (vendor-specific).
    pub custom_flags: u16,
}

impl Default for IdentificationBlock {
    fn default() -> Self {
        Self::new("mdf3-rs", 330)
    }
}

impl IdentificationBlock {
    /// Identification for a file produced by `producer` in format `version`
    /// (e.g. 330 for "3.30").
    pub fn new(producer: &str, version: u16) -> Self {
        Self {
            file_id: String::from("MDF     "),
            format_version: format!("{}.{:02}    ", version / 100, version % 100),
            program_id: producer.to_string(),
            byte_order: 0,
            float_format: 0,
            version_number: version,
            code_page: 0,
            unfinalized_flags: 0,
            custom_flags: 0,
        }
    }

    /// Copy a string into a fixed-size field, space padded.
    fn copy_string_with_padding(source: &str, target: &mut [u8]) {
        let src_bytes = source.as_bytes();
        let copy_len = core::cmp::min(src_bytes.len(), target.len());
        target[..copy_len].copy_from_slice(&src_bytes[..copy_len]);
        for byte in target.iter_mut().skip(copy_len) {
            *byte = b' ';
        }
    }

    /// Serializes the IdentificationBlock to its 64-byte on-disk form.
    ///
    /// - File identifier: 8 bytes
    /// - Format identifier: 8 bytes
    /// - Program identifier: 8 bytes
    /// - Byte order, float format, version number, code page: 2 bytes each
    /// - Reserved: 28 bytes (zeros)
    /// - Standard and custom unfinalized flags: 2 bytes each
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(ID_BLOCK_SIZE);

        let mut field = [0u8; 8];
        Self::copy_string_with_padding(&self.file_id, &mut field);
        buffer.extend_from_slice(&field);
        Self::copy_string_with_padding(&self.format_version, &mut field);
        buffer.extend_from_slice(&field);
        Self::copy_string_with_padding(&self.program_id, &mut field);
        buffer.extend_from_slice(&field);

        buffer.extend_from_slice(&self.byte_order.to_le_bytes());
        buffer.extend_from_slice(&self.float_format.to_le_bytes());
        buffer.extend_from_slice(&self.version_number.to_le_bytes());
        buffer.extend_from_slice(&self.code_page.to_le_bytes());

        buffer.extend_from_slice(&[0u8; 28]);

        buffer.extend_from_slice(&self.unfinalized_flags.to_le_bytes());
        buffer.extend_from_slice(&self.custom_flags.to_le_bytes());

        debug_assert_eq!(buffer.len(), ID_BLOCK_SIZE);
        buffer
    }

    /// Parses and validates an identification block from a 64 byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        validate_buffer_size(bytes, ID_BLOCK_SIZE)?;

        let file_id = str::from_utf8(&bytes[0..8])
            .map(String::from)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes[0..8]).into_owned());

        // Accept both finalized ("MDF     ") and unfinalized ("UnFinMF ") files
        if file_id != "MDF     " && file_id != "UnFinMF " {
            return Err(Error::FileIdentifierError(file_id));
        }

        let (major, minor) = Self::parse_block_version(&bytes[8..16])?;
        if major != 3 {
            return Err(Error::FileVersioningError(format!("{major}.{minor:02}")));
        }

        Ok(Self {
            file_id,
            format_version: String::from_utf8_lossy(&bytes[8..16]).into_owned(),
            program_id: String::from_utf8_lossy(&bytes[16..24])
                .trim_end_matches(['\0', ' '])
                .to_string(),
            byte_order: read_u16(bytes, 24),
            float_format: read_u16(bytes, 26),
            version_number: read_u16(bytes, 28),
            code_page: read_u16(bytes, 30),
            unfinalized_flags: read_u16(bytes, 60),
            custom_flags: read_u16(bytes, 62),
        })
    }

    /// True when the file was not finalized by its producer.
    pub fn is_unfinalized(&self) -> bool {
        self.file_id == "UnFinMF "
    }

    /// Parse the textual version stored in the identification block.
    ///
    /// # Arguments
    /// * `bytes` - Eight bytes containing the version string, e.g. `"3.30    "`.
    ///
    /// # Returns
    /// `(major, minor)` on success or an [`Error`] when the format is
    /// unexpected.
    pub fn parse_block_version(bytes: &[u8]) -> Result<(u16, u16)> {
        let raw = from_utf8(bytes)
            .map_err(|_| Error::InvalidVersionString("Invalid UTF-8".to_string()))?;

        let s = raw.trim_end_matches(char::from(0)).trim();
        let mut parts = s.split('.');
        let maj = parts
            .next()
            .ok_or_else(|| Error::InvalidVersionString("Missing major version".to_string()))?
            .parse::<u16>()
            .map_err(|_| Error::InvalidVersionString("Invalid major version string".to_string()))?;
        let min =
            parts.next().unwrap_or("0").parse::<u16>().map_err(|_| {
                Error::InvalidVersionString("Invalid minor version string".to_string())
            })?;
        Ok((maj, min))
    }
}
