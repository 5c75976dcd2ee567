// blocks/header_block.rs
use super::common::{
    Unpacker, decode_fixed_string, encode_fixed_string, put_i16, put_u16, put_u64,
};
use super::{BlockId, Record, TypedBlock};
use alloc::string::String;
use alloc::vec::Vec;

/// Fixed record of the root header block (##HD).
///
/// The header block always lives at file offset 64 and anchors the block
/// graph. Text fields are fixed-width ASCII, NUL padded.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderRecord {
    pub date: [u8; 10],         // bytes[0..10]   "DD:MM:YYYY"
    pub time: [u8; 8],          // bytes[10..18]  "HH:MM:SS"
    pub author: [u8; 32],       // bytes[18..50]
    pub organization: [u8; 32], // bytes[50..82]
    pub project: [u8; 32],      // bytes[82..114]
    pub subject: [u8; 32],      // bytes[114..146]
    pub timestamp: u64,         // bytes[146..154] ns since epoch
    pub utc_offset: i16,        // bytes[154..156] minutes
    pub time_quality: u16,      // bytes[156..158]
    pub time_source: u8,        // byte[158]
}

impl HeaderRecord {
    /// Link to the first data group block.
    pub const LINK_FIRST_DG: usize = 0;
    /// Link to the file comment text block.
    pub const LINK_COMMENT: usize = 1;
    /// Link to the program block.
    pub const LINK_PROGRAM: usize = 2;

    pub fn date(&self) -> String {
        decode_fixed_string(&self.date)
    }

    pub fn time(&self) -> String {
        decode_fixed_string(&self.time)
    }

    pub fn author(&self) -> String {
        decode_fixed_string(&self.author)
    }

    pub fn organization(&self) -> String {
        decode_fixed_string(&self.organization)
    }

    pub fn project(&self) -> String {
        decode_fixed_string(&self.project)
    }

    pub fn subject(&self) -> String {
        decode_fixed_string(&self.subject)
    }

    pub fn set_author(&mut self, author: &str) {
        self.author = encode_fixed_string(author);
    }

    pub fn set_organization(&mut self, organization: &str) {
        self.organization = encode_fixed_string(organization);
    }

    pub fn set_project(&mut self, project: &str) {
        self.project = encode_fixed_string(project);
    }

    pub fn set_subject(&mut self, subject: &str) {
        self.subject = encode_fixed_string(subject);
    }

    /// Fill date, time and timestamp from the system clock, in UTC.
    #[cfg(feature = "std")]
    pub fn stamp_now(&mut self) {
        let now = chrono::Utc::now();
        self.date = encode_fixed_string(&now.format("%d:%m:%Y").to_string());
        self.time = encode_fixed_string(&now.format("%H:%M:%S").to_string());
        self.timestamp = now
            .timestamp_nanos_opt()
            .and_then(|ns| u64::try_from(ns).ok())
            .unwrap_or(0);
        self.utc_offset = 0;
    }
}

impl Record for HeaderRecord {
    const ID: BlockId = BlockId::HD;
    const LINK_COUNT: usize = 3;
    const SIZE: usize = 159;
    type Element = u8;

    fn unpack(bytes: &[u8]) -> Self {
        let mut r = Unpacker::new(bytes);
        Self {
            date: r.bytes(),
            time: r.bytes(),
            author: r.bytes(),
            organization: r.bytes(),
            project: r.bytes(),
            subject: r.bytes(),
            timestamp: r.u64(),
            utc_offset: r.i16(),
            time_quality: r.u16(),
            time_source: r.u8(),
        }
    }

    fn pack(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.date);
        buffer.extend_from_slice(&self.time);
        buffer.extend_from_slice(&self.author);
        buffer.extend_from_slice(&self.organization);
        buffer.extend_from_slice(&self.project);
        buffer.extend_from_slice(&self.subject);
        put_u64(buffer, self.timestamp);
        put_i16(buffer, self.utc_offset);
        put_u16(buffer, self.time_quality);
        buffer.push(self.time_source);
    }
}

/// Root header block (##HD).
pub type HeaderBlock = TypedBlock<HeaderRecord>;
