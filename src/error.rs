//! Error types for MDF3 container operations.
//!
//! This module defines the [`Error`] enum which represents every failure that
//! can occur while reading, writing, or navigating the block graph of an MDF3
//! file.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "std")]
//! use mdf3_rs::{Error, Mdf3File, Result};
//!
//! # #[cfg(feature = "std")]
//! fn open_file(path: &str) -> Result<()> {
//!     match Mdf3File::open(path, false) {
//!         Ok(file) => {
//!             println!("author: {}", file.header().record.author());
//!             Ok(())
//!         }
//!         Err(Error::FileIdentifierError(id)) => {
//!             eprintln!("Not an MDF file: {}", id);
//!             Err(Error::FileIdentifierError(id))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use core::fmt;

use alloc::string::String;

use crate::blocks::BlockId;

/// Errors that can occur during MDF3 file operations.
#[derive(Debug)]
pub enum Error {
    /// Buffer provided for parsing was too small.
    TooShortBuffer {
        /// Actual number of bytes available
        actual: usize,
        /// Minimum number of bytes required
        expected: usize,
        /// Source file where the error was detected
        file: &'static str,
        /// Line number where the error was detected
        line: u32,
    },

    /// The two marker bytes in front of a block were not `"##"`.
    ///
    /// Nothing beyond the header is read when this is reported.
    MalformedHeader {
        /// File offset of the block
        offset: u64,
        /// The marker bytes that were found
        marker: [u8; 2],
    },

    /// Fewer bytes were available than the block or file handle declared.
    TruncatedRead {
        /// File offset where the read started
        offset: u64,
        /// Number of bytes requested
        expected: u64,
        /// Number of bytes actually available
        actual: u64,
    },

    /// The declared block length cannot even hold the header and link table.
    InvalidBlockLength {
        /// File offset of the block
        offset: u64,
        /// Declared length
        length: u64,
        /// Minimum length implied by the header and link count
        minimum: u64,
    },

    /// No constructor is registered for this type code and the factory runs
    /// in strict mode.
    UnknownBlockType {
        /// File offset of the block
        offset: u64,
        /// The unrecognised type code
        id: BlockId,
    },

    /// A link slot was written outside of the block's link table.
    LinkSlotOutOfRange {
        /// Requested slot
        index: usize,
        /// Number of slots in the table
        len: usize,
    },

    /// A linked block did not have the expected type code.
    TypeMismatch {
        /// The type code the caller asked for
        expected: BlockId,
        /// The type code found on disk
        actual: BlockId,
    },

    /// A data row carried a record id that no channel group declares.
    UnknownRecordId {
        /// File offset of the row
        offset: u64,
        /// The record id found in the row
        record_id: u64,
    },

    /// A variable-part segment other than `0` was requested.
    InvalidDataSegment {
        /// The requested segment index
        index: usize,
    },

    /// The file identifier is not `"MDF     "` or `"UnFinMF "`.
    FileIdentifierError(String),

    /// The MDF version is not a 3.x version.
    FileVersioningError(String),

    /// The version string in the identification block could not be parsed.
    InvalidVersionString(String),

    /// Failed to link blocks together during file writing.
    BlockLinkError(String),

    /// Failed to serialize a block to bytes.
    BlockSerializationError(String),

    /// The container has already been closed.
    FileClosed,

    /// A write was attempted on a container opened without update access.
    ReadOnly,

    /// An I/O error occurred while reading or writing the file.
    ///
    /// Only available with the `std` feature.
    #[cfg(feature = "std")]
    IOError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooShortBuffer {
                actual,
                expected,
                file,
                line,
            } => write!(
                f,
                "Buffer too small at {file}:{line}: need at least {expected} bytes, got {actual}"
            ),
            Error::MalformedHeader { offset, marker } => write!(
                f,
                "Malformed block header at {offset:#x}: expected marker \"##\", found {:?}",
                String::from_utf8_lossy(marker)
            ),
            Error::TruncatedRead {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "Truncated read at {offset:#x}: expected {expected} bytes, got {actual}"
            ),
            Error::InvalidBlockLength {
                offset,
                length,
                minimum,
            } => write!(
                f,
                "Invalid block length at {offset:#x}: declared {length}, need at least {minimum}"
            ),
            Error::UnknownBlockType { offset, id } => {
                write!(f, "Unknown block type {id} at {offset:#x}")
            }
            Error::LinkSlotOutOfRange { index, len } => {
                write!(f, "Link slot {index} out of range (block has {len} links)")
            }
            Error::TypeMismatch { expected, actual } => {
                write!(f, "Block type mismatch: expected {expected}, got {actual}")
            }
            Error::UnknownRecordId { offset, record_id } => {
                write!(f, "Unknown record id {record_id} in data row at {offset:#x}")
            }
            Error::InvalidDataSegment { index } => {
                write!(f, "Invalid data segment {index}: only segment 0 exists")
            }
            Error::FileIdentifierError(id) => {
                write!(
                    f,
                    r#"Invalid file identifier: Expected "MDF     ", found {id}"#
                )
            }
            Error::FileVersioningError(ver) => {
                write!(f, r#"Unsupported file version: Expected "3.xx", found {ver}"#)
            }
            Error::InvalidVersionString(s) => write!(f, "Invalid version string: {s}"),
            Error::BlockLinkError(s) => write!(f, "Block linking error: {s}"),
            Error::BlockSerializationError(s) => write!(f, "Block serialization error: {s}"),
            Error::FileClosed => write!(f, "File has already been closed"),
            Error::ReadOnly => write!(f, "File was opened without update access"),
            #[cfg(feature = "std")]
            Error::IOError(e) => write!(f, "I/O error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

/// A specialized Result type for MDF3 operations.
pub type Result<T> = core::result::Result<T, Error>;
