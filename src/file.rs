//! Random-access file handles used by the container.
//!
//! The container never touches `std::fs` directly; it goes through
//! [`RandomAccessFile`], which is implemented for an in-memory buffer
//! ([`MemoryFile`], available without `std`) and for files on disk
//! ([`DiskFile`], `std` only).

use crate::{Error, Result};
use alloc::vec::Vec;

/// Positional read/write access to the bytes of an MDF file.
pub trait RandomAccessFile {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with [`Error::TruncatedRead`] when fewer than `buf.len()` bytes
    /// are available.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write all of `bytes` starting at `offset`, extending the file if needed.
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()>;

    /// Current length of the file in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush any buffered data.
    fn flush(&mut self) -> Result<()>;
}

/// A file held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    buffer: Vec<u8>,
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing file contents.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl RandomAccessFile for MemoryFile {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let available = (self.buffer.len() as u64).saturating_sub(offset);
        if available < buf.len() as u64 {
            return Err(Error::TruncatedRead {
                offset,
                expected: buf.len() as u64,
                actual: available,
            });
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = crate::blocks::u64_to_usize(offset, "write offset")?;
        let end = start + bytes.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "std")]
mod std_impl {
    use super::RandomAccessFile;
    use crate::{Error, Result};
    use std::fs::{File, OpenOptions};
    use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
    use std::path::Path;

    /// A file on disk, opened read-only or for update.
    #[derive(Debug)]
    pub struct DiskFile {
        inner: File,
        writable: bool,
        len: u64,
    }

    impl DiskFile {
        /// Open an existing file. `update` allows writes.
        pub fn open<P: AsRef<Path>>(path: P, update: bool) -> Result<Self> {
            let inner = OpenOptions::new().read(true).write(update).open(path)?;
            let len = inner.metadata()?.len();
            Ok(Self {
                inner,
                writable: update,
                len,
            })
        }

        /// Create (or truncate) a file for reading and writing.
        pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
            let inner = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            Ok(Self {
                inner,
                writable: true,
                len: 0,
            })
        }

        pub fn is_writable(&self) -> bool {
            self.writable
        }
    }

    impl RandomAccessFile for DiskFile {
        fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
            self.inner.seek(SeekFrom::Start(offset))?;
            let mut filled = 0;
            while filled < buf.len() {
                match self.inner.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            if filled < buf.len() {
                return Err(Error::TruncatedRead {
                    offset,
                    expected: buf.len() as u64,
                    actual: filled as u64,
                });
            }
            Ok(())
        }

        fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
            if !self.writable {
                return Err(Error::IOError(std::io::Error::new(
                    ErrorKind::PermissionDenied,
                    "file was opened read-only",
                )));
            }
            self.inner.seek(SeekFrom::Start(offset))?;
            self.inner.write_all(bytes)?;
            self.len = self.len.max(offset + bytes.len() as u64);
            Ok(())
        }

        fn len(&self) -> u64 {
            self.len
        }

        fn flush(&mut self) -> Result<()> {
            self.inner.flush()?;
            Ok(())
        }
    }
}

#[cfg(feature = "std")]
pub use std_impl::DiskFile;
