//! Seekable byte source with endian-aware integer reads.
//!
//! [`ByteOrderReader`] is the single point through which the TIFF parser
//! touches the underlying file. It offers fixed-width unsigned integer
//! reads in a chosen endianness and a read-at-absolute-offset primitive
//! that restores the previous position afterwards, so the IFD walker can
//! realise offset-stored tag payloads without losing its place in the
//! directory chain.
//!
//! The reader performs no internal synchronisation: a single file handle
//! must not be shared between concurrent parse operations.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::TiffError;
use crate::io::byte_order::ByteOrder;

/// A seekable byte source that reads fixed-width unsigned integers with a
/// chosen endianness.
pub struct ByteOrderReader<R> {
    inner: R,
}

impl<R: Read + Seek> ByteOrderReader<R> {
    /// Wrap a seekable source.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current absolute position in the source.
    pub fn position(&mut self) -> Result<u64, TiffError> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to an absolute offset.
    pub fn seek_to(&mut self, offset: u64) -> Result<(), TiffError> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Fill `buf` from the current position.
    ///
    /// A short read is reported as [`TiffError::Eof`]; any other failure
    /// as [`TiffError::Io`].
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TiffError> {
        let needed = buf.len();
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.classify(e, needed)),
        }
    }

    /// Fill `buf` from an absolute offset, restoring the previous position
    /// afterwards (also on failure).
    ///
    /// This is the only operation that seeks on behalf of the caller; it
    /// must not be interleaved with other reads on the same handle from
    /// another thread.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), TiffError> {
        let saved = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(offset))?;
        let needed = buf.len();
        let result = match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.classify(e, needed)),
        };
        self.inner.seek(SeekFrom::Start(saved))?;
        result
    }

    /// Read a u16 in the given byte order.
    pub fn read_u16(&mut self, order: ByteOrder) -> Result<u16, TiffError> {
        let result = match order {
            ByteOrder::LittleEndian => self.inner.read_u16::<LittleEndian>(),
            ByteOrder::BigEndian => self.inner.read_u16::<BigEndian>(),
        };
        result.map_err(|e| self.classify(e, 2))
    }

    /// Read a u32 in the given byte order.
    pub fn read_u32(&mut self, order: ByteOrder) -> Result<u32, TiffError> {
        let result = match order {
            ByteOrder::LittleEndian => self.inner.read_u32::<LittleEndian>(),
            ByteOrder::BigEndian => self.inner.read_u32::<BigEndian>(),
        };
        result.map_err(|e| self.classify(e, 4))
    }

    /// Read a u64 in the given byte order.
    pub fn read_u64(&mut self, order: ByteOrder) -> Result<u64, TiffError> {
        let result = match order {
            ByteOrder::LittleEndian => self.inner.read_u64::<LittleEndian>(),
            ByteOrder::BigEndian => self.inner.read_u64::<BigEndian>(),
        };
        result.map_err(|e| self.classify(e, 8))
    }

    /// Map a raw I/O error to the crate error model: short reads become
    /// `Eof`, everything else stays `Io`.
    fn classify(&mut self, e: std::io::Error, needed: usize) -> TiffError {
        if e.kind() == ErrorKind::UnexpectedEof {
            let offset = self.inner.stream_position().unwrap_or(0);
            TiffError::Eof {
                offset,
                needed: needed as u64,
            }
        } else {
            TiffError::Io(e)
        }
    }
}
