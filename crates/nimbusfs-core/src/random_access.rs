//! Random-access reads over a forward-only stream primitive.
//!
//! Backends in scope can only open a stream at a byte offset and read
//! forward. [`RandomAccessContent`] layers a seekable cursor on top: a seek
//! away from the cursor drops the open stream (at most one live stream per
//! adapter, never leaked across seeks) and the next read lazily reopens at
//! the new position. Typed scalar reads are big-endian.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tracing::trace;

use crate::backend::Backend;
use crate::error::FsError;

/// Cursor-based read adapter for one remote object.
pub struct RandomAccessContent<B: Backend + ?Sized> {
    backend: Arc<B>,
    key: String,
    length: u64,
    cursor: u64,
    stream: Option<Box<dyn Read + Send>>,
    opens: u64,
}

impl<B: Backend + ?Sized> RandomAccessContent<B> {
    pub(crate) fn new(backend: Arc<B>, key: String, length: u64) -> Self {
        RandomAccessContent {
            backend,
            key,
            length,
            cursor: 0,
            stream: None,
            opens: 0,
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Size of the object as its metadata reported it, not the bytes left in
    /// any open stream.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// How many backend streams this adapter has opened. A seek to the
    /// current position must not change this.
    pub fn stream_opens(&self) -> u64 {
        self.opens
    }

    /// Move the cursor. Seeking to the current position is a no-op;
    /// otherwise any open stream is released immediately and the next read
    /// reopens at the new position.
    pub fn seek_to(&mut self, position: u64) {
        if position == self.cursor {
            return;
        }
        if self.stream.take().is_some() {
            trace!(key = %self.key, from = self.cursor, to = position, "released stream on seek");
        }
        self.cursor = position;
    }

    /// Skip `count` bytes without reading them.
    pub fn skip(&mut self, count: u64) {
        self.seek_to(self.cursor + count);
    }

    /// Release the underlying stream. Idempotent.
    pub fn close(&mut self) {
        self.stream = None;
    }

    /// Truncation is not supported: backends in scope are not in-place
    /// mutable.
    pub fn set_length(&mut self, _new_length: u64) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "set_length",
        })
    }

    fn ensure_stream(&mut self) -> Result<&mut (dyn Read + Send), FsError> {
        if self.stream.is_none() {
            let stream = self
                .backend
                .open_read(&self.key, self.cursor)?
                .ok_or_else(|| {
                    FsError::io(
                        "open_read",
                        self.key.clone(),
                        io::Error::from(io::ErrorKind::NotFound),
                    )
                })?;
            self.opens += 1;
            trace!(key = %self.key, offset = self.cursor, "opened stream");
            self.stream = Some(stream);
        }
        Ok(self.stream.as_mut().expect("stream just ensured").as_mut())
    }

    /// Read into `buf`, advancing the cursor by the bytes actually consumed.
    /// A partial read advances partially, never by the requested amount.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let key = self.key.clone();
        let stream = self.ensure_stream()?;
        let consumed = stream
            .read(buf)
            .map_err(|source| FsError::io("read", key, source))?;
        self.cursor += consumed as u64;
        Ok(consumed)
    }

    /// Fill `buf` completely, or fail with an unexpected-EOF error after
    /// advancing the cursor by whatever was consumed.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), FsError> {
        let mut filled = 0;
        while filled < buf.len() {
            let consumed = self.read(&mut buf[filled..])?;
            if consumed == 0 {
                return Err(FsError::io(
                    "read_exact",
                    self.key.clone(),
                    io::Error::from(io::ErrorKind::UnexpectedEof),
                ));
            }
            filled += consumed;
        }
        Ok(())
    }

    /// Read exactly `count` bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, FsError> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, FsError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, FsError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, FsError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, FsError> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_i16(&mut self) -> Result<i16, FsError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, FsError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32, FsError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, FsError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_i64(&mut self) -> Result<i64, FsError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, FsError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, FsError> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}

impl<B: Backend + ?Sized> Read for RandomAccessContent<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        RandomAccessContent::read(self, buf).map_err(io::Error::other)
    }
}

impl<B: Backend + ?Sized> Seek for RandomAccessContent<B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target: i128 = match pos {
            SeekFrom::Start(p) => i128::from(p),
            SeekFrom::Current(d) => i128::from(self.cursor) + i128::from(d),
            SeekFrom::End(d) => i128::from(self.length) + i128::from(d),
        };
        match u64::try_from(target) {
            Ok(position) => {
                self.seek_to(position);
                Ok(self.cursor)
            }
            // Negative, or past the addressable range of a u64 cursor.
            Err(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                FsError::InvalidPosition {
                    position: i64::try_from(target).unwrap_or(i64::MAX),
                },
            )),
        }
    }
}
