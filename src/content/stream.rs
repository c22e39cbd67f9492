//! Content backed by an external seekable stream.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use super::{Content, seek_target};
use crate::FsError;

/// A seekable byte stream that can also be resized.
pub trait Stream: Read + Write + Seek + Send {
    /// Resize the stream, padding with NUL bytes when growing.
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl Stream for std::fs::File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        std::fs::File::set_len(self, len)
    }
}

impl Stream for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length too large"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

/// Content that delegates every operation to a [`Stream`].
///
/// The cursor and length are mirrored locally so `tell`, `size` and
/// `is_eof` need no I/O.
pub struct StreamContent {
    stream: Box<dyn Stream>,
    position: u64,
    len: u64,
}

impl StreamContent {
    /// Wrap `stream`, measuring its length and rewinding it.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the stream cannot be seeked
    pub fn new(stream: impl Stream + 'static) -> Result<Self, FsError> {
        let mut stream: Box<dyn Stream> = Box::new(stream);
        let len = stream.seek(SeekFrom::End(0)).map_err(io_error("seek"))?;
        stream.seek(SeekFrom::Start(0)).map_err(io_error("seek"))?;
        Ok(Self {
            stream,
            position: 0,
            len,
        })
    }
}

impl fmt::Debug for StreamContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamContent")
            .field("position", &self.position)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

fn io_error(operation: &'static str) -> impl Fn(io::Error) -> FsError {
    move |source| FsError::Io { operation, source }
}

impl Content for StreamContent {
    fn read(&mut self, count: usize) -> Result<Vec<u8>, FsError> {
        let mut bytes = Vec::with_capacity(count.min(64 * 1024));
        (&mut self.stream)
            .take(count as u64)
            .read_to_end(&mut bytes)
            .map_err(io_error("read"))?;
        self.position += bytes.len() as u64;
        Ok(bytes)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        self.stream.write_all(data).map_err(io_error("write"))?;
        self.position += data.len() as u64;
        self.len = self.len.max(self.position);
        Ok(data.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<bool, FsError> {
        let Some(target) = seek_target(pos, self.position, self.len) else {
            return Ok(false);
        };
        self.position = self
            .stream
            .seek(SeekFrom::Start(target))
            .map_err(io_error("seek"))?;
        Ok(true)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn truncate(&mut self, size: u64) -> Result<bool, FsError> {
        self.stream.set_len(size).map_err(io_error("truncate"))?;
        self.len = size;
        Ok(true)
    }

    fn is_eof(&self) -> bool {
        self.position >= self.len
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn flush(&mut self) -> Result<bool, FsError> {
        self.stream.flush().map_err(io_error("flush"))?;
        Ok(true)
    }

    fn unlink(&mut self) -> bool {
        self.stream.flush().is_ok()
    }
}
