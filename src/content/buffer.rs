//! Growable in-memory byte buffer.

use std::io::SeekFrom;

use tracing::trace;

use super::{Content, seek_target};
use crate::FsError;

/// In-memory content: a `Vec<u8>` plus a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferContent {
    data: Vec<u8>,
    position: u64,
}

impl BufferContent {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with `data`, cursor at 0.
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// The stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn cursor(&self) -> usize {
        usize::try_from(self.position).unwrap_or(usize::MAX)
    }
}

impl From<Vec<u8>> for BufferContent {
    fn from(data: Vec<u8>) -> Self {
        Self::with_data(data)
    }
}

impl From<&str> for BufferContent {
    fn from(data: &str) -> Self {
        Self::with_data(data.as_bytes())
    }
}

impl Content for BufferContent {
    fn read(&mut self, count: usize) -> Result<Vec<u8>, FsError> {
        let start = self.cursor().min(self.data.len());
        let end = start.saturating_add(count).min(self.data.len());
        let bytes = self.data[start..end].to_vec();
        self.position += bytes.len() as u64;
        trace!(start, read = bytes.len(), "buffer read");
        Ok(bytes)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        let start = self.cursor();
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| FsError::invalid("write past addressable range"))?;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
        self.position = end as u64;
        trace!(start, written = data.len(), "buffer write");
        Ok(data.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<bool, FsError> {
        match seek_target(pos, self.position, self.size()) {
            Some(target) => {
                self.position = target;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn truncate(&mut self, size: u64) -> Result<bool, FsError> {
        let size = usize::try_from(size)
            .map_err(|_| FsError::invalid(format!("truncate size {size} too large")))?;
        self.data.resize(size, 0);
        Ok(true)
    }

    fn is_eof(&self) -> bool {
        self.position >= self.size()
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn unlink(&mut self) -> bool {
        self.data = Vec::new();
        self.position = 0;
        true
    }
}
