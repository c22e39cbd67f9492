//! # Content Backends
//!
//! Byte storage behind regular files and block devices.
//!
//! ## Responsibility
//! - Define the [`Content`] contract: cursor-based read/write/seek/truncate
//!   plus size, EOF, flush and release
//! - Provide the fixed-behaviour backends
//!
//! ## Backends
//!
//! | Type | Behaviour |
//! |------|-----------|
//! | [`BufferContent`] | Growable in-memory byte buffer |
//! | [`EmptyContent`] | Always empty, writes are discarded |
//! | [`ZeroContent`] | Reads yield NUL bytes, writes are discarded |
//! | [`RandomContent`] | Reads yield random bytes, writes are discarded |
//! | [`StreamContent`] | Delegates to any seekable stream (e.g. `std::fs::File`) |
//!
//! The tree never talks to a backend directly from two places at once: every
//! access goes through a [`FileHandle`](crate::FileHandle) which re-seeks the
//! backend to its own cursor first.

mod buffer;
mod special;
mod stream;

pub use buffer::BufferContent;
pub use special::{EmptyContent, RandomContent, ZeroContent};
pub use stream::{Stream, StreamContent};

use std::fmt;
use std::io::SeekFrom;

use crate::FsError;

/// Byte-addressable storage with a single cursor.
///
/// # Object Safety
///
/// This trait is object-safe; nodes store `Box<dyn Content>`.
pub trait Content: Send + fmt::Debug {
    /// Read up to `count` bytes from the cursor and advance it.
    ///
    /// Returns fewer bytes (possibly none) at end of content.
    fn read(&mut self, count: usize) -> Result<Vec<u8>, FsError>;

    /// Write `data` at the cursor and advance it. Returns the bytes accepted.
    ///
    /// Writing past the end pads the gap with NUL bytes.
    fn write(&mut self, data: &[u8]) -> Result<usize, FsError>;

    /// Move the cursor.
    ///
    /// Returns `Ok(false)` and leaves the cursor unchanged when the target
    /// would be negative. Seeking past the end is allowed.
    fn seek(&mut self, pos: SeekFrom) -> Result<bool, FsError>;

    /// Current cursor position.
    fn tell(&self) -> u64;

    /// Resize to `size` bytes. Growing pads with NUL bytes; the cursor is
    /// never moved.
    fn truncate(&mut self, size: u64) -> Result<bool, FsError>;

    /// `true` when the cursor is at or past the end.
    fn is_eof(&self) -> bool;

    /// Current size in bytes.
    fn size(&self) -> u64;

    /// Push buffered data to the underlying store.
    fn flush(&mut self) -> Result<bool, FsError> {
        Ok(true)
    }

    /// Release the storage before the owning file is destroyed.
    ///
    /// Returning `false` aborts the unlink and keeps the file in the tree.
    fn unlink(&mut self) -> bool {
        true
    }
}

/// Resolve a seek target against the current cursor and size.
pub(crate) fn seek_target(pos: SeekFrom, cursor: u64, size: u64) -> Option<u64> {
    match pos {
        SeekFrom::Start(offset) => Some(offset),
        SeekFrom::Current(delta) => cursor.checked_add_signed(delta),
        SeekFrom::End(delta) => size.checked_add_signed(delta),
    }
}
