//! # File Handles
//!
//! Per-open cursors over shared file content.
//!
//! ## Responsibility
//! - Open files by path, honouring create/truncate/append and permissions
//! - Keep an independent cursor per handle over the single content backend
//!   of a file (save, seek, operate, recapture)
//! - Clamp writes and refuse truncates that would exceed the partition quota
//!
//! ## Usage
//!
//! ```rust
//! use vfs_tree::{Config, FileHandle, FileSystem, OpenFlags};
//!
//! let mut fs = FileSystem::new(Config::default()).unwrap();
//! fs.mount("", None).unwrap();
//!
//! let mut out = FileHandle::open(&mut fs, "/notes.txt", OpenFlags::WRITE).unwrap();
//! out.write(&mut fs, b"hello").unwrap();
//! out.close(&mut fs).unwrap();
//!
//! let mut input = FileHandle::open(&mut fs, "/notes.txt", OpenFlags::READ).unwrap();
//! assert_eq!(input.read(&mut fs, 64).unwrap(), b"hello");
//! ```

use std::io::SeekFrom;

use tracing::{trace, warn};

use crate::content::{BufferContent, Content};
use crate::quota::UNLIMITED;
use crate::{FileSystem, FsError, Node, NodeId, OpenFlags, path};

/// An open file: the node it refers to, its own cursor and its open mode.
///
/// Handles borrow nothing; every operation takes the owning [`FileSystem`].
/// Several handles on one file see the same bytes but never each other's
/// cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    node: NodeId,
    ino: u64,
    position: u64,
    flags: OpenFlags,
    open: bool,
}

impl FileHandle {
    /// Open the file at `path`.
    ///
    /// With `flags.create` a missing file is created as an empty buffer in
    /// its (existing) parent directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file (or, when creating, its parent)
    ///   does not exist
    /// - [`FsError::NotAFile`] if the path names a container
    /// - [`FsError::PermissionDenied`] if the active user lacks the read or
    ///   write bit the flags ask for
    /// - [`FsError::NoDiskSpace`] if creating the file exceeds the quota
    pub fn open(fs: &mut FileSystem, path: &str, flags: OpenFlags) -> Result<Self, FsError> {
        let node = match fs.find(path) {
            Some(node) => node,
            None if flags.create => create(fs, path)?,
            None => {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                });
            }
        };
        Self::open_node(fs, node, flags)
    }

    /// Open an already resolved node.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    /// - [`FsError::NotAFile`] if it is a container
    /// - [`FsError::PermissionDenied`] if the active user lacks the read or
    ///   write bit the flags ask for
    pub fn open_node(fs: &mut FileSystem, node: NodeId, flags: OpenFlags) -> Result<Self, FsError> {
        let (user, group) = fs.identity();
        let entry = fs.node(node)?;
        if entry.content().is_none() {
            return Err(FsError::NotAFile {
                path: fs.path(node)?,
            });
        }
        let denied = |operation: &'static str| -> Result<(), FsError> {
            Err(FsError::PermissionDenied {
                path: fs.path(node)?,
                operation,
            })
        };
        if flags.read && !entry.is_readable(user, group) {
            denied("open for reading")?;
        }
        if flags.write && !entry.is_writable(user, group) {
            denied("open for writing")?;
        }
        let ino = entry.ino();

        let file = fs.node_mut(node)?;
        let position = match file.content_mut() {
            Some(content) => {
                if flags.write && flags.truncate {
                    content.truncate(0)?;
                }
                if flags.append { content.size() } else { 0 }
            }
            None => 0,
        };
        if flags.write && flags.truncate {
            file.touch_modified();
        }
        file.touch_accessed();
        trace!(%node, ?flags, position, "opened");
        Ok(Self {
            node,
            ino,
            position,
            flags,
            open: true,
        })
    }

    /// The file this handle refers to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Flags the handle was opened with.
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// `false` once [`close`](Self::close) has been called.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Flush and invalidate the handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if already closed or the file is gone
    pub fn close(&mut self, fs: &mut FileSystem) -> Result<bool, FsError> {
        let flushed = self.flush(fs)?;
        self.open = false;
        trace!(node = %self.node, "closed");
        Ok(flushed)
    }

    /// Read up to `count` bytes from this handle's cursor.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    /// - [`FsError::PermissionDenied`] if not opened for reading
    pub fn read(&mut self, fs: &mut FileSystem, count: usize) -> Result<Vec<u8>, FsError> {
        self.require(self.flags.read, fs, "read")?;
        let data = self.with_content(fs, |content| content.read(count))?;
        fs.node_mut(self.node)?.touch_accessed();
        Ok(data)
    }

    /// Write at this handle's cursor, clamped to the space the partition
    /// quota leaves. Returns the bytes written.
    ///
    /// The free space is adjusted by the cursor's offset from the end of the
    /// file: `free + position - size`, never below zero.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    /// - [`FsError::PermissionDenied`] if not opened for writing
    pub fn write(&mut self, fs: &mut FileSystem, data: &[u8]) -> Result<usize, FsError> {
        self.require(self.flags.write, fs, "write")?;
        let free = fs.free_disk_space(self.node)?;
        let data = if free == UNLIMITED {
            data
        } else {
            let size = i128::from(fs.node(self.node)?.size());
            let allowed = (i128::from(free) + i128::from(self.position) - size).max(0);
            let allowed = usize::try_from(allowed).unwrap_or(usize::MAX);
            if allowed < data.len() {
                warn!(node = %self.node, requested = data.len(), allowed, "write clamped by quota");
                &data[..allowed]
            } else {
                data
            }
        };
        let written = self.with_content(fs, |content| content.write(data))?;
        fs.node_mut(self.node)?.touch_modified();
        trace!(node = %self.node, written, position = self.position, "write");
        Ok(written)
    }

    /// Resize the file. Returns `false` without changing anything when
    /// growing would exceed the quota. The cursor is not moved.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    /// - [`FsError::PermissionDenied`] if not opened for writing
    pub fn truncate(&mut self, fs: &mut FileSystem, size: u64) -> Result<bool, FsError> {
        self.require(self.flags.write, fs, "truncate")?;
        let free = fs.free_disk_space(self.node)?;
        let current = fs.node(self.node)?.size();
        if free != UNLIMITED && i128::from(size) - i128::from(current) > i128::from(free) {
            warn!(node = %self.node, size, current, free, "truncate refused by quota");
            return Ok(false);
        }
        let done = self.with_content(fs, |content| content.truncate(size))?;
        if done {
            fs.node_mut(self.node)?.touch_modified();
        }
        Ok(done)
    }

    /// Move this handle's cursor. Returns `false` (cursor unchanged) for a
    /// negative target.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    pub fn seek(&mut self, fs: &mut FileSystem, pos: SeekFrom) -> Result<bool, FsError> {
        self.with_content(fs, |content| content.seek(pos))
    }

    /// This handle's cursor.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    pub fn tell(&self, fs: &mut FileSystem) -> Result<u64, FsError> {
        let content = self.content(fs)?;
        content.seek(SeekFrom::Start(self.position))?;
        Ok(content.tell())
    }

    /// Whether this handle's cursor is at or past the end.
    ///
    /// A handle open for both reading and writing never reports end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    pub fn is_eof(&self, fs: &mut FileSystem) -> Result<bool, FsError> {
        let content = self.content(fs)?;
        if self.flags.read && self.flags.write {
            return Ok(false);
        }
        content.seek(SeekFrom::Start(self.position))?;
        Ok(content.is_eof())
    }

    /// Push buffered content to its store.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if closed or the file is gone
    /// - [`FsError::Io`] if a stream-backed content fails to flush
    pub fn flush(&mut self, fs: &mut FileSystem) -> Result<bool, FsError> {
        self.content(fs)?.flush()
    }

    fn content<'a>(&self, fs: &'a mut FileSystem) -> Result<&'a mut (dyn Content + 'static), FsError> {
        let invalid = FsError::InvalidHandle { ino: self.ino };
        if !self.open {
            return Err(invalid);
        }
        match fs.node_mut(self.node) {
            Ok(node) if node.ino() == self.ino => node.content_mut().ok_or(invalid),
            _ => Err(invalid),
        }
    }

    /// Seek the shared content to this handle's cursor, run `op`, then take
    /// the resulting cursor as this handle's own.
    fn with_content<T>(
        &mut self,
        fs: &mut FileSystem,
        op: impl FnOnce(&mut dyn Content) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let content = self.content(fs)?;
        content.seek(SeekFrom::Start(self.position))?;
        let result = op(&mut *content)?;
        self.position = content.tell();
        Ok(result)
    }

    fn require(&self, allowed: bool, fs: &FileSystem, operation: &'static str) -> Result<(), FsError> {
        if !self.open {
            return Err(FsError::InvalidHandle { ino: self.ino });
        }
        if allowed {
            return Ok(());
        }
        Err(FsError::PermissionDenied {
            path: fs.path(self.node).unwrap_or_else(|_| self.node.to_string()),
            operation,
        })
    }
}

fn create(fs: &mut FileSystem, raw: &str) -> Result<NodeId, FsError> {
    let sanitized = fs.sanitize(raw);
    let not_found = || FsError::NotFound {
        path: raw.to_string(),
    };
    let (parent_path, name) = path::split_last(fs.config(), &sanitized).ok_or_else(not_found)?;
    let parent = fs.find(&parent_path).ok_or_else(not_found)?;
    let name = name.to_string();
    fs.create_node(parent, Node::file(name, BufferContent::new()))
}
