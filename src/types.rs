//! Core value types shared by the tree, the quota subsystem and handles.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identity of a node inside a [`FileSystem`](crate::FileSystem) arena.
///
/// Ids are never reused, so a stale id can only ever resolve to "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node hangs in the tree.
///
/// The filesystem root is not itself a node, so partitions mounted at the
/// top level point at [`Parent::Root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    /// The top-level filesystem.
    Root,
    /// A container node.
    Node(NodeId),
}

impl From<NodeId> for Parent {
    fn from(id: NodeId) -> Self {
        Parent::Node(id)
    }
}

/// Type of a filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Block device; behaves as a regular file with its own type tag.
    Block,
    /// Directory.
    Directory,
    /// Mount root and quota boundary.
    Partition,
}

impl FileType {
    /// Directory type tag (`S_IFDIR`).
    pub const TAG_DIRECTORY: u32 = 0o040000;
    /// Regular file type tag (`S_IFREG`).
    pub const TAG_FILE: u32 = 0o100000;
    /// Block device type tag (`S_IFBLK`).
    pub const TAG_BLOCK: u32 = 0o060000;

    /// The `st_mode` type bits for this node type.
    pub const fn tag(self) -> u32 {
        match self {
            FileType::File => Self::TAG_FILE,
            FileType::Block => Self::TAG_BLOCK,
            FileType::Directory | FileType::Partition => Self::TAG_DIRECTORY,
        }
    }

    /// Returns `true` for directories and partitions.
    #[inline]
    pub const fn is_container(self) -> bool {
        matches!(self, FileType::Directory | FileType::Partition)
    }

    /// Default permissions before the umask is applied.
    pub const fn default_permissions(self) -> Permissions {
        match self {
            FileType::File | FileType::Block => Permissions::from_mode(0o666),
            FileType::Directory | FileType::Partition => Permissions::from_mode(0o777),
        }
    }
}

/// Kind of access requested in a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `r` bit.
    Read,
    /// `w` bit.
    Write,
    /// `x` bit.
    Execute,
}

impl Access {
    const fn bit(self) -> u32 {
        match self {
            Access::Read => 0o4,
            Access::Write => 0o2,
            Access::Execute => 0o1,
        }
    }
}

/// Unix-style permissions stored as a 9-bit mode (rwxrwxrwx).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755). Type bits are dropped.
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Remove the bits set in `umask`.
    #[inline]
    pub const fn masked(self, umask: u32) -> Self {
        Self(self.0 & !umask & 0o777)
    }

    /// Check `access` for a requester, using exactly one permission class.
    ///
    /// The owner class is used when `is_owner`, otherwise the group class when
    /// `in_group`, otherwise the "other" class. Classes are never combined.
    pub const fn allows(&self, access: Access, is_owner: bool, in_group: bool) -> bool {
        let shift = if is_owner {
            6
        } else if in_group {
            3
        } else {
            0
        };
        let mask = access.bit() << shift;
        (self.0 & mask) == mask
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03o}", self.0)
    }
}

/// Aggregate size and file count of a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    /// Total bytes held by regular files.
    pub size: u64,
    /// Number of nodes (files and directories).
    pub file_count: u64,
}

impl std::ops::AddAssign for Summary {
    fn add_assign(&mut self, other: Self) {
        self.size += other.size;
        self.file_count += other.file_count;
    }
}

/// POSIX-like `stat` record.
///
/// Fields can be read directly, by position (the classic 0..13 layout) via
/// [`Stat::get`], or by name via [`Stat::get_named`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    /// Device number (always 0).
    pub dev: i64,
    /// Process-unique node identity.
    pub ino: i64,
    /// Type tag plus permission bits.
    pub mode: i64,
    /// Link count (always 1).
    pub nlink: i64,
    /// Owner user id.
    pub uid: i64,
    /// Owner group id.
    pub gid: i64,
    /// Device type (always 0).
    pub rdev: i64,
    /// Size in bytes (0 for containers).
    pub size: i64,
    /// Last access, seconds since the Unix epoch.
    pub atime: i64,
    /// Last modification, seconds since the Unix epoch.
    pub mtime: i64,
    /// Last status change, seconds since the Unix epoch.
    pub ctime: i64,
    /// Block size; always [`Stat::UNKNOWN`].
    pub blksize: i64,
    /// Allocated blocks; always [`Stat::UNKNOWN`].
    pub blocks: i64,
}

impl Stat {
    /// Sentinel for values the simulation does not track.
    pub const UNKNOWN: i64 = -1;

    /// Field names in positional order.
    pub const FIELDS: [&'static str; 13] = [
        "dev", "ino", "mode", "nlink", "uid", "gid", "rdev", "size", "atime", "mtime", "ctime",
        "blksize", "blocks",
    ];

    /// All fields in positional order.
    pub fn to_array(&self) -> [i64; 13] {
        [
            self.dev,
            self.ino,
            self.mode,
            self.nlink,
            self.uid,
            self.gid,
            self.rdev,
            self.size,
            self.atime,
            self.mtime,
            self.ctime,
            self.blksize,
            self.blocks,
        ]
    }

    /// Field by position.
    pub fn get(&self, index: usize) -> Option<i64> {
        self.to_array().get(index).copied()
    }

    /// Field by name.
    pub fn get_named(&self, name: &str) -> Option<i64> {
        Self::FIELDS
            .iter()
            .position(|field| *field == name)
            .and_then(|index| self.get(index))
    }

    /// `(name, value)` pairs in positional order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, i64)> {
        Self::FIELDS.into_iter().zip(self.to_array())
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name; `.` and `..` for the synthetic entries.
    pub name: String,
    /// The node the entry refers to.
    pub node: NodeId,
    /// Type of the referenced node.
    pub file_type: FileType,
}

/// Flags for opening a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create file if it doesn't exist.
    pub create: bool,
    /// Truncate file to zero length.
    pub truncate: bool,
    /// Start the cursor at the end of the file.
    pub append: bool,
}

impl OpenFlags {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        truncate: false,
        append: false,
    };

    /// Write access with create and truncate.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: true,
        append: false,
    };

    /// Read and write access.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        create: false,
        truncate: false,
        append: false,
    };

    /// Append mode - writes go to end of file.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: false,
        append: true,
    };
}

/// Seconds since the Unix epoch, negative for times before it.
pub(crate) fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
