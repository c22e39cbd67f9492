//! Error types for the virtual filesystem tree.

use std::fmt;

/// Coarse classification of an [`FsError`].
///
/// Adapters that translate engine failures into host conventions (a success
/// flag plus a message) match on the kind instead of on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Illegal name, malformed input or unsupported argument.
    InvalidArgument,
    /// A node, partition or child does not exist.
    NotFound,
    /// A parent assignment would create a cycle.
    Recursion,
    /// A quota limit was reached.
    NoDiskSpace,
    /// An operation needs a configuration that has not been attached.
    Configuration,
    /// A structurally invalid tree operation.
    Structural,
    /// The active identity lacks the required permission bits.
    PermissionDenied,
    /// Content backend I/O failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::Recursion => "recursion",
            ErrorKind::NoDiskSpace => "no disk space",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Structural => "structural",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// Filesystem error type with contextual variants.
///
/// Every variant is raised before the offending operation mutates the tree,
/// so a returned error never leaves a half-applied change behind.
///
/// # Examples
///
/// ```rust
/// use vfs_tree::{ErrorKind, FsError};
///
/// let err = FsError::NotFound { path: "/missing".into() };
/// assert_eq!(err.to_string(), "not found: /missing");
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// A name or argument was rejected.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// Path, node or child does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path (or name) that was not found.
        path: String,
    },

    /// Reparenting would make a node its own ancestor.
    #[error("recursion detected: {name} cannot be placed below itself")]
    Recursion {
        /// Name of the node being reparented.
        name: String,
    },

    /// Insert refused because the partition has no room left.
    #[error("no disk space left on {partition} for {name}")]
    NoDiskSpace {
        /// Path of the partition that enforces the quota.
        partition: String,
        /// Name of the rejected child.
        name: String,
    },

    /// Operation attempted before a configuration was attached.
    #[error("{operation}: no configuration attached")]
    Configuration {
        /// The operation that needed configuration.
        operation: &'static str,
    },

    /// Structurally invalid tree operation.
    #[error("structural error: {reason}")]
    Structural {
        /// Description of the violated structure rule.
        reason: String,
    },

    /// Permission bits deny the operation for the active identity.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The node path.
        path: String,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Expected a regular file but found a container.
    #[error("not a file: {path}")]
    NotAFile {
        /// The offending path.
        path: String,
    },

    /// Expected a container but found a leaf.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: String,
    },

    /// The handle refers to a file that no longer exists.
    #[error("invalid handle for inode {ino}")]
    InvalidHandle {
        /// Inode number the handle was opened on.
        ino: u64,
    },

    /// I/O error raised by a stream-backed content.
    #[error("{operation} failed: {source}")]
    Io {
        /// The content operation that failed.
        operation: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            FsError::NotFound { .. } | FsError::InvalidHandle { .. } => ErrorKind::NotFound,
            FsError::Recursion { .. } => ErrorKind::Recursion,
            FsError::NoDiskSpace { .. } => ErrorKind::NoDiskSpace,
            FsError::Configuration { .. } => ErrorKind::Configuration,
            FsError::Structural { .. }
            | FsError::NotAFile { .. }
            | FsError::NotADirectory { .. } => ErrorKind::Structural,
            FsError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FsError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        FsError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn structural(reason: impl Into<String>) -> Self {
        FsError::Structural {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: String::new(),
            },
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied {
                path: String::new(),
                operation: "io",
            },
            std::io::ErrorKind::InvalidInput => FsError::InvalidArgument {
                reason: error.to_string(),
            },
            _ => FsError::Io {
                operation: "io",
                source: error,
            },
        }
    }
}
