//! # vfs-tree
//!
//! An **in-memory hierarchical filesystem engine**: partitions, directories
//! and files held in a single arena, with POSIX-style permissions, simulated
//! disk quotas and per-handle cursors.
//!
//! Nothing here touches the host filesystem unless a file is explicitly
//! backed by a [`StreamContent`](content::StreamContent).
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use vfs_tree::{Config, FileHandle, FileSystem, OpenFlags, Quota, UNLIMITED};
//!
//! let mut fs = FileSystem::new(Config::default())?;
//! let root = fs.mount("", None)?;
//! fs.set_quota(root, Arc::new(Quota::new(4, UNLIMITED)))?;
//!
//! let mut handle = FileHandle::open(&mut fs, "/hello.txt", OpenFlags::WRITE)?;
//! assert_eq!(handle.write(&mut fs, b"Hello, world!")?, 4);
//! assert_eq!(fs.stat(handle.node())?.size, 4);
//! # Ok::<(), vfs_tree::FsError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FileSystem`] | Owns the node arena, partitions and configuration |
//! | [`Node`] | Name, ownership, permissions, timestamps and kind-specific data |
//! | [`NodeId`] | Stable arena index of a node |
//! | [`Config`] | Separators, case folding, blacklist, umask, default identity |
//! | [`Finder`] | Default [`PathResolver`]: path string to node |
//! | [`Quota`] / [`Collection`] | Partition limits, attached as [`QuotaLimit`] |
//! | [`QuotaManager`] | Free-space arithmetic for one partition |
//! | [`FileHandle`] | Open file with its own cursor |
//! | [`FsError`] | Error type with context, classified by [`ErrorKind`] |
//!
//! ---
//!
//! ## Paths
//!
//! Paths are strings in the configured convention. The default is Unix-like
//! (`/` separator, one unnamed root partition rendered as `/`);
//! [`Config::windows`] uses `\`, a `:` partition separator, case folding and
//! slash normalization, so `C:/Users/../Temp` and `c:\temp` name the same
//! directory. Every node also has a `vfs://` URL.
//!
//! ---
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, FsError>` and fail before
//! mutating anything:
//!
//! ```rust
//! use vfs_tree::{Config, ErrorKind, FileSystem};
//!
//! let mut fs = FileSystem::new(Config::default()).unwrap();
//! let root = fs.mount("", None).unwrap();
//! let dir = fs.create_dir(root, "a").unwrap();
//!
//! let err = fs.add_child(dir, root).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Recursion);
//! ```
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Config`], [`Stat`], [`Summary`], [`Permissions`], [`Structure`], plus JSON loading |

// Private modules
mod config;
mod error;
mod filesystem;
mod finder;
mod handle;
mod node;
mod quota;
mod structure;
mod types;

// Public modules
pub mod content;
pub mod path;

// Public re-exports - errors
pub use error::{ErrorKind, FsError};

// Public re-exports - core types
pub use types::{
    Access, DirEntry, FileType, NodeId, OpenFlags, Parent, Permissions, Stat, Summary,
};

// Public re-exports - tree
pub use config::{Blacklist, Config};
pub use filesystem::FileSystem;
pub use finder::{Finder, PathResolver};
pub use node::{Node, NodeKind};
pub use structure::Structure;

// Public re-exports - quotas and handles
pub use handle::FileHandle;
pub use quota::{Collection, Quota, QuotaLimit, QuotaManager, UNLIMITED};
