//! # Path Resolution
//!
//! Strategy trait for turning a textual path into a node, and the default
//! segment-walking [`Finder`].
//!
//! ## Responsibility
//! - Define the contract for path resolution
//! - Walk partition → directory → ... one segment at a time
//!
//! ## Dependencies
//! - [`FileSystem`] for sanitization, partition lookup and child lookup
//!
//! ## Usage
//!
//! ```rust
//! use vfs_tree::{Config, FileSystem, Finder, Node, PathResolver};
//!
//! let mut fs = FileSystem::new(Config::default()).unwrap();
//! let root = fs.mount("", None).unwrap();
//! let docs = fs.insert(Node::directory("docs")).unwrap();
//! fs.add_child(root, docs).unwrap();
//!
//! assert_eq!(Finder.resolve(&fs, "/docs/../docs/."), Some(docs));
//! assert_eq!(Finder.resolve(&fs, "/missing"), None);
//! ```

use tracing::trace;

use crate::{FileSystem, NodeId, path};

/// Strategy trait for path resolution.
///
/// # Object Safety
///
/// This trait is object-safe, enabling runtime resolver selection.
pub trait PathResolver: Send + Sync {
    /// Resolve `path` to a node, or `None` if any segment is missing or a
    /// leaf appears mid-path.
    fn resolve(&self, fs: &FileSystem, path: &str) -> Option<NodeId>;
}

/// Default resolver: sanitize, pick the partition from the first segment,
/// then descend one child per segment.
///
/// Lookups here never touch access times.
#[derive(Debug, Clone, Copy, Default)]
pub struct Finder;

impl PathResolver for Finder {
    fn resolve(&self, fs: &FileSystem, raw: &str) -> Option<NodeId> {
        let sanitized = fs.sanitize(raw);
        let mut parts = path::segments(fs.config(), &sanitized).into_iter();

        let mut current = fs.partition(parts.next()?)?;
        for segment in parts {
            let node = fs.node(current).ok()?;
            let children = node.children()?;
            current = *children.get(&fs.config().normalize_name(segment))?;
        }
        trace!(path = raw, node = %current, "resolved");
        Some(current)
    }
}
