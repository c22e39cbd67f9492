//! # Nodes
//!
//! Attributes and behaviour shared by every member of the tree.
//!
//! ## Responsibility
//! - Name, ownership, permission bits, timestamps and inode identity
//! - Kind-specific data through [`NodeKind`]: content for leaves, the child
//!   map for containers, the quota for partitions
//! - Deferred configuration: a node may be built before it knows the
//!   separators, blacklist and umask it has to obey
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use vfs_tree::{Config, FileType, Node};
//!
//! let mut node = Node::directory("docs");
//! node.set_config(Arc::new(Config::default())).unwrap();
//! assert_eq!(node.file_type(), FileType::Directory);
//! assert_eq!(node.permissions().mode(), 0o755);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use indexmap::IndexMap;

use crate::content::{BufferContent, Content};
use crate::quota::QuotaLimit;
use crate::types::unix_seconds;
use crate::{Access, Config, FileType, FsError, NodeId, Parent, Permissions, Stat};

static NEXT_INO: AtomicU64 = AtomicU64::new(1);

/// Kind-specific node data.
#[derive(Debug)]
pub enum NodeKind {
    /// Regular file.
    File(Box<dyn Content>),
    /// Block device.
    Block(Box<dyn Content>),
    /// Directory; children keyed by normalized name, insertion ordered.
    Directory(IndexMap<String, NodeId>),
    /// Partition: a directory that is also a mount root and quota boundary.
    Partition {
        /// Children keyed by normalized name, insertion ordered.
        children: IndexMap<String, NodeId>,
        /// Attached quota, if any.
        quota: Option<Arc<dyn QuotaLimit>>,
    },
}

/// One member of the tree.
#[derive(Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    owner: Option<u32>,
    group: Option<u32>,
    permissions: Option<Permissions>,
    accessed: SystemTime,
    modified: SystemTime,
    changed: SystemTime,
    parent: Option<Parent>,
    ino: u64,
    config: Option<Arc<Config>>,
}

impl Node {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            kind,
            owner: None,
            group: None,
            permissions: None,
            accessed: now,
            modified: now,
            changed: now,
            parent: None,
            ino: NEXT_INO.fetch_add(1, Ordering::Relaxed),
            config: None,
        }
    }

    /// Regular file with the given content.
    pub fn file(name: impl Into<String>, content: impl Content + 'static) -> Self {
        Self::with_kind(name, NodeKind::File(Box::new(content)))
    }

    /// Regular file with an empty in-memory buffer.
    pub fn empty_file(name: impl Into<String>) -> Self {
        Self::file(name, BufferContent::new())
    }

    /// Block device with the given content.
    pub fn block(name: impl Into<String>, content: impl Content + 'static) -> Self {
        Self::with_kind(name, NodeKind::Block(Box::new(content)))
    }

    /// Empty directory.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Directory(IndexMap::new()))
    }

    /// Empty partition without a quota.
    pub fn partition(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            NodeKind::Partition {
                children: IndexMap::new(),
                quota: None,
            },
        )
    }

    /// Explicit permission bits; the umask is not applied to them.
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(Permissions::from_mode(mode));
        self
    }

    /// Explicit owner.
    pub fn with_owner(mut self, user: u32) -> Self {
        self.owner = Some(user);
        self
    }

    /// Explicit group.
    pub fn with_group(mut self, group: u32) -> Self {
        self.group = Some(group);
        self
    }

    /// Node name as given (not case-folded).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of this node.
    pub fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::File(_) => FileType::File,
            NodeKind::Block(_) => FileType::Block,
            NodeKind::Directory(_) => FileType::Directory,
            NodeKind::Partition { .. } => FileType::Partition,
        }
    }

    /// Kind-specific data.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// `true` for directories and partitions.
    pub fn is_container(&self) -> bool {
        self.file_type().is_container()
    }

    /// `true` for partitions.
    pub fn is_partition(&self) -> bool {
        matches!(self.kind, NodeKind::Partition { .. })
    }

    /// Only partitions may carry an empty name (the Unix root).
    pub fn allows_empty_name(&self) -> bool {
        self.is_partition()
    }

    /// Owner user id; falls back to 0 before configuration.
    pub fn owner(&self) -> u32 {
        self.owner.unwrap_or(0)
    }

    /// Owner group id; falls back to 0 before configuration.
    pub fn group(&self) -> u32 {
        self.group.unwrap_or(0)
    }

    /// Permission bits; unmasked type defaults before configuration.
    pub fn permissions(&self) -> Permissions {
        self.permissions
            .unwrap_or_else(|| self.file_type().default_permissions())
    }

    /// Process-unique inode number.
    pub fn ino(&self) -> u64 {
        self.ino
    }

    /// Current parent, if attached.
    pub fn parent(&self) -> Option<Parent> {
        self.parent
    }

    /// Last access time.
    pub fn accessed(&self) -> SystemTime {
        self.accessed
    }

    /// Last modification time.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Last status change time.
    pub fn changed(&self) -> SystemTime {
        self.changed
    }

    /// Content size for leaves, 0 for containers.
    pub fn size(&self) -> u64 {
        self.content().map_or(0, |content| content.size())
    }

    /// Attached configuration.
    ///
    /// # Errors
    ///
    /// - [`FsError::Configuration`] before [`set_config`](Self::set_config)
    pub fn config(&self) -> Result<&Config, FsError> {
        self.config.as_deref().ok_or(FsError::Configuration {
            operation: "config",
        })
    }

    /// Attach a configuration, validate the current name and back-fill
    /// owner, group and permissions that were not set explicitly.
    ///
    /// Default permissions are masked with the configured umask.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if the current name is illegal under
    ///   the new configuration; the node is left unchanged
    pub fn set_config(&mut self, config: Arc<Config>) -> Result<(), FsError> {
        config.check_name(&self.name, self.allows_empty_name())?;
        self.owner.get_or_insert(config.default_user);
        self.group.get_or_insert(config.default_group);
        if self.permissions.is_none() {
            self.permissions = Some(
                self.file_type()
                    .default_permissions()
                    .masked(config.umask),
            );
        }
        self.config = Some(config);
        Ok(())
    }

    /// Validate the current name against the attached configuration.
    ///
    /// # Errors
    ///
    /// - [`FsError::Configuration`] if no configuration is attached
    /// - [`FsError::InvalidArgument`] if the name is illegal
    pub fn check_name(&self) -> Result<(), FsError> {
        let config = self.config.as_deref().ok_or(FsError::Configuration {
            operation: "check_name",
        })?;
        config.check_name(&self.name, self.allows_empty_name())
    }

    /// Rename a detached node.
    ///
    /// Without a configuration the name is stored as-is and validated when
    /// one is attached; with one it is validated immediately. Attached nodes
    /// are renamed through [`FileSystem::set_name`](crate::FileSystem::set_name)
    /// so their parent's key follows.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if a configuration is attached and the
    ///   name is illegal; the old name is kept
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), FsError> {
        let name = name.into();
        if let Some(config) = &self.config {
            config.check_name(&name, self.allows_empty_name())?;
        }
        self.name = name;
        Ok(())
    }

    /// Check `access` for `(user, group)` using the single matching class.
    pub fn allows(&self, access: Access, user: u32, group: u32) -> bool {
        self.permissions()
            .allows(access, self.owner() == user, self.group() == group)
    }

    /// Readable by `(user, group)`.
    pub fn is_readable(&self, user: u32, group: u32) -> bool {
        self.allows(Access::Read, user, group)
    }

    /// Writable by `(user, group)`.
    pub fn is_writable(&self, user: u32, group: u32) -> bool {
        self.allows(Access::Write, user, group)
    }

    /// Executable (or traversable) by `(user, group)`.
    pub fn is_executable(&self, user: u32, group: u32) -> bool {
        self.allows(Access::Execute, user, group)
    }

    /// POSIX-like stat record.
    pub fn stat(&self) -> Stat {
        Stat {
            dev: 0,
            ino: self.ino as i64,
            mode: i64::from(self.file_type().tag() | self.permissions().mode()),
            nlink: 1,
            uid: i64::from(self.owner()),
            gid: i64::from(self.group()),
            rdev: 0,
            size: self.size() as i64,
            atime: unix_seconds(self.accessed),
            mtime: unix_seconds(self.modified),
            ctime: unix_seconds(self.changed),
            blksize: Stat::UNKNOWN,
            blocks: Stat::UNKNOWN,
        }
    }

    /// Content backend of a leaf.
    pub fn content(&self) -> Option<&dyn Content> {
        match &self.kind {
            NodeKind::File(content) | NodeKind::Block(content) => Some(content.as_ref()),
            _ => None,
        }
    }

    /// Child map of a container.
    pub fn children(&self) -> Option<&IndexMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory(children) | NodeKind::Partition { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Quota of a partition.
    pub fn quota(&self) -> Option<&Arc<dyn QuotaLimit>> {
        match &self.kind {
            NodeKind::Partition { quota, .. } => quota.as_ref(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Crate-internal mutation; the arena keeps parent and child links in
    // sync, so these are not public.
    // ------------------------------------------------------------------

    pub(crate) fn content_mut(&mut self) -> Option<&mut (dyn Content + 'static)> {
        match &mut self.kind {
            NodeKind::File(content) | NodeKind::Block(content) => Some(content.as_mut()),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut IndexMap<String, NodeId>> {
        match &mut self.kind {
            NodeKind::Directory(children) | NodeKind::Partition { children, .. } => Some(children),
            _ => None,
        }
    }

    pub(crate) fn quota_slot(&mut self) -> Option<&mut Option<Arc<dyn QuotaLimit>>> {
        match &mut self.kind {
            NodeKind::Partition { quota, .. } => Some(quota),
            _ => None,
        }
    }

    pub(crate) fn set_parent_unchecked(&mut self, parent: Option<Parent>) {
        self.parent = parent;
    }

    pub(crate) fn rename_unchecked(&mut self, name: String) -> String {
        self.changed = SystemTime::now();
        std::mem::replace(&mut self.name, name)
    }

    pub(crate) fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = Some(permissions);
        self.changed = SystemTime::now();
    }

    pub(crate) fn set_owner(&mut self, user: u32) {
        self.owner = Some(user);
        self.changed = SystemTime::now();
    }

    pub(crate) fn set_group(&mut self, group: u32) {
        self.group = Some(group);
        self.changed = SystemTime::now();
    }

    pub(crate) fn touch_accessed(&mut self) {
        self.accessed = SystemTime::now();
    }

    pub(crate) fn touch_modified(&mut self) {
        self.modified = SystemTime::now();
    }

    pub(crate) fn set_times(&mut self, accessed: SystemTime, modified: SystemTime) {
        self.accessed = accessed;
        self.modified = modified;
        self.changed = SystemTime::now();
    }
}
