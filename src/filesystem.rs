//! # FileSystem
//!
//! The context object that owns every node.
//!
//! ## Responsibility
//! - Arena of [`Node`]s addressed by [`NodeId`], with non-owning parent links
//! - Partition registry keyed by normalized mount names
//! - Tree mutations (add/remove/rename/unlink) with cycle and quota checks
//! - Path and URL rendering, sanitization, summaries, metadata updates
//!
//! ## Invariants
//! - A node is listed in at most one container's child map, and that
//!   container is its parent; partitions are additionally registered at the
//!   root, which never gives them up when they are nested elsewhere
//! - No node is its own ancestor
//! - Every failed operation returns before mutating anything
//!
//! ## Usage
//!
//! ```rust
//! use vfs_tree::{Config, FileSystem, Node};
//!
//! let mut fs = FileSystem::new(Config::default()).unwrap();
//! let root = fs.mount("", None).unwrap();
//! let etc = fs.create_dir(root, "etc").unwrap();
//! let hosts = fs.create_file(etc, "hosts", "127.0.0.1 localhost\n").unwrap();
//!
//! assert_eq!(fs.path(hosts).unwrap(), "/etc/hosts");
//! assert_eq!(fs.url(hosts).unwrap(), "vfs:///etc/hosts");
//! assert_eq!(fs.find("/etc/./hosts"), Some(hosts));
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::content::{BufferContent, Content};
use crate::finder::{Finder, PathResolver};
use crate::quota::{QuotaLimit, QuotaManager, UNLIMITED};
use crate::{
    Access, Config, DirEntry, FileType, FsError, Node, NodeId, Parent, Permissions, Stat, Summary, path,
};

/// In-memory filesystem: node arena, partitions and configuration.
#[derive(Debug)]
pub struct FileSystem {
    config: Arc<Config>,
    nodes: Vec<Option<Node>>,
    partitions: IndexMap<String, NodeId>,
}

impl FileSystem {
    /// Create an empty filesystem (no partitions).
    ///
    /// # Errors
    ///
    /// - [`FsError::Configuration`] if `config` fails [`Config::validate`]
    pub fn new(config: Config) -> Result<Self, FsError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            nodes: Vec::new(),
            partitions: IndexMap::new(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The active `(user, group)`: the configured defaults.
    pub fn identity(&self) -> (u32, u32) {
        (self.config.default_user, self.config.default_group)
    }

    /// Canonical form of `raw`; see [`path::sanitize`].
    pub fn sanitize(&self, raw: &str) -> String {
        path::sanitize(&self.config, raw)
    }

    // ========================================================================
    // Arena
    // ========================================================================

    /// Move a node into the arena, attaching this filesystem's configuration.
    ///
    /// The node starts detached; place it with [`add_child`](Self::add_child).
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if its name is illegal under the config
    pub fn insert(&mut self, mut node: Node) -> Result<NodeId, FsError> {
        node.set_config(Arc::clone(&self.config))?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        Ok(id)
    }

    /// Borrow a node.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the id was never issued or was unlinked
    pub fn node(&self, id: NodeId) -> Result<&Node, FsError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| FsError::NotFound {
                path: id.to_string(),
            })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, FsError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| FsError::NotFound {
                path: id.to_string(),
            })
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    fn children_of(&self, id: NodeId) -> Result<&IndexMap<String, NodeId>, FsError> {
        let node = self.node(id)?;
        node.children().ok_or_else(|| FsError::NotADirectory {
            path: node.name().to_string(),
        })
    }

    fn children_of_mut(&mut self, id: NodeId) -> Result<&mut IndexMap<String, NodeId>, FsError> {
        let node = self.node_mut(id)?;
        if !node.is_container() {
            return Err(FsError::NotADirectory {
                path: node.name().to_string(),
            });
        }
        node.children_mut().ok_or_else(|| FsError::structural("container without children"))
    }

    // ========================================================================
    // Partitions
    // ========================================================================

    /// Look up a mounted partition by name, with or without separators
    /// (`"C"`, `"C:"` and `"C:\"` are the same partition).
    pub fn partition(&self, name: &str) -> Option<NodeId> {
        self.partitions
            .get(&self.config.partition_key(name))
            .copied()
    }

    /// Mounted partitions in mount order.
    pub fn partitions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.partitions.values().copied()
    }

    /// Create a partition and mount it at the root.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if the name is illegal
    pub fn mount(&mut self, name: &str, permissions: Option<u32>) -> Result<NodeId, FsError> {
        self.create_partition(Parent::Root, name, permissions)
    }

    /// Create a partition and attach it to the root or nest it in a
    /// container; a nested partition is mounted at the root as well.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if the name is illegal
    /// - any error of [`add_child`](Self::add_child)
    pub fn create_partition(
        &mut self,
        parent: impl Into<Parent>,
        name: &str,
        permissions: Option<u32>,
    ) -> Result<NodeId, FsError> {
        let mut partition = Node::partition(name);
        if let Some(mode) = permissions {
            partition = partition.with_permissions(mode);
        }
        let id = self.insert(partition)?;
        self.attach_new(parent.into(), id)?;
        Ok(id)
    }

    // ========================================================================
    // Tree operations
    // ========================================================================

    /// Place `child` into `parent`.
    ///
    /// The partition enclosing `parent` must have room for the child;
    /// partitions are also registered at the root. A sibling with the same
    /// normalized name is replaced and detached.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if either node does not exist
    /// - [`FsError::Structural`] if `parent` is the root and `child` is not a
    ///   partition
    /// - [`FsError::NotADirectory`] if `parent` is not a container
    /// - [`FsError::Recursion`] if `child` is `parent` or one of its ancestors
    /// - [`FsError::NoDiskSpace`] if the quota has no room for `child`
    pub fn add_child(&mut self, parent: impl Into<Parent>, child: NodeId) -> Result<(), FsError> {
        let parent = parent.into();
        let child_node = self.node(child)?;
        let name = child_node.name().to_string();
        let is_partition = child_node.is_partition();

        match parent {
            Parent::Root => {
                if !is_partition {
                    return Err(FsError::structural(format!(
                        "only partitions can be mounted at the root, not {name:?}"
                    )));
                }
                let key = self.config.partition_key(&name);
                self.reparent(child, Some(Parent::Root))?;
                let previous = self.partitions.insert(key, child);
                if let Some(previous) = previous.filter(|previous| *previous != child) {
                    self.detach_from(previous, Parent::Root);
                }
                debug!(partition = %name, node = %child, "mounted partition");
            }
            Parent::Node(dir) => {
                self.children_of(dir)?;
                self.check_cycle(child, dir)?;
                if let Some(partition) = self.enclosing_partition(dir)
                    && self.quota_manager(partition)?.free_disk_space(Some(child))? == 0
                {
                    let partition = self.path(partition)?;
                    warn!(%partition, child = %name, "no disk space");
                    return Err(FsError::NoDiskSpace { partition, name });
                }

                if is_partition {
                    let key = self.config.partition_key(&name);
                    let previous = self.partitions.insert(key, child);
                    if let Some(previous) = previous.filter(|previous| *previous != child) {
                        self.detach_from(previous, Parent::Root);
                    }
                }
                self.reparent(child, Some(Parent::Node(dir)))?;
                let key = self.config.normalize_name(&name);
                let dir_node = self.node_mut(dir)?;
                dir_node.touch_modified();
                let previous = dir_node
                    .children_mut()
                    .and_then(|children| children.insert(key, child));
                if let Some(previous) = previous.filter(|previous| *previous != child) {
                    self.detach_from(previous, Parent::Node(dir));
                }
                debug!(parent = %dir, child = %name, node = %child, "added child");
            }
        }
        Ok(())
    }

    /// Remove the child called `name` from `parent`, leaving it detached.
    ///
    /// Partitions nested in a directory stay mounted at the root.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `parent` does not exist
    /// - [`FsError::NotADirectory`] if `parent` is not a container
    pub fn remove_child(&mut self, parent: impl Into<Parent>, name: &str) -> Result<bool, FsError> {
        let parent = parent.into();
        let removed = match parent {
            Parent::Root => self
                .partitions
                .shift_remove(&self.config.partition_key(name)),
            Parent::Node(dir) => {
                let key = self.config.normalize_name(name);
                let removed = self.children_of_mut(dir)?.shift_remove(&key);
                if removed.is_some() {
                    self.node_mut(dir)?.touch_modified();
                }
                removed
            }
        };
        let Some(child) = removed else {
            return Ok(false);
        };
        self.detach_from(child, parent);
        debug!(child = %name, node = %child, "removed child");
        Ok(true)
    }

    /// Whether `parent` has a child called `name` (normalized).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] / [`FsError::NotADirectory`] for a bad parent
    pub fn has_child(&self, parent: impl Into<Parent>, name: &str) -> Result<bool, FsError> {
        Ok(match parent.into() {
            Parent::Root => self.partition(name).is_some(),
            Parent::Node(dir) => self
                .children_of(dir)?
                .contains_key(&self.config.normalize_name(name)),
        })
    }

    /// The child called `name`; touches the parent's access time.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if there is no such child
    /// - [`FsError::NotADirectory`] if `parent` is not a container
    pub fn get_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, FsError> {
        let key = self.config.normalize_name(name);
        let child = self.children_of(parent)?.get(&key).copied();
        self.node_mut(parent)?.touch_accessed();
        child.ok_or_else(|| FsError::NotFound {
            path: name.to_string(),
        })
    }

    /// Children of `parent` in insertion order; touches its access time.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] / [`FsError::NotADirectory`] for a bad parent
    pub fn children(&mut self, parent: NodeId) -> Result<Vec<NodeId>, FsError> {
        let children = self.children_of(parent)?.values().copied().collect();
        self.node_mut(parent)?.touch_accessed();
        Ok(children)
    }

    /// Directory listing, with `.` and `..` first when the configuration
    /// includes dot files.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] / [`FsError::NotADirectory`] for a bad parent
    pub fn read_dir(&mut self, dir: NodeId) -> Result<Vec<DirEntry>, FsError> {
        let children = self.children(dir)?;
        let mut entries = Vec::with_capacity(children.len() + 2);
        if self.config.include_dot_files {
            let up = match self.node(dir)?.parent() {
                Some(Parent::Node(parent)) => parent,
                _ => dir,
            };
            for (name, id) in [(".", dir), ("..", up)] {
                entries.push(DirEntry {
                    name: name.to_string(),
                    node: id,
                    file_type: self.node(id)?.file_type(),
                });
            }
        }
        for id in children {
            let node = self.node(id)?;
            entries.push(DirEntry {
                name: node.name().to_string(),
                node: id,
                file_type: node.file_type(),
            });
        }
        Ok(entries)
    }

    /// Move `node` under `new_parent` as `new_name`.
    ///
    /// Runs the same checks as [`add_child`](Self::add_child); on failure the
    /// node is put back exactly where and how it was.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `new_name` is illegal
    /// - any error of [`add_child`](Self::add_child)
    pub fn rename(
        &mut self,
        node: NodeId,
        new_parent: impl Into<Parent>,
        new_name: &str,
    ) -> Result<(), FsError> {
        let new_parent = new_parent.into();
        let current = self.node(node)?;
        self.config
            .check_name(new_name, current.allows_empty_name())?;
        let old_parent = current.parent();
        let old_key = self.config.normalize_name(current.name());
        let mounted = if current.is_partition() {
            self.partitions
                .values()
                .position(|id| *id == node)
                .and_then(|index| self.partitions.shift_remove_index(index).map(|(k, _)| (index, k)))
        } else {
            None
        };

        // detach from the old container, remembering the slot
        let mut old_slot = None;
        if let Some(Parent::Node(dir)) = old_parent {
            let children = self.children_of_mut(dir)?;
            if children.get(&old_key) == Some(&node) {
                old_slot = children.shift_remove_full(&old_key).map(|(index, ..)| index);
            }
            self.node_mut(node)?.set_parent_unchecked(None);
        }
        let old_name = self.node_mut(node)?.rename_unchecked(new_name.to_string());

        if let Err(err) = self.add_child(new_parent, node) {
            let restored = self.node_mut(node)?;
            restored.rename_unchecked(old_name);
            restored.set_parent_unchecked(old_parent);
            if let (Some(Parent::Node(dir)), Some(index)) = (old_parent, old_slot) {
                self.children_of_mut(dir)?.shift_insert(index, old_key, node);
            }
            if let Some((index, key)) = mounted {
                let index = index.min(self.partitions.len());
                self.partitions.shift_insert(index, key, node);
            }
            return Err(err);
        }
        debug!(node = %node, from = %old_name, to = new_name, "renamed");
        Ok(())
    }

    /// Rename a node in place, re-keying it in its container.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if the name is illegal
    pub fn set_name(&mut self, node: NodeId, name: &str) -> Result<(), FsError> {
        let current = self.node(node)?;
        self.config.check_name(name, current.allows_empty_name())?;
        let old_key = self.config.normalize_name(current.name());
        let parent = current.parent();

        if current.is_partition()
            && let Some(index) = self.partitions.values().position(|id| *id == node)
        {
            self.partitions.shift_remove_index(index);
            let key = self.config.partition_key(name);
            let previous = self.partitions.shift_remove(&key);
            let index = index.min(self.partitions.len());
            self.partitions.shift_insert(index, key, node);
            if let Some(previous) = previous {
                self.detach_from(previous, Parent::Root);
            }
        }
        if let Some(Parent::Node(dir)) = parent {
            let new_key = self.config.normalize_name(name);
            let children = self.children_of_mut(dir)?;
            if let Some(mut index) = children.get_index_of(&old_key) {
                let displaced = children
                    .get_full(&new_key)
                    .filter(|(_, _, id)| **id != node)
                    .map(|(at, _, id)| (at, *id));
                children.shift_remove_index(index);
                if let Some((at, _)) = displaced {
                    children.shift_remove(&new_key);
                    if at < index {
                        index -= 1;
                    }
                }
                children.shift_insert(index, new_key, node);
                if let Some((_, previous)) = displaced {
                    self.detach_from(previous, Parent::Node(dir));
                }
            }
        }
        self.node_mut(node)?.rename_unchecked(name.to_string());
        Ok(())
    }

    /// Destroy a regular file or block: release its content, remove it from
    /// its container and free its arena slot.
    ///
    /// Returns `Ok(false)` and changes nothing if the content refuses to be
    /// released.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    /// - [`FsError::NotAFile`] if the node is a container
    pub fn unlink(&mut self, file: NodeId) -> Result<bool, FsError> {
        let node = self.node_mut(file)?;
        let name = node.name().to_string();
        let parent = node.parent();
        let Some(content) = node.content_mut() else {
            return Err(FsError::NotAFile { path: name });
        };
        if !content.unlink() {
            warn!(node = %file, "content refused release");
            return Ok(false);
        }
        if let Some(Parent::Node(dir)) = parent {
            let key = self.config.normalize_name(&name);
            let children = self.children_of_mut(dir)?;
            if children.get(&key) == Some(&file) {
                children.shift_remove(&key);
            }
            self.node_mut(dir)?.touch_modified();
        }
        self.nodes[file.0] = None;
        debug!(node = %file, name = %name, "unlinked");
        Ok(true)
    }

    /// Free a detached node and its subtree, returning how many slots were
    /// released.
    ///
    /// Descendants that are still mounted partitions are detached and kept.
    /// Files whose content refuses release are detached and kept too, as
    /// with [`unlink`](Self::unlink).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    /// - [`FsError::Structural`] if the node is still attached or mounted
    pub fn purge(&mut self, id: NodeId) -> Result<usize, FsError> {
        if self.node(id)?.parent().is_some() || self.partitions.values().any(|p| *p == id) {
            return Err(FsError::structural("cannot purge an attached node"));
        }

        let mut freed = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Ok(node) = self.node_mut(current) else {
                continue;
            };
            if let Some(children) = node.children() {
                let owner = Some(Parent::Node(current));
                let children: Vec<NodeId> = children.values().copied().collect();
                for child in children {
                    let Ok(child_node) = self.node_mut(child) else {
                        continue;
                    };
                    if child_node.parent() != owner {
                        continue;
                    }
                    if self.partitions.values().any(|p| *p == child) {
                        self.detach_from(child, Parent::Node(current));
                        continue;
                    }
                    pending.push(child);
                }
            } else if let Some(content) = node.content_mut()
                && !content.unlink()
            {
                warn!(node = %current, "content refused release");
                node.set_parent_unchecked(None);
                continue;
            }
            self.nodes[current.0] = None;
            freed += 1;
        }
        debug!(node = %id, freed, "purged");
        Ok(freed)
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    /// Create a directory under `parent`.
    ///
    /// # Errors
    ///
    /// - any error of [`insert`](Self::insert) or [`add_child`](Self::add_child)
    pub fn create_dir(&mut self, parent: NodeId, name: &str) -> Result<NodeId, FsError> {
        let id = self.insert(Node::directory(name))?;
        self.attach_new(Parent::Node(parent), id)?;
        Ok(id)
    }

    /// Create a buffer-backed file under `parent`.
    ///
    /// # Errors
    ///
    /// - any error of [`insert`](Self::insert) or [`add_child`](Self::add_child)
    pub fn create_file(
        &mut self,
        parent: NodeId,
        name: &str,
        data: impl AsRef<[u8]>,
    ) -> Result<NodeId, FsError> {
        self.create_node(
            parent,
            Node::file(name, BufferContent::with_data(data.as_ref())),
        )
    }

    /// Insert `node` and place it under `parent`; the arena slot is released
    /// again if placement fails.
    ///
    /// # Errors
    ///
    /// - any error of [`insert`](Self::insert) or [`add_child`](Self::add_child)
    pub fn create_node(&mut self, parent: NodeId, node: Node) -> Result<NodeId, FsError> {
        let id = self.insert(node)?;
        self.attach_new(Parent::Node(parent), id)?;
        Ok(id)
    }

    /// Create a file with custom content under `parent`.
    ///
    /// # Errors
    ///
    /// - any error of [`create_node`](Self::create_node)
    pub fn create_file_with(
        &mut self,
        parent: NodeId,
        name: &str,
        content: impl Content + 'static,
    ) -> Result<NodeId, FsError> {
        self.create_node(parent, Node::file(name, content))
    }

    fn attach_new(&mut self, parent: Parent, id: NodeId) -> Result<(), FsError> {
        if let Err(err) = self.add_child(parent, id) {
            self.nodes[id.0] = None;
            return Err(err);
        }
        Ok(())
    }

    // ========================================================================
    // Paths
    // ========================================================================

    /// Rendered path of a node.
    ///
    /// Partitions render as mount roots (`C:\`, `/`); other nodes append
    /// their name to the parent path; detached nodes are just their name.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node or an ancestor does not exist
    pub fn path(&self, id: NodeId) -> Result<String, FsError> {
        let node = self.node(id)?;
        if node.is_partition() {
            return Ok(path::mount_root(&self.config, node.name()));
        }
        match node.parent() {
            Some(Parent::Node(parent)) => {
                Ok(path::join(&self.config, &self.path(parent)?, node.name()))
            }
            _ => Ok(node.name().to_string()),
        }
    }

    /// `vfs://` URL of a node.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node or an ancestor does not exist
    pub fn url(&self, id: NodeId) -> Result<String, FsError> {
        Ok(format!("{}{}", path::SCHEME, self.path(id)?))
    }

    /// Resolve a path with the default [`Finder`].
    pub fn find(&self, path: &str) -> Option<NodeId> {
        Finder.resolve(self, path)
    }

    /// Nearest partition at or above `id`.
    pub fn enclosing_partition(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.node(current).ok()?;
            if node.is_partition() {
                return Some(current);
            }
            match node.parent() {
                Some(Parent::Node(parent)) => current = parent,
                _ => return None,
            }
        }
    }

    // ========================================================================
    // Summaries and quotas
    // ========================================================================

    /// Size and file count below a container, optionally counting only
    /// nodes owned by `user` and/or `group`.
    ///
    /// Directories count as one file of size 0 and are descended; nested
    /// partitions are skipped entirely.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] / [`FsError::NotADirectory`] for a bad node
    pub fn summary(
        &self,
        dir: NodeId,
        user: Option<u32>,
        group: Option<u32>,
    ) -> Result<Summary, FsError> {
        let mut summary = Summary::default();
        for &child in self.children_of(dir)?.values() {
            let node = self.node(child)?;
            if node.is_partition() {
                continue;
            }
            if node.file_type() == FileType::Directory {
                summary += self.summary(child, user, group)?;
            }
            let owned = user.is_none_or(|user| node.owner() == user)
                && group.is_none_or(|group| node.group() == group);
            if owned {
                summary.size += node.size();
                summary.file_count += 1;
            }
        }
        Ok(summary)
    }

    /// Quota arithmetic for one partition.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    /// - [`FsError::InvalidArgument`] if it is not a partition
    pub fn quota_manager(&self, partition: NodeId) -> Result<QuotaManager<'_>, FsError> {
        if !self.node(partition)?.is_partition() {
            return Err(FsError::invalid(format!("{partition} is not a partition")));
        }
        Ok(QuotaManager::new(self, partition))
    }

    /// Bytes available to grow `id`, from its enclosing partition's quota.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn free_disk_space(&self, id: NodeId) -> Result<i64, FsError> {
        self.node(id)?;
        match self.enclosing_partition(id) {
            Some(partition) => self.quota_manager(partition)?.free_disk_space(None),
            None => Ok(UNLIMITED),
        }
    }

    /// Attach a quota (or collection) to a partition, replacing any other.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    /// - [`FsError::InvalidArgument`] if it is not a partition
    pub fn set_quota(
        &mut self,
        partition: NodeId,
        quota: Arc<dyn QuotaLimit>,
    ) -> Result<(), FsError> {
        let slot = self
            .node_mut(partition)?
            .quota_slot()
            .ok_or_else(|| FsError::invalid(format!("{partition} is not a partition")))?;
        debug!(node = %partition, ?quota, "quota attached");
        *slot = Some(quota);
        Ok(())
    }

    /// Detach and return a partition's quota.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    /// - [`FsError::InvalidArgument`] if it is not a partition
    pub fn clear_quota(&mut self, partition: NodeId) -> Result<Option<Arc<dyn QuotaLimit>>, FsError> {
        let slot = self
            .node_mut(partition)?
            .quota_slot()
            .ok_or_else(|| FsError::invalid(format!("{partition} is not a partition")))?;
        debug!(node = %partition, "quota detached");
        Ok(slot.take())
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Stat record of a node.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn stat(&self, id: NodeId) -> Result<Stat, FsError> {
        Ok(self.node(id)?.stat())
    }

    /// Replace the permission bits.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn set_permissions(&mut self, id: NodeId, mode: u32) -> Result<(), FsError> {
        self.node_mut(id)?
            .set_permissions(Permissions::from_mode(mode));
        Ok(())
    }

    /// Change the owner.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn set_owner(&mut self, id: NodeId, user: u32) -> Result<(), FsError> {
        self.node_mut(id)?.set_owner(user);
        Ok(())
    }

    /// Change the group.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn set_group(&mut self, id: NodeId, group: u32) -> Result<(), FsError> {
        self.node_mut(id)?.set_group(group);
        Ok(())
    }

    /// Set access and modification times; `None` means now. An explicit
    /// modification time without an access time sets both to it.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn touch(
        &mut self,
        id: NodeId,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<(), FsError> {
        let modified = modified.unwrap_or_else(SystemTime::now);
        let accessed = accessed.unwrap_or(modified);
        self.node_mut(id)?.set_times(accessed, modified);
        Ok(())
    }

    /// Whether the active user may read `id`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn is_readable(&self, id: NodeId) -> Result<bool, FsError> {
        self.allows(id, Access::Read)
    }

    /// Whether the active user may write `id`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn is_writable(&self, id: NodeId) -> Result<bool, FsError> {
        self.allows(id, Access::Write)
    }

    /// Whether the active user may execute (or traverse) `id`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the node does not exist
    pub fn is_executable(&self, id: NodeId) -> Result<bool, FsError> {
        self.allows(id, Access::Execute)
    }

    fn allows(&self, id: NodeId, access: Access) -> Result<bool, FsError> {
        let (user, group) = self.identity();
        Ok(self.node(id)?.allows(access, user, group))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check_cycle(&self, child: NodeId, parent: NodeId) -> Result<(), FsError> {
        let mut current = Some(parent);
        while let Some(id) = current {
            let node = self.node(id)?;
            if id == child {
                return Err(FsError::Recursion {
                    name: self.node(child)?.name().to_string(),
                });
            }
            current = match node.parent() {
                Some(Parent::Node(up)) => Some(up),
                _ => None,
            };
        }
        Ok(())
    }

    /// Point `child` at `parent`, detaching it from its previous container
    /// unless that was the root.
    fn reparent(&mut self, child: NodeId, parent: Option<Parent>) -> Result<(), FsError> {
        if let Some(Parent::Node(dir)) = parent {
            self.check_cycle(child, dir)?;
        }
        let node = self.node(child)?;
        if let Some(Parent::Node(old)) = node.parent() {
            let key = self.config.normalize_name(node.name());
            if let Ok(children) = self.children_of_mut(old)
                && children.get(&key) == Some(&child)
            {
                children.shift_remove(&key);
            }
        }
        self.node_mut(child)?.set_parent_unchecked(parent);
        Ok(())
    }

    /// Clear the parent of `id` if it still points at `container`.
    fn detach_from(&mut self, id: NodeId, container: Parent) {
        if let Ok(node) = self.node_mut(id)
            && node.parent() == Some(container)
        {
            node.set_parent_unchecked(None);
        }
    }
}
