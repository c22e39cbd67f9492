//! # Quotas
//!
//! Simulated disk limits, scoped to partitions.
//!
//! ## Responsibility
//! - [`Quota`]: a size and file-count ceiling, optionally limited to one
//!   owner and/or group
//! - [`Collection`]: several quotas stacked, first limited answer wins
//! - [`QuotaManager`]: free-space arithmetic for one partition, consulted
//!   before inserts, writes and truncates
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use vfs_tree::{Config, FileSystem, Quota, UNLIMITED};
//!
//! let mut fs = FileSystem::new(Config::default()).unwrap();
//! let root = fs.mount("", None).unwrap();
//! fs.set_quota(root, Arc::new(Quota::new(1024, UNLIMITED))).unwrap();
//! assert_eq!(fs.quota_manager(root).unwrap().free_disk_space(None).unwrap(), 1024);
//! ```

use std::fmt;

use tracing::trace;

use crate::{FileSystem, FsError, NodeId, Summary};

/// Sentinel for "no limit" in every quota computation.
pub const UNLIMITED: i64 = -1;

/// A limit that can be attached to a partition.
///
/// Values returned are either [`UNLIMITED`] or a non-negative remainder.
///
/// # Object Safety
///
/// This trait is object-safe; partitions store `Arc<dyn QuotaLimit>`.
pub trait QuotaLimit: Send + Sync + fmt::Debug {
    /// Whether the limit governs requests made by `(user, group)`.
    fn applies_to(&self, user: u32, group: u32) -> bool;

    /// Bytes still available given `usage`.
    fn remaining_size(&self, usage: &Summary, user: u32, group: u32) -> i64;

    /// Files still available given `usage`.
    fn remaining_file_count(&self, usage: &Summary, user: u32, group: u32) -> i64;
}

/// Size and file-count ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quota {
    /// Maximum total bytes, or [`UNLIMITED`].
    pub size_limit: i64,
    /// Maximum number of nodes, or [`UNLIMITED`].
    pub file_count_limit: i64,
    /// Only applies to this owner when set.
    pub owner: Option<u32>,
    /// Only applies to this group when set.
    pub group: Option<u32>,
}

impl Quota {
    /// Quota for every user and group.
    pub const fn new(size_limit: i64, file_count_limit: i64) -> Self {
        Self {
            size_limit,
            file_count_limit,
            owner: None,
            group: None,
        }
    }

    /// Quota without any limit.
    pub const fn unlimited() -> Self {
        Self::new(UNLIMITED, UNLIMITED)
    }

    /// Restrict the quota to one owner.
    pub const fn for_owner(mut self, user: u32) -> Self {
        self.owner = Some(user);
        self
    }

    /// Restrict the quota to one group.
    pub const fn for_group(mut self, group: u32) -> Self {
        self.group = Some(group);
        self
    }

    fn remaining(&self, limit: i64, used: u64, user: u32, group: u32) -> i64 {
        if limit <= UNLIMITED || !self.applies_to(user, group) {
            return UNLIMITED;
        }
        let used = i64::try_from(used).unwrap_or(i64::MAX);
        (limit - used).max(0)
    }
}

impl QuotaLimit for Quota {
    fn applies_to(&self, user: u32, group: u32) -> bool {
        self.owner.is_none_or(|owner| owner == user) && self.group.is_none_or(|g| g == group)
    }

    fn remaining_size(&self, usage: &Summary, user: u32, group: u32) -> i64 {
        self.remaining(self.size_limit, usage.size, user, group)
    }

    fn remaining_file_count(&self, usage: &Summary, user: u32, group: u32) -> i64 {
        self.remaining(self.file_count_limit, usage.file_count, user, group)
    }
}

/// Several quotas checked in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    quotas: Vec<Quota>,
}

impl Collection {
    /// Empty collection; unlimited until quotas are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a quota.
    pub fn with(mut self, quota: Quota) -> Self {
        self.quotas.push(quota);
        self
    }

    /// Append a quota in place.
    pub fn push(&mut self, quota: Quota) {
        self.quotas.push(quota);
    }

    /// The quotas in evaluation order.
    pub fn quotas(&self) -> &[Quota] {
        &self.quotas
    }

    fn first_limited(&self, check: impl Fn(&Quota) -> i64) -> i64 {
        self.quotas
            .iter()
            .map(check)
            .find(|remaining| *remaining != UNLIMITED)
            .unwrap_or(UNLIMITED)
    }
}

impl FromIterator<Quota> for Collection {
    fn from_iter<I: IntoIterator<Item = Quota>>(iter: I) -> Self {
        Self {
            quotas: iter.into_iter().collect(),
        }
    }
}

impl QuotaLimit for Collection {
    fn applies_to(&self, user: u32, group: u32) -> bool {
        self.quotas.iter().any(|q| q.applies_to(user, group))
    }

    fn remaining_size(&self, usage: &Summary, user: u32, group: u32) -> i64 {
        self.first_limited(|q| q.remaining_size(usage, user, group))
    }

    fn remaining_file_count(&self, usage: &Summary, user: u32, group: u32) -> i64 {
        self.first_limited(|q| q.remaining_file_count(usage, user, group))
    }
}

/// Free-space arithmetic for one partition.
///
/// Obtained from [`FileSystem::quota_manager`]. The active identity is the
/// configured default user and group.
#[derive(Debug, Clone, Copy)]
pub struct QuotaManager<'a> {
    fs: &'a FileSystem,
    partition: NodeId,
}

impl<'a> QuotaManager<'a> {
    pub(crate) fn new(fs: &'a FileSystem, partition: NodeId) -> Self {
        Self { fs, partition }
    }

    /// The partition this manager accounts for.
    pub fn partition(&self) -> NodeId {
        self.partition
    }

    /// Bytes still available, optionally for a specific candidate node.
    ///
    /// Returns [`UNLIMITED`], `0` (hard stop) or a positive byte count:
    ///
    /// 1. partitions never count against another partition
    /// 2. no applicable quota means unlimited
    /// 3. if either the remaining size or file count is exhausted the
    ///    answer is 0
    /// 4. without a candidate the remaining size is returned
    /// 5. a leaf candidate consumes its own size
    /// 6. a container candidate consumes its subtree summary and must fit
    ///    the remaining file count
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the partition or candidate does not exist
    pub fn free_disk_space(&self, candidate: Option<NodeId>) -> Result<i64, FsError> {
        let candidate = candidate.map(|id| self.fs.node(id).map(|node| (id, node))).transpose()?;
        if candidate.is_some_and(|(_, node)| node.is_partition()) {
            return Ok(UNLIMITED);
        }

        let config = self.fs.config();
        let (user, group) = (config.default_user, config.default_group);
        let Some(quota) = self.fs.node(self.partition)?.quota() else {
            return Ok(UNLIMITED);
        };
        if !quota.applies_to(user, group) {
            return Ok(UNLIMITED);
        }

        let usage = self.fs.summary(self.partition, Some(user), Some(group))?;
        let remaining_count = quota.remaining_file_count(&usage, user, group);
        let remaining_size = quota.remaining_size(&usage, user, group);
        trace!(
            partition = %self.partition,
            remaining_size,
            remaining_count,
            "quota usage"
        );
        if remaining_count == 0 || remaining_size == 0 {
            return Ok(0);
        }

        let Some((id, node)) = candidate else {
            return Ok(remaining_size);
        };
        if !node.is_container() {
            return Ok(consume(remaining_size, node.size()));
        }

        let subtree = self.fs.summary(id, None, None)?;
        if remaining_count != UNLIMITED
            && i64::try_from(subtree.file_count).unwrap_or(i64::MAX) > remaining_count
        {
            return Ok(0);
        }
        Ok(consume(remaining_size, subtree.size))
    }
}

fn consume(remaining: i64, size: u64) -> i64 {
    if remaining == UNLIMITED {
        return UNLIMITED;
    }
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    (remaining - size).max(0)
}
