//! Filesystem configuration.
//!
//! ## Responsibility
//! - Hold every tunable of the simulated filesystem in one typed struct
//! - Validate node names and normalize lookup keys
//!
//! ## Usage
//!
//! ```rust
//! use vfs_tree::Config;
//!
//! let config = Config::windows().with_umask(0o027).with_default_user(1000);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.partition_key("c:"), "c:\\");
//! ```

use crate::FsError;

/// Characters a node name must never contain, with an optional label used
/// in error messages (e.g. `"windows"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Blacklist {
    /// Forbidden characters.
    pub chars: Vec<char>,
    /// Display name of the set.
    pub name: Option<String>,
}

impl Blacklist {
    /// Named blacklist.
    pub fn new(name: impl Into<String>, chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            chars: chars.into_iter().collect(),
            name: Some(name.into()),
        }
    }

    /// First forbidden character in `name`, if any.
    pub fn find_in(&self, name: &str) -> Option<char> {
        name.chars().find(|c| self.chars.contains(c))
    }
}

/// Configuration shared by every node of a [`FileSystem`](crate::FileSystem).
///
/// The default describes a Unix-like tree: `/` separators, no partition
/// separator, a single root partition with an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Config {
    /// Bits removed from default permissions of new nodes.
    pub umask: u32,
    /// Separator between path components.
    pub file_separator: String,
    /// Separator between a partition name and the rest of the path.
    pub partition_separator: String,
    /// Case-insensitive name lookup.
    pub ignore_case: bool,
    /// Inject `.` and `..` into directory listings.
    pub include_dot_files: bool,
    /// Rewrite `/` and `\` to `file_separator` during sanitization.
    pub normalize_slashes: bool,
    /// Characters forbidden in node names.
    pub blacklist: Blacklist,
    /// Owner of nodes created without an explicit owner; the active user.
    pub default_user: u32,
    /// Group of nodes created without an explicit group; the active group.
    pub default_group: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            umask: 0o022,
            file_separator: "/".to_string(),
            partition_separator: String::new(),
            ignore_case: false,
            include_dot_files: true,
            normalize_slashes: false,
            blacklist: Blacklist::default(),
            default_user: 0,
            default_group: 0,
        }
    }
}

impl Config {
    /// Windows-like preset: `C:\` style roots, case-insensitive names.
    pub fn windows() -> Self {
        Self {
            file_separator: "\\".to_string(),
            partition_separator: ":".to_string(),
            ignore_case: true,
            normalize_slashes: true,
            blacklist: Blacklist::new("windows", ['<', '>', '"', '|', '?', '*', '/']),
            ..Self::default()
        }
    }

    /// Set the umask.
    pub fn with_umask(mut self, umask: u32) -> Self {
        self.umask = umask;
        self
    }

    /// Set both separators.
    pub fn with_separators(
        mut self,
        file_separator: impl Into<String>,
        partition_separator: impl Into<String>,
    ) -> Self {
        self.file_separator = file_separator.into();
        self.partition_separator = partition_separator.into();
        self
    }

    /// Toggle case-insensitive lookup.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Toggle synthetic `.`/`..` listing entries.
    pub fn with_dot_files(mut self, include: bool) -> Self {
        self.include_dot_files = include;
        self
    }

    /// Toggle slash normalization.
    pub fn with_normalize_slashes(mut self, normalize: bool) -> Self {
        self.normalize_slashes = normalize;
        self
    }

    /// Replace the blacklist.
    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// Set the active/default user.
    pub fn with_default_user(mut self, user: u32) -> Self {
        self.default_user = user;
        self
    }

    /// Set the active/default group.
    pub fn with_default_group(mut self, group: u32) -> Self {
        self.default_group = group;
        self
    }

    /// Parse a configuration from JSON, using camelCase option names.
    /// Missing options keep their defaults.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if the JSON does not describe a config
    /// - [`FsError::Configuration`] if the resulting config is inconsistent
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, FsError> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| FsError::invalid(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// - [`FsError::Configuration`] if the file separator is empty, a
    ///   separator contains the other, a separator is blacklisted, or the
    ///   umask has bits outside `0o777`
    pub fn validate(&self) -> Result<(), FsError> {
        let error = FsError::Configuration {
            operation: "validate",
        };
        if self.file_separator.is_empty() || self.umask & !0o777 != 0 {
            return Err(error);
        }
        if !self.partition_separator.is_empty()
            && (self.partition_separator.contains(&self.file_separator)
                || self.file_separator.contains(&self.partition_separator))
        {
            return Err(error);
        }
        let mut separators = self
            .file_separator
            .chars()
            .chain(self.partition_separator.chars());
        if separators.any(|c| self.blacklist.chars.contains(&c)) {
            return Err(error);
        }
        Ok(())
    }

    /// Reject names that can never appear in the tree.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] for `.`, `..`, an empty name when
    ///   `allow_empty` is false, or a name containing a separator, NUL or a
    ///   blacklisted character
    pub fn check_name(&self, name: &str, allow_empty: bool) -> Result<(), FsError> {
        if name.is_empty() && !allow_empty {
            return Err(FsError::invalid("name must not be empty"));
        }
        if name == "." || name == ".." {
            return Err(FsError::invalid(format!("name must not be {name:?}")));
        }
        if name.contains(&self.file_separator) {
            return Err(FsError::invalid(format!(
                "name {name:?} contains the file separator"
            )));
        }
        if !self.partition_separator.is_empty() && name.contains(&self.partition_separator) {
            return Err(FsError::invalid(format!(
                "name {name:?} contains the partition separator"
            )));
        }
        if name.contains('\0') {
            return Err(FsError::invalid(format!("name {name:?} contains NUL")));
        }
        if let Some(c) = self.blacklist.find_in(name) {
            let set = self.blacklist.name.as_deref().unwrap_or("blacklisted");
            return Err(FsError::invalid(format!(
                "name {name:?} contains {set} character {c:?}"
            )));
        }
        Ok(())
    }

    /// Lookup key for a child name.
    pub fn normalize_name(&self, name: &str) -> String {
        if self.ignore_case {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Lookup key for a partition: trailing separators trimmed, then the
    /// canonical `partition_separator + file_separator` suffix appended.
    pub fn partition_key(&self, name: &str) -> String {
        let mut trimmed = name;
        loop {
            let before = trimmed.len();
            trimmed = trimmed.trim_end_matches(self.file_separator.as_str());
            if !self.partition_separator.is_empty() {
                trimmed = trimmed.trim_end_matches(self.partition_separator.as_str());
            }
            if trimmed.len() == before {
                break;
            }
        }
        let key = format!(
            "{trimmed}{}{}",
            self.partition_separator, self.file_separator
        );
        self.normalize_name(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::windows().validate().is_ok());
    }

    #[test]
    fn empty_file_separator_is_rejected() {
        let config = Config::default().with_separators("", ":");
        assert!(matches!(
            config.validate(),
            Err(FsError::Configuration { .. })
        ));
    }

    #[test]
    fn overlapping_separators_are_rejected() {
        let config = Config::default().with_separators("/", "/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn blacklisted_separator_is_rejected() {
        let config = Config::default().with_blacklist(Blacklist::new("bad", ['/']));
        assert!(config.validate().is_err());
    }

    #[test]
    fn wide_umask_is_rejected() {
        assert!(Config::default().with_umask(0o1000).validate().is_err());
    }

    #[test]
    fn dot_names_are_rejected() {
        let config = Config::default();
        assert!(config.check_name(".", false).is_err());
        assert!(config.check_name("..", true).is_err());
        assert!(config.check_name("", false).is_err());
        assert!(config.check_name("", true).is_ok());
        assert!(config.check_name("...", false).is_ok());
    }

    #[test]
    fn separator_and_nul_are_rejected() {
        let config = Config::windows();
        assert!(config.check_name("a\\b", false).is_err());
        assert!(config.check_name("c:", false).is_err());
        assert!(config.check_name("a\0b", false).is_err());
    }

    #[test]
    fn blacklist_error_names_the_set() {
        let err = Config::windows().check_name("what?", false).unwrap_err();
        assert!(err.to_string().contains("windows"));
        assert!(err.to_string().contains("'?'"));
    }

    #[test]
    fn partition_keys_converge() {
        let config = Config::windows();
        assert_eq!(config.partition_key("D"), "d:\\");
        assert_eq!(config.partition_key("D:"), "d:\\");
        assert_eq!(config.partition_key("D:\\"), "d:\\");
        assert_eq!(config.partition_key("d:\\\\"), "d:\\");
    }

    #[test]
    fn unix_root_partition_key() {
        let config = Config::default();
        assert_eq!(config.partition_key(""), "/");
        assert_eq!(config.partition_key("/"), "/");
        assert_eq!(config.partition_key("mnt"), "mnt/");
    }

    #[test]
    fn normalize_respects_case_setting() {
        assert_eq!(Config::default().normalize_name("Foo"), "Foo");
        assert_eq!(
            Config::default().with_ignore_case(true).normalize_name("Foo"),
            "foo"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn from_json_uses_camel_case_and_defaults() {
        let config = Config::from_json(r#"{"fileSeparator": "\\", "partitionSeparator": ":", "ignoreCase": true}"#)
            .unwrap();
        assert_eq!(config.file_separator, "\\");
        assert!(config.ignore_case);
        assert_eq!(config.umask, 0o022);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            Config::from_json("[1, 2]"),
            Err(FsError::InvalidArgument { .. })
        ));
    }
}
