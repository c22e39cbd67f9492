//! Declarative trees for [`FileSystem::populate`].

use tracing::debug;

use crate::{FileSystem, FsError, NodeId};

/// A file or directory to create, with its descendants.
///
/// Under the `serde` feature a structure can be loaded from JSON:
///
/// ```json
/// [{"directory": {"name": "etc", "children": [{"file": {"name": "hosts", "data": [10]}}]}}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Structure {
    /// Buffer-backed regular file.
    File {
        /// File name.
        name: String,
        /// Initial bytes.
        data: Vec<u8>,
    },
    /// Directory and its entries.
    Directory {
        /// Directory name.
        name: String,
        /// Entries, created in order.
        children: Vec<Structure>,
    },
}

impl Structure {
    /// File entry.
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Structure::File {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Directory entry.
    pub fn directory(name: impl Into<String>, children: impl IntoIterator<Item = Structure>) -> Self {
        Structure::Directory {
            name: name.into(),
            children: children.into_iter().collect(),
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        match self {
            Structure::File { name, .. } | Structure::Directory { name, .. } => name,
        }
    }
}

impl FileSystem {
    /// Create `entries` (recursively) inside `parent`, returning the ids of
    /// the top-level nodes created.
    ///
    /// Creation stops at the first failure; entries created before it stay.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] for an illegal name
    /// - any error of [`add_child`](FileSystem::add_child)
    pub fn populate(&mut self, parent: NodeId, entries: &[Structure]) -> Result<Vec<NodeId>, FsError> {
        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = match entry {
                Structure::File { name, data } => self.create_file(parent, name, data)?,
                Structure::Directory { name, children } => {
                    let dir = self.create_dir(parent, name)?;
                    self.populate(dir, children)?;
                    dir
                }
            };
            created.push(id);
        }
        debug!(%parent, count = created.len(), "populated");
        Ok(created)
    }

    /// Parse a JSON structure list and populate `parent` with it.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if the JSON is not a structure list
    /// - any error of [`populate`](FileSystem::populate)
    #[cfg(feature = "serde")]
    pub fn populate_json(&mut self, parent: NodeId, json: &str) -> Result<Vec<NodeId>, FsError> {
        let entries: Vec<Structure> = serde_json::from_str(json)
            .map_err(|e| FsError::invalid(format!("structure: {e}")))?;
        self.populate(parent, &entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, ErrorKind};

    #[test]
    fn builds_nested_tree() {
        let mut fs = FileSystem::new(Config::default()).unwrap();
        let root = fs.mount("", None).unwrap();
        let created = fs
            .populate(
                root,
                &[
                    Structure::directory(
                        "etc",
                        [Structure::file("hosts", "127.0.0.1"), Structure::directory("ssl", [])],
                    ),
                    Structure::file("README", b"hi".to_vec()),
                ],
            )
            .unwrap();
        assert_eq!(created.len(), 2);
        let hosts = fs.find("/etc/hosts").unwrap();
        assert_eq!(fs.node(hosts).unwrap().size(), 9);
        assert!(fs.find("/etc/ssl").is_some());
        assert_eq!(fs.find("/README"), Some(created[1]));
    }

    #[test]
    fn illegal_name_is_invalid_argument() {
        let mut fs = FileSystem::new(Config::default()).unwrap();
        let root = fs.mount("", None).unwrap();
        let err = fs
            .populate(root, &[Structure::file("a/b", "")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn names() {
        assert_eq!(Structure::file("f", "").name(), "f");
        assert_eq!(Structure::directory("d", []).name(), "d");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn populates_from_json() {
        let mut fs = FileSystem::new(Config::default()).unwrap();
        let root = fs.mount("", None).unwrap();
        fs.populate_json(
            root,
            r#"[{"directory": {"name": "etc", "children": [{"file": {"name": "hosts", "data": [10]}}]}}]"#,
        )
        .unwrap();
        assert!(fs.find("/etc/hosts").is_some());
        assert!(fs.populate_json(root, "{").is_err());
    }
}
