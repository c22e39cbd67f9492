//! Path sanitization and rendering.
//!
//! Paths are plain strings in the configured separator convention, not
//! `std::path::Path`: a Windows-style tree must behave the same on every host.

use crate::Config;

/// URL scheme prefix of every node URL.
pub const SCHEME: &str = "vfs://";

/// Remove a leading [`SCHEME`], ignoring ASCII case.
pub fn strip_scheme(path: &str) -> &str {
    match path.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &path[SCHEME.len()..],
        _ => path,
    }
}

/// Canonical form of `raw`.
///
/// Strips the scheme, optionally normalizes slashes, drops trailing
/// separators, empty segments and `.`, and resolves `..` without ever
/// removing the first retained segment: `/../../a` becomes `/a` and `../a`
/// becomes `a`. Only a leading empty (root) segment survives as empty. The
/// operation is idempotent.
pub fn sanitize(config: &Config, raw: &str) -> String {
    let sep = config.file_separator.as_str();
    let mut path = strip_scheme(raw).to_string();
    if config.normalize_slashes {
        path = path.replace(['/', '\\'], sep);
    }
    let rooted = path.starts_with(sep);
    let trimmed = path.trim_end_matches(sep);

    let mut segments: Vec<&str> = Vec::new();
    for (index, segment) in trimmed.split(sep).enumerate() {
        if index == 0 && segment.is_empty() {
            segments.push(segment);
            continue;
        }
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() > 1 {
                    segments.pop();
                }
            }
            _ => segments.push(segment),
        }
    }

    let joined = segments.join(sep);
    if joined.is_empty() && rooted {
        sep.to_string()
    } else {
        joined
    }
}

/// Segments of a sanitized path; the first one names the partition.
pub fn segments<'a>(config: &Config, sanitized: &'a str) -> Vec<&'a str> {
    let mut parts = sanitized.split(config.file_separator.as_str());
    let first = parts.next().unwrap_or_default();
    std::iter::once(first)
        .chain(parts.filter(|part| !part.is_empty()))
        .collect()
}

/// Split a sanitized path into its parent path and final name.
///
/// Returns `None` when the path has a single segment (a partition).
pub fn split_last<'a>(config: &Config, sanitized: &'a str) -> Option<(String, &'a str)> {
    let parts = segments(config, sanitized);
    let (last, parent) = parts.split_last()?;
    if parent.is_empty() {
        return None;
    }
    let sep = config.file_separator.as_str();
    let mut parent_path = parent.join(sep);
    if parent_path.is_empty() {
        parent_path.push_str(sep);
    }
    Some((parent_path, last))
}

/// Render a child path: parent path with trailing separators trimmed,
/// separator, name.
pub fn join(config: &Config, parent: &str, name: &str) -> String {
    let sep = config.file_separator.as_str();
    format!("{}{sep}{name}", parent.trim_end_matches(sep))
}

/// Mount root rendering of a partition name, e.g. `C:\` or `/`.
pub fn mount_root(config: &Config, name: &str) -> String {
    format!(
        "{name}{}{}",
        config.partition_separator, config.file_separator
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unix() -> Config {
        Config::default()
    }

    #[test]
    fn resolves_dots() {
        assert_eq!(sanitize(&unix(), "/a/b/../c/./"), "/a/c");
        assert_eq!(sanitize(&unix(), "/a/./b/."), "/a/b");
    }

    #[test]
    fn never_rises_above_first_segment() {
        assert_eq!(sanitize(&unix(), "/../../a"), "/a");
        assert_eq!(sanitize(&unix(), "/a/../../../b"), "/b");
        assert_eq!(sanitize(&unix(), "a/.."), "a");
        assert_eq!(sanitize(&unix(), "./a"), "a");
        assert_eq!(sanitize(&unix(), "../a"), "a");
        assert_eq!(sanitize(&unix(), "../../a/b"), "a/b");
        assert_eq!(sanitize(&Config::windows(), ".\\C:\\x"), "C:\\x");
        assert_eq!(sanitize(&unix(), ".."), "");
    }

    #[test]
    fn strips_scheme_case_insensitively() {
        assert_eq!(sanitize(&unix(), "vfs:///a/b"), "/a/b");
        assert_eq!(sanitize(&unix(), "VFS:///a/b"), "/a/b");
        assert_eq!(sanitize(&unix(), "vfsx:///a"), "vfsx:/a");
    }

    #[test]
    fn root_keeps_its_separator() {
        assert_eq!(sanitize(&unix(), "/"), "/");
        assert_eq!(sanitize(&unix(), "//"), "/");
        assert_eq!(sanitize(&unix(), "vfs:///"), "/");
        assert_eq!(sanitize(&unix(), ""), "");
    }

    #[test]
    fn collapses_empty_segments() {
        assert_eq!(sanitize(&unix(), "/a//b///"), "/a/b");
    }

    #[test]
    fn normalizes_windows_slashes() {
        let windows = Config::windows();
        assert_eq!(sanitize(&windows, "C:/Users/../Temp/"), "C:\\Temp");
        assert_eq!(sanitize(&windows, "vfs://c:\\a\\.\\b"), "c:\\a\\b");
        assert_eq!(sanitize(&windows, "C:\\"), "C:");
    }

    #[test]
    fn slashes_kept_without_normalization() {
        let windows = Config::windows().with_normalize_slashes(false);
        assert_eq!(sanitize(&windows, "C:\\a/b"), "C:\\a/b");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "/a/b/../c/./",
            "/../../a",
            "//",
            "/",
            "",
            "a/../..",
            "vfs://x//y/./z/..",
            "./a",
            "../a/./b",
            "/a/b/",
        ];
        for config in [unix(), Config::windows()] {
            for input in inputs {
                let once = sanitize(&config, input);
                assert_eq!(sanitize(&config, &once), once, "input {input:?}");
            }
        }
    }

    #[test]
    fn segments_keep_partition_slot() {
        assert_eq!(segments(&unix(), "/"), vec![""]);
        assert_eq!(segments(&unix(), "/a/b"), vec!["", "a", "b"]);
        assert_eq!(segments(&Config::windows(), "C:\\a"), vec!["C:", "a"]);
    }

    #[test]
    fn split_last_separates_parent() {
        assert_eq!(
            split_last(&unix(), "/a/b"),
            Some(("/a".to_string(), "b"))
        );
        assert_eq!(split_last(&unix(), "/a"), Some(("/".to_string(), "a")));
        assert_eq!(split_last(&unix(), "/"), None);
        assert_eq!(
            split_last(&Config::windows(), "C:\\f"),
            Some(("C:".to_string(), "f"))
        );
    }

    #[test]
    fn join_trims_parent_separator() {
        assert_eq!(join(&unix(), "/", "a"), "/a");
        assert_eq!(join(&unix(), "/a", "b"), "/a/b");
        assert_eq!(join(&Config::windows(), "C:\\", "x"), "C:\\x");
    }

    #[test]
    fn mount_roots() {
        assert_eq!(mount_root(&unix(), ""), "/");
        assert_eq!(mount_root(&Config::windows(), "C"), "C:\\");
    }
}
