//! Source Locations
//!
//! A [`Location`] names a file as a (search-root base, relative path) pair.
//! The base is the directory or archive the file was found in; the path is
//! relative to it and uses `/` separators regardless of platform.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a schema or profile file lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Search root the file was found under, or empty for standalone paths
    #[serde(default)]
    pub base: String,
    /// Path relative to `base`
    pub path: String,
}

impl Location {
    pub fn new(base: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
        }
    }

    /// A location with an empty base
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("", path)
    }

    /// Copy of this location with a different relative path
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            base: self.base.clone(),
            path: path.into(),
        }
    }

    /// Final segment of `path`
    pub fn file_name(&self) -> &str {
        match self.path.rfind('/') {
            Some(slash) => &self.path[slash + 1..],
            None => &self.path,
        }
    }

    /// Directory part of `path` including the trailing slash, or "" at the root
    pub fn parent_dir(&self) -> &str {
        match self.path.rfind('/') {
            Some(slash) => &self.path[..slash + 1],
            None => "",
        }
    }

    /// Location of the enclosing directory, or None when already at the root
    pub fn parent(&self) -> Option<Location> {
        self.path
            .rfind('/')
            .map(|slash| self.with_path(&self.path[..slash]))
    }

    /// Display form with a line number, used by diagnostics
    pub fn at_line(&self, line: usize) -> String {
        format!("{}:{}", self, line)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.base.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}/{}", self.base.trim_end_matches('/'), self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_uses_base_and_path() {
        assert_eq!(Location::new("a", "b.proto"), Location::new("a", "b.proto"));
        assert_ne!(Location::new("a", "b.proto"), Location::new("c", "b.proto"));
        assert_ne!(Location::new("a", "b.proto"), Location::get("b.proto"));
    }

    #[test]
    fn test_with_path_keeps_base() {
        let location = Location::new("src/proto", "squareup/dinosaur.proto");
        let sibling = location.with_path("squareup/java.wire");
        assert_eq!(sibling.base, "src/proto");
        assert_eq!(sibling.path, "squareup/java.wire");
    }

    #[test]
    fn test_parent_dir_and_parent() {
        let location = Location::new("base", "a/b/c.proto");
        assert_eq!(location.parent_dir(), "a/b/");
        assert_eq!(location.file_name(), "c.proto");
        assert_eq!(location.parent(), Some(Location::new("base", "a/b")));

        let top = Location::new("base", "c.proto");
        assert_eq!(top.parent_dir(), "");
        assert_eq!(top.parent(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::new("src/", "a.proto").to_string(), "src/a.proto");
        assert_eq!(Location::get("a.proto").to_string(), "a.proto");
        assert_eq!(Location::get("a.proto").at_line(7), "a.proto:7");
    }
}
