//! File System Abstraction
//!
//! Roots read schema files and handlers write generated code through
//! [`FileSystem`], so the same pipeline runs against the local disk or an
//! in-memory tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use walkdir::WalkDir;

/// File operations used by roots and schema handlers
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// All regular files below `dir`, recursively, sorted by path
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create `path` and its parents; succeeds if it already exists
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write a file; the parent directory must already exist
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

// =============================================================================
// Local Disk
// =============================================================================

/// The real file system
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }
}

// =============================================================================
// In Memory
// =============================================================================

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryTree {
    fn add_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// In-memory file system, mainly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    tree: Mutex<MemoryTree>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut tree = self.lock();
        if let Some(parent) = path.parent() {
            tree.add_dirs(parent);
        }
        tree.files.insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    /// Every file path currently stored
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryTree> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let tree = self.lock();
        tree.files.contains_key(path) || tree.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.lock();
        if !tree.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }
        Ok(tree
            .files
            .keys()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.lock();
        if tree.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path.display()),
            ));
        }
        tree.add_dirs(path);
        Ok(())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut tree = self.lock();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !tree.dirs.contains(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent of {} does not exist", path.display()),
                ));
            }
        }
        tree.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_add_file_creates_dirs() {
        let fs = MemoryFileSystem::new();
        fs.add_file("protos/squareup/a.proto", "syntax = \"proto2\";");

        assert!(fs.is_dir(Path::new("protos")));
        assert!(fs.is_dir(Path::new("protos/squareup")));
        assert!(fs.exists(Path::new("protos/squareup/a.proto")));
        assert!(!fs.is_dir(Path::new("protos/squareup/a.proto")));
        assert_eq!(
            fs.read_to_string(Path::new("protos/squareup/a.proto")).unwrap(),
            "syntax = \"proto2\";"
        );
    }

    #[test]
    fn test_memory_list_files_is_recursive_and_sorted() {
        let fs = MemoryFileSystem::new();
        fs.add_file("p/b.proto", "");
        fs.add_file("p/a/c.proto", "");
        fs.add_file("q/d.proto", "");

        let files = fs.list_files(Path::new("p")).unwrap();
        assert_eq!(files, vec![PathBuf::from("p/a/c.proto"), PathBuf::from("p/b.proto")]);
    }

    #[test]
    fn test_memory_write_requires_parent() {
        let fs = MemoryFileSystem::new();
        assert!(fs.write(Path::new("out/a/B.java"), b"x").is_err());

        fs.create_dir_all(Path::new("out/a")).unwrap();
        fs.create_dir_all(Path::new("out/a")).unwrap();
        fs.write(Path::new("out/a/B.java"), b"x").unwrap();
        assert_eq!(fs.read(Path::new("out/a/B.java")).unwrap(), b"x");
    }

    #[test]
    fn test_local_list_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::write(temp.path().join("a/b/c.proto"), "").unwrap();
        std::fs::write(temp.path().join("a/d.proto"), "").unwrap();

        let files = LocalFileSystem.list_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a/b/c.proto"));
        assert!(files[1].ends_with("a/d.proto"));
    }
}
