//! Search Roots
//!
//! A [`Root`] is one entry of the source path or proto path: a directory
//! tree, a single standalone file, or a tar archive. Roots enumerate every
//! `.proto` file they hold and resolve import strings to [`ProtoFilePath`]s.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tar::Archive;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::fs::FileSystem;
use crate::location::Location;
use crate::parser;
use crate::schema::ProtoFile;

const PROTO_EXTENSION: &str = ".proto";
const ARCHIVE_EXTENSION: &str = ".tar";

/// One search-path entry
#[derive(Debug, Clone)]
pub enum Root {
    /// Every file below `dir`, located relative to it
    Directory { base: String, dir: PathBuf },
    /// Exactly one file
    StandaloneFile { location: Location, file: PathBuf },
    /// Text entries of a tar archive, keyed by entry path
    Archive {
        base: String,
        entries: Arc<BTreeMap<String, String>>,
    },
}

impl Root {
    /// Build the roots named by `location`.
    ///
    /// With an empty base the path itself is the root: a `.tar` archive, a
    /// directory, or a single file. With a non-empty base the location names
    /// one file inside that base.
    pub fn from_location(location: &Location, fs: &dyn FileSystem) -> Result<Vec<Root>> {
        if location.base.is_empty() {
            return Self::from_path(&location.path, fs).map(|root| vec![root]);
        }

        if location.base.ends_with(ARCHIVE_EXTENSION) {
            let entries = read_archive(Path::new(&location.base), fs)?;
            let entry = entries
                .get(&location.path)
                .cloned()
                .ok_or_else(|| invalid(&location.to_string(), "no such entry in archive"))?;
            let single = BTreeMap::from([(location.path.clone(), entry)]);
            return Ok(vec![Root::Archive {
                base: location.base.clone(),
                entries: Arc::new(single),
            }]);
        }

        let file = Path::new(&location.base).join(&location.path);
        if !fs.exists(&file) || fs.is_dir(&file) {
            return Err(invalid(&location.to_string(), "no such file"));
        }
        Ok(vec![Root::StandaloneFile {
            location: location.clone(),
            file,
        }])
    }

    fn from_path(path: &str, fs: &dyn FileSystem) -> Result<Root> {
        let fs_path = Path::new(path);
        if path.ends_with(ARCHIVE_EXTENSION) {
            let entries = read_archive(fs_path, fs)?;
            debug!(archive = %path, entries = entries.len(), "Opened archive root");
            return Ok(Root::Archive {
                base: path.to_string(),
                entries: Arc::new(entries),
            });
        }
        if fs.is_dir(fs_path) {
            return Ok(Root::Directory {
                base: path.to_string(),
                dir: fs_path.to_path_buf(),
            });
        }
        if fs.exists(fs_path) {
            return Ok(Root::StandaloneFile {
                location: Location::get(path),
                file: fs_path.to_path_buf(),
            });
        }
        Err(invalid(path, "no such file or directory"))
    }

    /// The base shared by every location under this root
    pub fn base(&self) -> &str {
        match self {
            Root::Directory { base, .. } | Root::Archive { base, .. } => base,
            Root::StandaloneFile { location, .. } => &location.base,
        }
    }

    /// The root that can see files beside the ones this root yields.
    ///
    /// A standalone file inside a base directory only resolves itself, but
    /// its profiles live in the surrounding tree.
    pub fn neighborhood(&self) -> Root {
        match self {
            Root::StandaloneFile { location, .. } if !location.base.is_empty() => Root::Directory {
                base: location.base.clone(),
                dir: PathBuf::from(&location.base),
            },
            other => other.clone(),
        }
    }

    /// Every `.proto` file under this root, sorted by path
    pub fn all_proto_files(&self, fs: &dyn FileSystem) -> Result<Vec<ProtoFilePath>> {
        match self {
            Root::Directory { base, dir } => {
                let mut files = Vec::new();
                for file in fs.list_files(dir)? {
                    let Some(relative) = relative_path(dir, &file) else {
                        continue;
                    };
                    if relative.ends_with(PROTO_EXTENSION) {
                        files.push(ProtoFilePath {
                            location: Location::new(base.clone(), relative),
                            root: self.clone(),
                        });
                    }
                }
                Ok(files)
            }
            Root::StandaloneFile { location, .. } => Ok(vec![ProtoFilePath {
                location: location.clone(),
                root: self.clone(),
            }]),
            Root::Archive { base, entries } => Ok(entries
                .keys()
                .filter(|path| path.ends_with(PROTO_EXTENSION))
                .map(|path| ProtoFilePath {
                    location: Location::new(base.clone(), path.clone()),
                    root: self.clone(),
                })
                .collect()),
        }
    }

    /// Resolve an import string (or any root-relative path) to a file
    pub fn resolve(&self, import: &str, fs: &dyn FileSystem) -> Option<ProtoFilePath> {
        let found = match self {
            Root::Directory { base, dir } => {
                let file = dir.join(import);
                (fs.exists(&file) && !fs.is_dir(&file)).then(|| Location::new(base.clone(), import))
            }
            Root::StandaloneFile { location, .. } => {
                (location.path == import).then(|| location.clone())
            }
            Root::Archive { base, entries } => entries
                .contains_key(import)
                .then(|| Location::new(base.clone(), import)),
        }?;
        Some(ProtoFilePath {
            location: found,
            root: self.clone(),
        })
    }
}

/// A resolved file and the root it came from
#[derive(Debug, Clone)]
pub struct ProtoFilePath {
    pub location: Location,
    pub root: Root,
}

impl ProtoFilePath {
    pub fn read(&self, fs: &dyn FileSystem) -> Result<String> {
        match &self.root {
            Root::Directory { dir, .. } => Ok(fs.read_to_string(&dir.join(&self.location.path))?),
            Root::StandaloneFile { file, .. } => Ok(fs.read_to_string(file)?),
            Root::Archive { base, entries } => entries
                .get(&self.location.path)
                .cloned()
                .ok_or_else(|| invalid(base, &format!("missing entry {}", self.location.path))),
        }
    }

    /// Read and parse as a `.proto` file
    pub fn parse(&self, fs: &dyn FileSystem) -> Result<ProtoFile> {
        let source = self.read(fs)?;
        Ok(parser::parse(&self.location, &source)?)
    }
}

/// Build roots for every location, in order
pub fn roots_for(locations: &[Location], fs: &dyn FileSystem) -> Result<Vec<Root>> {
    let mut roots = Vec::new();
    for location in locations {
        roots.extend(Root::from_location(location, fs)?);
    }
    Ok(roots)
}

fn relative_path(dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Text entries of a tar archive; entries that are not UTF-8 are skipped
fn read_archive(path: &Path, fs: &dyn FileSystem) -> Result<BTreeMap<String, String>> {
    let bytes = fs.read(path)?;
    let mut archive = Archive::new(Cursor::new(bytes));
    let mut entries = BTreeMap::new();
    let tar_entries = archive
        .entries()
        .map_err(|e| invalid(&path.display().to_string(), &e.to_string()))?;
    for entry in tar_entries {
        let mut entry = entry.map_err(|e| invalid(&path.display().to_string(), &e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().trim_start_matches("./").to_string();
        let mut contents = String::new();
        if entry.read_to_string(&mut contents).is_ok() {
            entries.insert(name, contents);
        }
    }
    Ok(entries)
}

fn invalid(path: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidRoot {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
