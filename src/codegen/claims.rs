//! Claims
//!
//! Targets run in order over one schema. [`ClaimedDefinitions`] records the
//! declarations an exclusive target has taken so later targets skip them;
//! [`ClaimedPaths`] records which declaration produced each output file so
//! two declarations never silently overwrite the same path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::schema::{Extend, Field, ProtoType};

/// Identity of something a handler can generate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Type { name: ProtoType },
    Service { name: ProtoType },
    /// `extended` is the extended message, `field` the package-qualified field
    ExtensionField { extended: String, field: String },
    /// A whole schema file, for passthrough targets
    File { path: String },
}

impl Declaration {
    pub fn for_type(ty: &ProtoType) -> Self {
        Declaration::Type { name: ty.clone() }
    }

    pub fn for_service(ty: &ProtoType) -> Self {
        Declaration::Service { name: ty.clone() }
    }

    /// `field` of `extend`, declared in a file of `package`
    pub fn for_extension(extend: &Extend, field: &Field, package: Option<&str>) -> Self {
        let extended = extend
            .ty
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| extend.element_type.clone());
        Declaration::ExtensionField {
            extended,
            field: extend.qualified_field_name(package, field),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Type { name } | Declaration::Service { name } => write!(f, "{}", name),
            Declaration::ExtensionField { extended, field } => write!(f, "{}#{}", extended, field),
            Declaration::File { path } => write!(f, "{}", path),
        }
    }
}

/// Declarations already taken by an exclusive target. Only grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimedDefinitions {
    claimed: BTreeSet<Declaration>,
}

impl ClaimedDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, declaration: Declaration) {
        self.claimed.insert(declaration);
    }

    pub fn contains(&self, declaration: &Declaration) -> bool {
        self.claimed.contains(declaration)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.claimed.iter()
    }
}

/// Output path → the declaration that produced it
#[derive(Debug, Clone, Default)]
pub struct ClaimedPaths {
    owners: BTreeMap<PathBuf, Declaration>,
    /// Every successful claim in order, repeats included
    log: Vec<PathBuf>,
}

impl ClaimedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `declaration` produces `path`.
    ///
    /// Claiming a path twice for the same declaration is fine; a different
    /// declaration on an owned path is a [`SchemaError::PathCollision`].
    pub fn claim(&mut self, path: PathBuf, declaration: Declaration) -> Result<()> {
        if let Some(existing) = self.owners.get(&path) {
            if existing == &declaration {
                self.log.push(path);
                return Ok(());
            }
            return Err(SchemaError::PathCollision {
                path,
                existing: existing.to_string(),
                claimant: declaration.to_string(),
            });
        }
        self.log.push(path.clone());
        self.owners.insert(path, declaration);
        Ok(())
    }

    pub fn owner(&self, path: &Path) -> Option<&Declaration> {
        self.owners.get(path)
    }

    /// Position to pass to [`ClaimedPaths::since`]
    pub fn mark(&self) -> usize {
        self.log.len()
    }

    /// Distinct paths claimed after `mark`, including re-claims of older paths
    pub fn since(&self, mark: usize) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        self.log[mark.min(self.log.len())..]
            .iter()
            .filter(|path| seen.insert(*path))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclaim_by_same_declaration_is_idempotent() {
        let mut paths = ClaimedPaths::new();
        let dinosaur = Declaration::for_type(&ProtoType::get("squareup.Dinosaur"));
        paths.claim(PathBuf::from("out/Dinosaur.java"), dinosaur.clone()).unwrap();
        paths.claim(PathBuf::from("out/Dinosaur.java"), dinosaur.clone()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths.owner(Path::new("out/Dinosaur.java")), Some(&dinosaur));
    }

    #[test]
    fn test_collision_names_both_declarations() {
        let mut paths = ClaimedPaths::new();
        paths
            .claim(PathBuf::from("out/Dinosaur.java"), Declaration::for_type(&ProtoType::get("a.Dinosaur")))
            .unwrap();
        let err = paths
            .claim(PathBuf::from("out/Dinosaur.java"), Declaration::for_type(&ProtoType::get("b.Dinosaur")))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Same file out/Dinosaur.java is getting generated by different definitions:"));
        assert!(message.contains("a.Dinosaur"));
        assert!(message.contains("b.Dinosaur"));
    }

    #[test]
    fn test_mark_and_since() {
        let mut paths = ClaimedPaths::new();
        paths.claim(PathBuf::from("a"), Declaration::File { path: "a.proto".into() }).unwrap();
        let mark = paths.mark();
        paths.claim(PathBuf::from("b"), Declaration::File { path: "b.proto".into() }).unwrap();
        assert_eq!(paths.since(mark), vec![PathBuf::from("b")]);
        assert_eq!(paths.since(0).len(), 2);
    }

    #[test]
    fn test_since_includes_reclaimed_paths() {
        let mut paths = ClaimedPaths::new();
        let dinosaur = Declaration::for_type(&ProtoType::get("squareup.Dinosaur"));
        paths.claim(PathBuf::from("out/Dinosaur.java"), dinosaur.clone()).unwrap();
        let mark = paths.mark();
        paths.claim(PathBuf::from("out/Dinosaur.java"), dinosaur.clone()).unwrap();
        paths.claim(PathBuf::from("out/Dinosaur.java"), dinosaur).unwrap();
        assert_eq!(paths.since(mark), vec![PathBuf::from("out/Dinosaur.java")]);
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_declaration_display() {
        let extension = Declaration::ExtensionField {
            extended: "google.protobuf.FieldOptions".into(),
            field: "squareup.redacted".into(),
        };
        assert_eq!(extension.to_string(), "google.protobuf.FieldOptions#squareup.redacted");
        assert_eq!(Declaration::for_service(&ProtoType::get("a.S")).to_string(), "a.S");
    }
}
