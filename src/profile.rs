//! Profiles
//!
//! A profile customizes one backend: `java.wire` files placed beside (or
//! above) the schema files they apply to can retarget a proto type to an
//! existing class with an adapter, or attach annotations to it.
//!
//! [`ProfileLoader`] finds every `<name>.wire` in the directories that contain
//! a loaded file and in all of their ancestors, parses them, and checks that
//! each profile imports the files declaring the types it overrides.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::{DiagnosticCode, ErrorCollector};
use crate::fs::FileSystem;
use crate::location::Location;
use crate::parser;
use crate::root::Root;
use crate::schema::{ProtoType, Schema};

const PROFILE_EXTENSION: &str = ".wire";

/// One `type` block of a profile file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub location: Location,
    pub line: usize,
    pub documentation: String,
    /// Overridden proto type as written: `squareup.geology.Period`
    pub ty: String,
    /// Replacement type in the generated language
    pub target: Option<String>,
    /// Adapter converting between the proto encoding and `target`
    pub adapter: Option<String>,
    /// `with` annotations, verbatim
    pub annotations: Vec<String>,
}

/// One parsed `<name>.wire` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFileElement {
    pub location: Location,
    pub package_name: Option<String>,
    pub imports: Vec<String>,
    pub type_configs: Vec<TypeConfig>,
}

/// Every profile file found for one backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub files: Vec<ProfileFileElement>,
}

impl Profile {
    pub fn new(files: Vec<ProfileFileElement>) -> Self {
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The first type config overriding `ty`
    pub fn type_config(&self, ty: &ProtoType) -> Option<&TypeConfig> {
        let name = ty.to_string();
        self.files
            .iter()
            .flat_map(|file| file.type_configs.iter())
            .find(|config| ProtoType::get(&config.ty).to_string() == name)
    }

    /// Replacement name for `ty` in the generated language
    pub fn target(&self, ty: &ProtoType) -> Option<&str> {
        self.type_config(ty).and_then(|config| config.target.as_deref())
    }

    pub fn adapter(&self, ty: &ProtoType) -> Option<&str> {
        self.type_config(ty).and_then(|config| config.adapter.as_deref())
    }

    pub fn annotations(&self, ty: &ProtoType) -> &[String] {
        self.type_config(ty)
            .map(|config| config.annotations.as_slice())
            .unwrap_or(&[])
    }
}

/// Finds and validates the profile files for a backend
pub struct ProfileLoader<'a> {
    fs: &'a dyn FileSystem,
    base_to_roots: &'a BTreeMap<String, Vec<Root>>,
}

impl<'a> ProfileLoader<'a> {
    pub fn new(fs: &'a dyn FileSystem, base_to_roots: &'a BTreeMap<String, Vec<Root>>) -> Self {
        Self { fs, base_to_roots }
    }

    /// Load the `<name>.wire` profile applying to `schema`.
    ///
    /// Parse failures and validation problems are recorded in `errors`; the
    /// returned profile holds every file that parsed.
    pub fn load_profile(&self, name: &str, schema: &Schema, errors: &mut ErrorCollector) -> Profile {
        let seeds = schema.proto_files().iter().map(|file| file.location.clone());
        let mut files = Vec::new();

        for candidate in profile_candidates(name, seeds) {
            let Some(roots) = self.base_to_roots.get(&candidate.base) else {
                continue;
            };
            for root in roots {
                let Some(path) = root.resolve(&candidate.path, self.fs) else {
                    continue;
                };
                let parsed = path
                    .read(self.fs)
                    .map_err(|e| e.to_string())
                    .and_then(|source| parser::parse_profile(&path.location, &source).map_err(|e| e.to_string()));
                match parsed {
                    Ok(element) => {
                        debug!(profile = %path.location, types = element.type_configs.len(), "Loaded profile file");
                        files.push(element);
                    }
                    Err(message) => {
                        errors.error(DiagnosticCode::ParseFailure, Some(&path.location), message);
                    }
                }
            }
        }

        validate(&files, schema, errors);
        Profile::new(files)
    }
}

/// Candidate profile locations, nearest directories first.
///
/// For `a/b/c.proto` and profile `java` this yields `a/b/java.wire`,
/// `a/java.wire`, then `java.wire`, each at the file's base.
pub fn profile_candidates(name: &str, seeds: impl IntoIterator<Item = Location>) -> Vec<Location> {
    let file_name = format!("{}{}", name, PROFILE_EXTENSION);
    let mut queue: VecDeque<Location> = seeds.into_iter().collect();
    let mut visited: HashSet<Location> = queue.iter().cloned().collect();
    let mut seen_candidates = HashSet::new();
    let mut candidates = Vec::new();

    while let Some(location) = queue.pop_front() {
        let candidate = location.with_path(format!("{}{}", location.parent_dir(), file_name));
        if seen_candidates.insert(candidate.clone()) {
            candidates.push(candidate);
        }
        if let Some(parent) = location.parent() {
            if visited.insert(parent.clone()) {
                queue.push_back(parent);
            }
        }
    }
    candidates
}

/// Every overridden type's declaring file must be imported by its profile
fn validate(files: &[ProfileFileElement], schema: &Schema, errors: &mut ErrorCollector) {
    for file in files {
        for config in &file.type_configs {
            let location = config.location.at_line(config.line);

            if config.target.is_some() && config.adapter.is_none() {
                errors.error(
                    DiagnosticCode::InvalidProfileOverride,
                    Some(&config.location),
                    format!("{} has a target but no adapter ({})", config.ty, location),
                );
            }

            let written = ProtoType::get(&config.ty);
            let ty = written.value_type().cloned().unwrap_or(written);
            if ty.is_scalar() {
                continue;
            }
            let Some(declaring) = schema.proto_file_for_type(&ty) else {
                continue;
            };
            let required = &declaring.location.path;
            if !file.imports.contains(required) {
                errors.error(
                    DiagnosticCode::MissingProfileImport,
                    Some(&file.location),
                    format!("{} needs to import {} ({})", file.location.path, required, location),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_walk_ancestors() {
        let candidates = profile_candidates("java", [Location::new("src", "a/b/c.proto")]);
        assert_eq!(
            candidates,
            vec![
                Location::new("src", "a/b/java.wire"),
                Location::new("src", "a/java.wire"),
                Location::new("src", "java.wire"),
            ]
        );
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let candidates = profile_candidates(
            "android",
            [
                Location::new("src", "a/x.proto"),
                Location::new("src", "a/y.proto"),
                Location::new("lib", "z.proto"),
            ],
        );
        assert_eq!(
            candidates,
            vec![
                Location::new("src", "a/android.wire"),
                Location::new("lib", "android.wire"),
                Location::new("src", "android.wire"),
            ]
        );
    }

    #[test]
    fn test_profile_lookup_by_type() {
        let element = parser::parse_profile(
            &Location::new("src", "java.wire"),
            "syntax = \"wire2\"; type a.B { target java.time.Instant using a.InstantAdapter#INSTANCE; with a.Ann; }",
        )
        .unwrap();
        let profile = Profile::new(vec![element]);
        let ty = ProtoType::get("a.B");
        assert_eq!(profile.target(&ty), Some("java.time.Instant"));
        assert_eq!(profile.adapter(&ty), Some("a.InstantAdapter#INSTANCE"));
        assert_eq!(profile.annotations(&ty), ["a.Ann".to_string()]);
        assert_eq!(profile.target(&ProtoType::get("a.C")), None);
    }
}
