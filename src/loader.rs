//! Schema Loading
//!
//! [`SchemaLoader`] owns the source-path and proto-path roots. It parses every
//! file on the source path up front and resolves imports against the proto
//! path on demand. Individual loads never fail: problems are recorded in the
//! caller's [`ErrorCollector`] and an empty placeholder stands in for the file,
//! so one pass reports every missing or ambiguous import.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use crate::builtin;
use crate::diagnostics::{Diagnostic, DiagnosticCode, ErrorCollector};
use crate::error::Result;
use crate::fs::FileSystem;
use crate::linker::Linker;
use crate::location::Location;
use crate::parser;
use crate::profile::{Profile, ProfileLoader};
use crate::root::{self, ProtoFilePath, Root};
use crate::schema::{ProtoFile, Schema};

/// Resolves import paths to parsed files on behalf of the linker
pub trait Loader {
    /// Load the file imported as `path`.
    ///
    /// Never fails: unresolvable or ambiguous imports are reported to
    /// `errors` and still yield a file (possibly an empty placeholder).
    fn load(&mut self, path: &str, errors: &mut ErrorCollector) -> ProtoFile;

    /// Import paths of every file on the proto path, for exhaustive linking
    fn proto_path_imports(&mut self, errors: &mut ErrorCollector) -> Vec<String>;
}

/// Loader backed by search roots on a [`FileSystem`]
pub struct SchemaLoader<'fs> {
    fs: &'fs dyn FileSystem,
    source_roots: Vec<Root>,
    proto_roots: Vec<Root>,
    base_to_roots: BTreeMap<String, Vec<Root>>,
    /// Source-path files by import path, in load order
    source_files: Vec<ProtoFile>,
    source_index: BTreeMap<String, usize>,
}

impl<'fs> SchemaLoader<'fs> {
    pub fn new(fs: &'fs dyn FileSystem) -> Self {
        Self {
            fs,
            source_roots: Vec::new(),
            proto_roots: Vec::new(),
            base_to_roots: BTreeMap::new(),
            source_files: Vec::new(),
            source_index: BTreeMap::new(),
        }
    }

    /// Build roots for both paths. A location that names nothing fails here.
    pub fn init_roots(&mut self, source_path: &[Location], proto_path: &[Location]) -> Result<()> {
        self.source_roots = root::roots_for(source_path, self.fs)?;
        self.proto_roots = root::roots_for(proto_path, self.fs)?;

        self.base_to_roots.clear();
        for root in self.source_roots.iter().chain(&self.proto_roots) {
            self.base_to_roots
                .entry(root.base().to_string())
                .or_default()
                .push(root.neighborhood());
        }

        debug!(
            source_roots = self.source_roots.len(),
            proto_roots = self.proto_roots.len(),
            "Initialized roots"
        );
        Ok(())
    }

    /// Roots grouped by base, used to find profile files
    pub fn base_to_roots(&self) -> &BTreeMap<String, Vec<Root>> {
        &self.base_to_roots
    }

    /// Parse every `.proto` file on the source path.
    ///
    /// Files sharing a relative path across two source roots are reported as
    /// ambiguous; the first one wins.
    pub fn load_source_path_files(&mut self, errors: &mut ErrorCollector) -> Vec<ProtoFile> {
        if self.source_roots.is_empty() {
            errors.error(DiagnosticCode::NoSources, None, "no sources");
            return Vec::new();
        }

        let mut seen: BTreeMap<String, Location> = BTreeMap::new();
        let mut ambiguous: BTreeMap<String, Vec<Location>> = BTreeMap::new();
        let roots = self.source_roots.clone();

        for root in &roots {
            let paths = match root.all_proto_files(self.fs) {
                Ok(paths) => paths,
                Err(e) => {
                    errors.error(DiagnosticCode::PathNotFound, None, format!("unable to read {}: {}", root.base(), e));
                    continue;
                }
            };
            for path in paths {
                if let Some(first) = seen.get(&path.location.path) {
                    ambiguous
                        .entry(path.location.path.clone())
                        .or_insert_with(|| vec![first.clone()])
                        .push(path.location.clone());
                    continue;
                }
                seen.insert(path.location.path.clone(), path.location.clone());

                let mut file = self.parse(&path, errors);
                file.loaded_on_source_path = true;
                self.source_index.insert(file.import_path(), self.source_files.len());
                self.source_files.push(file);
            }
        }

        for (path, locations) in ambiguous {
            let mut diagnostic = Diagnostic::new(DiagnosticCode::AmbiguousImport, format!("{} is ambiguous:", path));
            for location in &locations {
                diagnostic = diagnostic.with_context(location.to_string());
            }
            errors.push(diagnostic);
        }

        info!(files = self.source_files.len(), "Loaded source path");
        self.source_files.clone()
    }

    /// Load sources, checkpoint, link, checkpoint
    pub fn load_schema(&mut self, permit_package_cycles: bool, load_exhaustively: bool) -> Result<Schema> {
        let mut errors = ErrorCollector::new();
        let sources = self.load_source_path_files(&mut errors);
        errors.throw_if_non_empty()?;

        let schema = Linker::new(self, &mut errors)
            .permit_package_cycles(permit_package_cycles)
            .load_exhaustively(load_exhaustively)
            .link(sources);
        errors.throw_if_non_empty()?;
        Ok(schema)
    }

    /// Collect the `<name>.wire` profile for `schema`
    pub fn load_profile(&self, name: &str, schema: &Schema, errors: &mut ErrorCollector) -> Profile {
        ProfileLoader::new(self.fs, &self.base_to_roots).load_profile(name, schema, errors)
    }

    /// Parse a resolved path, checking that it lives where its import says
    fn parse(&self, path: &ProtoFilePath, errors: &mut ErrorCollector) -> ProtoFile {
        match path.parse(self.fs) {
            Ok(file) => {
                check_import_path(&file, errors);
                file
            }
            Err(e) => {
                errors.error(DiagnosticCode::ParseFailure, Some(&path.location), e.to_string());
                ProtoFile::empty(path.location.clone())
            }
        }
    }

    fn load_builtin(&self, path: &str, errors: &mut ErrorCollector) -> Option<ProtoFile> {
        let source = builtin::source(path)?;
        let location = builtin::location(path);
        match parser::parse(&location, source) {
            Ok(file) => Some(file),
            Err(e) => {
                errors.error(DiagnosticCode::ParseFailure, Some(&location), e.to_string());
                Some(ProtoFile::empty(location))
            }
        }
    }
}

impl Loader for SchemaLoader<'_> {
    fn load(&mut self, path: &str, errors: &mut ErrorCollector) -> ProtoFile {
        if let Some(&index) = self.source_index.get(path) {
            return self.source_files[index].clone();
        }

        let matches: Vec<ProtoFilePath> = self
            .proto_roots
            .iter()
            .filter_map(|root| root.resolve(path, self.fs))
            .collect();

        match matches.as_slice() {
            [] => {
                if let Some(file) = self.load_builtin(path, errors) {
                    debug!(path, "Loaded built-in file");
                    return file;
                }
                let mut diagnostic = Diagnostic::new(DiagnosticCode::PathNotFound, format!("unable to find {}", path))
                    .with_context(format!("searching {} proto paths:", self.proto_roots.len()));
                for root in &self.proto_roots {
                    diagnostic = diagnostic.with_context(format!("  {}", root.base()));
                }
                errors.push(diagnostic);
                ProtoFile::empty(Location::get(path))
            }
            [only] => self.parse(only, errors),
            [first, ..] => {
                let mut diagnostic = Diagnostic::new(DiagnosticCode::AmbiguousImport, format!("{} is ambiguous:", path));
                for candidate in &matches {
                    diagnostic = diagnostic.with_context(candidate.location.to_string());
                }
                errors.push(diagnostic);
                self.parse(first, errors)
            }
        }
    }

    fn proto_path_imports(&mut self, errors: &mut ErrorCollector) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut imports = Vec::new();
        for root in &self.proto_roots {
            match root.all_proto_files(self.fs) {
                Ok(paths) => {
                    for path in paths {
                        if seen.insert(path.location.path.clone()) {
                            imports.push(path.location.path);
                        }
                    }
                }
                Err(e) => {
                    errors.error(DiagnosticCode::PathNotFound, None, format!("unable to read {}: {}", root.base(), e));
                }
            }
        }
        imports
    }
}

/// A file must sit at the path its package (or root-relative location) implies
fn check_import_path(file: &ProtoFile, errors: &mut ErrorCollector) {
    let import_path = file.import_path();
    let path = &file.location.path;
    if path != &import_path && !path.ends_with(&format!("/{}", import_path)) {
        errors.error(
            DiagnosticCode::ImportPathMismatch,
            Some(&file.location),
            format!("expected {} to have a path ending with {}", path, import_path),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::schema::ProtoType;

    fn loader_with<'a>(fs: &'a MemoryFileSystem, source: &[&str], proto: &[&str]) -> SchemaLoader<'a> {
        let mut loader = SchemaLoader::new(fs);
        let source: Vec<Location> = source.iter().map(|path| Location::get(*path)).collect();
        let proto: Vec<Location> = proto.iter().map(|path| Location::get(*path)).collect();
        loader.init_roots(&source, &proto).unwrap();
        loader
    }

    #[test]
    fn test_source_files_are_marked() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/squareup/a.proto", "package squareup; message A {}");
        let mut loader = loader_with(&fs, &["src"], &[]);
        let mut errors = ErrorCollector::new();

        let files = loader.load_source_path_files(&mut errors);
        assert!(errors.is_empty());
        assert_eq!(files.len(), 1);
        assert!(files[0].loaded_on_source_path);

        let again = loader.load("squareup/a.proto", &mut errors);
        assert!(again.loaded_on_source_path);
    }

    #[test]
    fn test_no_sources() {
        let fs = MemoryFileSystem::new();
        let mut loader = loader_with(&fs, &[], &[]);
        let mut errors = ErrorCollector::new();
        loader.load_source_path_files(&mut errors);
        let err = errors.throw_if_non_empty().unwrap_err();
        assert!(err.to_string().contains("no sources"));
    }

    #[test]
    fn test_duplicate_source_files() {
        let fs = MemoryFileSystem::new();
        fs.add_file("one/a.proto", "message A {}");
        fs.add_file("two/a.proto", "message A {}");
        let mut loader = loader_with(&fs, &["one", "two"], &[]);
        let mut errors = ErrorCollector::new();
        let files = loader.load_source_path_files(&mut errors);

        assert_eq!(files.len(), 1);
        let diagnostics = errors.diagnostics();
        assert_eq!(diagnostics.with_code(DiagnosticCode::AmbiguousImport).count(), 1);
        assert!(diagnostics.to_string().contains("a.proto is ambiguous:"));
    }

    #[test]
    fn test_unique_proto_path_match_is_parsed() {
        let fs = MemoryFileSystem::new();
        fs.add_file("lib/squareup/b.proto", "package squareup; message B {}");
        let mut loader = loader_with(&fs, &[], &["lib"]);
        let mut errors = ErrorCollector::new();

        let file = loader.load("squareup/b.proto", &mut errors);
        assert!(errors.is_empty());
        assert_eq!(file.location, Location::new("lib", "squareup/b.proto"));
        assert!(!file.loaded_on_source_path);
        assert_eq!(file.types.len(), 1);
    }

    #[test]
    fn test_ambiguous_import_loads_first_match() {
        let fs = MemoryFileSystem::new();
        fs.add_file("lib/squareup/b.proto", "package squareup; message B {}");
        fs.add_file("vendor/squareup/b.proto", "package squareup; message Vendored {}");
        let mut loader = loader_with(&fs, &[], &["lib", "vendor"]);
        let mut errors = ErrorCollector::new();

        let file = loader.load("squareup/b.proto", &mut errors);
        assert_eq!(file.location, Location::new("lib", "squareup/b.proto"));
        assert_eq!(file.types.len(), 1);
        assert_eq!(file.types[0].ty(), &ProtoType::get("squareup.B"));

        let diagnostics = errors.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.with_code(DiagnosticCode::AmbiguousImport).count(), 1);
        let message = diagnostics.to_string();
        assert!(message.contains("squareup/b.proto is ambiguous:"));
        assert!(message.contains("lib/squareup/b.proto"));
        assert!(message.contains("vendor/squareup/b.proto"));
    }

    #[test]
    fn test_import_path_mismatch_for_standalone_file() {
        let fs = MemoryFileSystem::new();
        fs.add_file("misplaced.proto", "package squareup.dinosaurs; message A {}");
        let mut loader = loader_with(&fs, &["misplaced.proto"], &[]);
        let mut errors = ErrorCollector::new();
        loader.load_source_path_files(&mut errors);

        let diagnostics = errors.throw_if_non_empty().unwrap_err();
        assert!(diagnostics
            .to_string()
            .contains("expected misplaced.proto to have a path ending with squareup/dinosaurs/misplaced.proto"));
    }

    #[test]
    fn test_parse_failure_yields_placeholder() {
        let fs = MemoryFileSystem::new();
        fs.add_file("lib/broken.proto", "message {");
        let mut loader = loader_with(&fs, &[], &["lib"]);
        let mut errors = ErrorCollector::new();

        let file = loader.load("broken.proto", &mut errors);
        assert!(file.is_empty());
        assert_eq!(errors.diagnostics().with_code(DiagnosticCode::ParseFailure).count(), 1);
    }

    #[test]
    fn test_proto_path_imports_are_deduplicated() {
        let fs = MemoryFileSystem::new();
        fs.add_file("a/x.proto", "");
        fs.add_file("b/x.proto", "");
        fs.add_file("b/y.proto", "");
        let mut loader = loader_with(&fs, &[], &["a", "b"]);
        let mut errors = ErrorCollector::new();
        assert_eq!(loader.proto_path_imports(&mut errors), vec!["x.proto", "y.proto"]);
    }
}
