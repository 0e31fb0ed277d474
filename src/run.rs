//! Run Orchestration
//!
//! One [`WireRun`] loads and links the schema, loads every profile the
//! targets need, then offers the schema to each target in order. Claim state
//! lives here; each handler borrows it for the duration of its target.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codegen::{
    ClaimedDefinitions, ClaimedPaths, EmittingRules, HandlerContext, HandlerRegistry, ModuleContext, Target,
};
use crate::diagnostics::ErrorCollector;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::loader::SchemaLoader;
use crate::location::Location;
use crate::profile::Profile;

/// Everything one compiler invocation needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireRun {
    /// Roots whose files are always generated
    pub source_path: Vec<Location>,
    /// Roots searched for imports
    pub proto_path: Vec<Location>,
    /// Backends, in the order they get to claim declarations
    pub targets: Vec<Target>,
    pub module: Option<ModuleContext>,
    pub permit_package_cycles: bool,
    pub load_exhaustively: bool,
    pub dry_run: bool,
}

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub targets: Vec<TargetReport>,
    /// Declarations taken by exclusive targets
    pub claimed_definitions: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: String,
    pub out_directory: PathBuf,
    /// Files this target produced (or would have, in a dry run)
    pub written: Vec<PathBuf>,
}

impl RunReport {
    /// Every produced path, in production order
    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.targets.iter().flat_map(|target| target.written.iter())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl WireRun {
    pub fn new(source_path: Vec<Location>, proto_path: Vec<Location>, targets: Vec<Target>) -> Self {
        Self {
            source_path,
            proto_path,
            targets,
            ..Default::default()
        }
    }

    /// Load, link, and generate.
    ///
    /// Load, link, and profile problems surface together at each phase's
    /// checkpoint as [`SchemaError::Diagnostics`](crate::SchemaError::Diagnostics).
    /// Write failures and path collisions stop the run immediately.
    pub fn execute(&self, fs: &dyn FileSystem, registry: &HandlerRegistry) -> Result<RunReport> {
        info!(
            sources = self.source_path.len(),
            proto_paths = self.proto_path.len(),
            targets = self.targets.len(),
            "Starting run"
        );

        let mut loader = SchemaLoader::new(fs);
        loader.init_roots(&self.source_path, &self.proto_path)?;
        let schema = loader.load_schema(self.permit_package_cycles, self.load_exhaustively)?;
        info!(files = schema.proto_files().len(), types = schema.type_count(), "Linked schema");

        let mut errors = ErrorCollector::new();
        let mut profiles: BTreeMap<String, Profile> = BTreeMap::new();
        for name in self.targets.iter().filter_map(Target::profile_name) {
            if !profiles.contains_key(name) {
                let profile = loader.load_profile(name, &schema, &mut errors);
                debug!(profile = name, files = profile.files.len(), "Loaded profile");
                profiles.insert(name.to_string(), profile);
            }
        }
        errors.throw_if_non_empty()?;

        let mut claimed_definitions = ClaimedDefinitions::new();
        let mut claimed_paths = ClaimedPaths::new();
        let mut reports = Vec::with_capacity(self.targets.len());
        let mut used_rules: Vec<(String, EmittingRules)> = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let mark = claimed_paths.mark();
            let rules = target.emitting_rules();
            let explicit = rules.explicit();
            let out_directory = match &self.module {
                Some(module) => target.out_directory.join(&module.name),
                None => target.out_directory.clone(),
            };
            let profile = target
                .profile_name()
                .and_then(|name| profiles.get(name))
                .cloned()
                .unwrap_or_default();

            {
                let ctx = HandlerContext {
                    schema: &schema,
                    fs,
                    out_directory: out_directory.clone(),
                    profile,
                    module: self.module.clone(),
                    dry_run: self.dry_run,
                    errors: &mut errors,
                    claimed_paths: &mut claimed_paths,
                };
                let mut handler = target.new_handler(ctx, registry)?;
                let is_exclusive = target.is_exclusive();

                for file in schema.proto_files() {
                    let file_rules = if file.loaded_on_source_path {
                        &rules
                    } else if explicit.has_includes() {
                        &explicit
                    } else {
                        continue;
                    };
                    handler.handle_file(file, file_rules, &mut claimed_definitions, is_exclusive)?;
                }
            }
            errors.throw_if_non_empty()?;

            let written = claimed_paths.since(mark);
            info!(target_name = target.name(), files = written.len(), "Target finished");
            reports.push(TargetReport {
                target: target.name().to_string(),
                out_directory,
                written,
            });
            used_rules.push((target.name().to_string(), rules));
        }

        for (name, rules) in &used_rules {
            rules.log_unused(name);
        }

        Ok(RunReport {
            targets: reports,
            claimed_definitions: claimed_definitions.len(),
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_module_name_nests_output() {
        let fs = MemoryFileSystem::new();
        fs.add_file("src/a/a.proto", "package a; message A {}");
        let mut run = WireRun::new(vec![Location::get("src")], vec![], vec![Target::swift("out")]);
        run.module = Some(ModuleContext {
            name: "common".to_string(),
            upstream_types: BTreeMap::new(),
        });

        let report = run.execute(&fs, &HandlerRegistry::new()).unwrap();
        assert_eq!(report.targets[0].written, vec![PathBuf::from("out/common/a/A.swift")]);
        assert_eq!(report.claimed_definitions, 1);
    }

    #[test]
    fn test_report_serializes() {
        let report = RunReport {
            targets: vec![TargetReport {
                target: "java".to_string(),
                out_directory: PathBuf::from("out"),
                written: vec![PathBuf::from("out/A.java")],
            }],
            claimed_definitions: 1,
            dry_run: false,
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"claimed_definitions\": 1"));
        assert_eq!(report.written().count(), 1);
    }
}
