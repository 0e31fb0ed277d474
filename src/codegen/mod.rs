//! Code Generation Targets
//!
//! A [`Target`] describes one backend run: which declarations it wants, whether
//! it takes them exclusively, and where its output goes. Each target produces
//! a [`SchemaHandler`] that is offered every eligible file of the linked
//! schema, in target order, sharing claim state with the other targets.
//!
//! Architecture:
//! - Target: serializable configuration (closed set of backend kinds)
//! - HandlerContext: everything a handler may read or write during a run
//! - SchemaHandler: per-declaration generation plus the claim-aware batch
//! - HandlerRegistry: factories for `custom` backends

pub mod claims;
pub mod config;
pub mod emit;
pub mod names;
pub mod proto;
pub mod registry;
pub mod rules;

pub use claims::{ClaimedDefinitions, ClaimedPaths, Declaration};
pub use config::{Language, RenderProfile};
pub use registry::{HandlerRegistry, SchemaHandlerFactory};
pub use rules::EmittingRules;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::ErrorCollector;
use crate::error::{Result, SchemaError};
use crate::fs::FileSystem;
use crate::profile::Profile;
use crate::schema::{Extend, Field, ProtoFile, ProtoType, Schema, Service, Type};
use emit::LanguageHandler;
use proto::ProtoHandler;

/// Line every generated file starts with
pub const GENERATED_MARKER: &str = "Code generated by wire-schema. Do not edit.";

// =============================================================================
// Target
// =============================================================================

/// One code generation backend and its scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Identifier rules for declarations to generate; empty means `*`
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,

    /// Identifier rules for declarations to skip
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Claim generated declarations so later targets skip them
    #[serde(default = "default_true")]
    pub exclusive: bool,

    pub out_directory: PathBuf,

    #[serde(flatten)]
    pub kind: TargetKind,
}

/// Backend kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetKind {
    Java,
    Kotlin {
        #[serde(default)]
        rpc_role: RpcRole,
    },
    Swift,
    /// Re-emit the schema files themselves; rules pick which files pass through
    Proto,
    /// A backend registered in the [`HandlerRegistry`]
    Custom {
        factory: String,
        #[serde(default)]
        options: BTreeMap<String, String>,
        /// Profile name to load, if any
        #[serde(default)]
        profile: Option<String>,
    },
}

/// Which side of a service Kotlin generates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcRole {
    #[default]
    Client,
    Server,
    /// Services are skipped
    None,
}

/// Partial settings layered over a target with [`Target::with_overrides`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetOverrides {
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub exclusive: Option<bool>,
    pub out_directory: Option<PathBuf>,
}

fn default_includes() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

impl Target {
    pub fn new(kind: TargetKind, out_directory: impl Into<PathBuf>) -> Self {
        let exclusive = !matches!(kind, TargetKind::Proto);
        Self {
            includes: default_includes(),
            excludes: Vec::new(),
            exclusive,
            out_directory: out_directory.into(),
            kind,
        }
    }

    pub fn java(out_directory: impl Into<PathBuf>) -> Self {
        Self::new(TargetKind::Java, out_directory)
    }

    pub fn kotlin(out_directory: impl Into<PathBuf>) -> Self {
        Self::new(TargetKind::Kotlin { rpc_role: RpcRole::Client }, out_directory)
    }

    pub fn swift(out_directory: impl Into<PathBuf>) -> Self {
        Self::new(TargetKind::Swift, out_directory)
    }

    pub fn proto(out_directory: impl Into<PathBuf>) -> Self {
        Self::new(TargetKind::Proto, out_directory)
    }

    pub fn custom(factory: impl Into<String>, out_directory: impl Into<PathBuf>) -> Self {
        Self::new(
            TargetKind::Custom {
                factory: factory.into(),
                options: BTreeMap::new(),
                profile: None,
            },
            out_directory,
        )
    }

    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// A copy with every set override applied
    pub fn with_overrides(&self, overrides: TargetOverrides) -> Self {
        let mut target = self.clone();
        if let Some(includes) = overrides.includes {
            target.includes = includes;
        }
        if let Some(excludes) = overrides.excludes {
            target.excludes = excludes;
        }
        if let Some(exclusive) = overrides.exclusive {
            target.exclusive = exclusive;
        }
        if let Some(out_directory) = overrides.out_directory {
            target.out_directory = out_directory;
        }
        target
    }

    /// Passthrough targets never claim
    pub fn is_exclusive(&self) -> bool {
        self.exclusive && !matches!(self.kind, TargetKind::Proto)
    }

    /// Short name used in logs and reports
    pub fn name(&self) -> &str {
        match &self.kind {
            TargetKind::Java => "java",
            TargetKind::Kotlin { .. } => "kotlin",
            TargetKind::Swift => "swift",
            TargetKind::Proto => "proto",
            TargetKind::Custom { factory, .. } => factory,
        }
    }

    /// Name of the `<name>.wire` profile this target reads
    pub fn profile_name(&self) -> Option<&str> {
        match &self.kind {
            TargetKind::Java => Some(Language::Java.profile_name()),
            TargetKind::Kotlin { .. } => Some(Language::Kotlin.profile_name()),
            TargetKind::Swift => Some(Language::Swift.profile_name()),
            TargetKind::Proto => None,
            TargetKind::Custom { profile, .. } => profile.as_deref(),
        }
    }

    pub fn emitting_rules(&self) -> EmittingRules {
        EmittingRules::new(self.includes.clone(), self.excludes.clone())
    }

    /// Create this target's handler for one run
    pub fn new_handler<'a>(
        &self,
        ctx: HandlerContext<'a>,
        registry: &HandlerRegistry,
    ) -> Result<Box<dyn SchemaHandler + 'a>> {
        debug!(target_name = self.name(), out = %ctx.out_directory.display(), "Creating handler");
        match &self.kind {
            TargetKind::Java => Ok(Box::new(LanguageHandler::new(ctx, RenderProfile::java(), RpcRole::Client))),
            TargetKind::Kotlin { rpc_role } => {
                Ok(Box::new(LanguageHandler::new(ctx, RenderProfile::kotlin(), *rpc_role)))
            }
            TargetKind::Swift => Ok(Box::new(LanguageHandler::new(ctx, RenderProfile::swift(), RpcRole::None))),
            TargetKind::Proto => Ok(Box::new(ProtoHandler::new(ctx))),
            TargetKind::Custom { factory, options, .. } => registry.create(factory, options, ctx),
        }
    }
}

// =============================================================================
// Handler Context
// =============================================================================

/// A module of a multi-module build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleContext {
    pub name: String,
    /// Types an upstream module already generated, with their generated names
    #[serde(default)]
    pub upstream_types: BTreeMap<ProtoType, String>,
}

/// What a handler may read and write during a run
pub struct HandlerContext<'a> {
    pub schema: &'a Schema,
    pub fs: &'a dyn FileSystem,
    /// Target output directory, with the module name appended when set
    pub out_directory: PathBuf,
    pub profile: Profile,
    pub module: Option<ModuleContext>,
    /// Compute and claim paths without writing
    pub dry_run: bool,
    pub errors: &'a mut ErrorCollector,
    /// Output paths of every target so far; claimed before each write
    pub claimed_paths: &'a mut ClaimedPaths,
}

impl<'a> HandlerContext<'a> {
    /// Claim `relative` under the output directory for `declaration`, then
    /// write `contents` there.
    ///
    /// A path owned by another declaration fails with
    /// [`SchemaError::PathCollision`] and the existing file is left alone.
    /// Returns the full path whether or not anything was written.
    pub fn write_file(&mut self, declaration: &Declaration, relative: &Path, contents: &str) -> Result<PathBuf> {
        let path = self.out_directory.join(relative);
        self.claimed_paths.claim(path.clone(), declaration.clone())?;
        if self.dry_run {
            debug!(path = %path.display(), "Dry run, not writing");
            return Ok(path);
        }
        let wrap = |source: std::io::Error| SchemaError::Write {
            declaration: declaration.to_string(),
            out_directory: self.out_directory.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent).map_err(wrap)?;
        }
        self.fs.write(&path, contents.as_bytes()).map_err(wrap)?;
        debug!(path = %path.display(), %declaration, "Wrote file");
        Ok(path)
    }

    /// Upstream module types, empty when this is not a module build
    pub fn upstream_types(&self) -> &BTreeMap<ProtoType, String> {
        static EMPTY: BTreeMap<ProtoType, String> = BTreeMap::new();
        self.module.as_ref().map(|module| &module.upstream_types).unwrap_or(&EMPTY)
    }
}

// =============================================================================
// Schema Handler
// =============================================================================

/// Generates code for declarations offered by the run loop
pub trait SchemaHandler {
    /// Generate a top-level type; `None` declines it
    fn handle_type(&mut self, ty: &Type, file: &ProtoFile) -> Result<Option<PathBuf>>;

    /// Generate a service; an empty list declines it
    fn handle_service(&mut self, service: &Service, file: &ProtoFile) -> Result<Vec<PathBuf>>;

    /// Generate one extension field; `None` declines it
    fn handle_extension(&mut self, extend: &Extend, field: &Field, file: &ProtoFile) -> Result<Option<PathBuf>>;

    /// Offer every declaration of `file`, honoring and updating claims.
    ///
    /// Types and services are skipped when excluded by `rules`, and by an
    /// exclusive target when already claimed. Non-exclusive targets ignore
    /// claims. Extension fields are not subject to `rules`.
    fn handle_file(
        &mut self,
        file: &ProtoFile,
        rules: &EmittingRules,
        claimed_definitions: &mut ClaimedDefinitions,
        is_exclusive: bool,
    ) -> Result<()> {
        for ty in &file.types {
            let declaration = Declaration::for_type(ty.ty());
            if (is_exclusive && claimed_definitions.contains(&declaration)) || !rules.includes(ty.ty()) {
                continue;
            }
            self.handle_type(ty, file)?;
            if is_exclusive {
                claimed_definitions.claim(declaration);
            }
        }

        for service in &file.services {
            let declaration = Declaration::for_service(&service.ty);
            if (is_exclusive && claimed_definitions.contains(&declaration)) || !rules.includes(&service.ty) {
                continue;
            }
            self.handle_service(service, file)?;
            if is_exclusive {
                claimed_definitions.claim(declaration);
            }
        }

        // Extension fields are claimed before they are generated.
        for extend in &file.extend_list {
            for field in &extend.fields {
                let declaration = Declaration::for_extension(extend, field, file.package_name.as_deref());
                if is_exclusive && claimed_definitions.contains(&declaration) {
                    continue;
                }
                if is_exclusive {
                    claimed_definitions.claim(declaration);
                }
                self.handle_extension(extend, field, file)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_deserializes_with_defaults() {
        let target: Target = serde_json::from_str(r#"{"type": "java", "out_directory": "gen/java"}"#).unwrap();
        assert_eq!(target.kind, TargetKind::Java);
        assert_eq!(target.includes, vec!["*"]);
        assert!(target.exclusive);

        let kotlin: Target =
            serde_json::from_str(r#"{"type": "kotlin", "out_directory": "k", "rpc_role": "server"}"#).unwrap();
        assert_eq!(kotlin.kind, TargetKind::Kotlin { rpc_role: RpcRole::Server });
    }

    #[test]
    fn test_custom_target_deserializes() {
        let target: Target = serde_json::from_str(
            r#"{"type": "custom", "factory": "docs", "out_directory": "d", "options": {"title": "Dinos"}}"#,
        )
        .unwrap();
        assert_eq!(target.name(), "docs");
        assert_eq!(target.profile_name(), None);
        let TargetKind::Custom { options, .. } = &target.kind else {
            panic!("expected a custom target");
        };
        assert_eq!(options["title"], "Dinos");
    }

    #[test]
    fn test_with_overrides() {
        let target = Target::java("gen").with_excludes(["a.*"]);
        let overridden = target.with_overrides(TargetOverrides {
            includes: Some(vec!["b.*".to_string()]),
            exclusive: Some(false),
            ..Default::default()
        });
        assert_eq!(overridden.includes, vec!["b.*"]);
        assert_eq!(overridden.excludes, vec!["a.*"]);
        assert!(!overridden.exclusive);
        assert_eq!(overridden.out_directory, PathBuf::from("gen"));
        assert!(target.exclusive);
    }

    #[test]
    fn test_proto_target_is_never_exclusive() {
        assert!(!Target::proto("out").is_exclusive());
        assert!(!Target::proto("out").with_exclusive(true).is_exclusive());
        assert!(Target::swift("out").is_exclusive());
        assert_eq!(Target::kotlin("out").profile_name(), Some("java"));
    }
}
