//! Configuration management for the schema compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (wire.toml)
//! - Environment variables (WIRE__*)
//!
//! ## Example config file (wire.toml):
//! ```toml
//! [compiler]
//! source_path = ["src/main/proto"]
//! proto_path = ["third_party/proto", { base = "deps/protos.tar", path = "google/type/date.proto" }]
//! permit_package_cycles = false
//!
//! [[targets]]
//! type = "java"
//! out_directory = "build/generated/java"
//! includes = ["squareup.dinosaurs.*"]
//!
//! [[targets]]
//! type = "kotlin"
//! out_directory = "build/generated/kotlin"
//! rpc_role = "server"
//! ```

use std::path::Path;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::codegen::{ModuleContext, Target};
use crate::location::Location;
use crate::run::WireRun;

/// Main configuration for the schema compiler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Loader and linker settings
    #[serde(default)]
    pub compiler: CompilerSection,

    /// Backends, in claim order
    #[serde(default)]
    pub targets: Vec<Target>,

    /// Set when this run is one module of a multi-module build
    #[serde(default)]
    pub module: Option<ModuleContext>,
}

/// Loader and linker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerSection {
    #[serde(default)]
    pub source_path: Vec<RootSpec>,

    #[serde(default)]
    pub proto_path: Vec<RootSpec>,

    #[serde(default)]
    pub permit_package_cycles: bool,

    /// Load every proto path file, not only the import closure
    #[serde(default)]
    pub load_exhaustively: bool,

    #[serde(default)]
    pub dry_run: bool,
}

/// A root as written in config: a bare path, or a file inside a base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RootSpec {
    Path(String),
    Located { base: String, path: String },
}

impl RootSpec {
    pub fn to_location(&self) -> Location {
        match self {
            RootSpec::Path(path) => Location::get(path.as_str()),
            RootSpec::Located { base, path } => Location::new(base.as_str(), path.as_str()),
        }
    }
}

impl From<&str> for RootSpec {
    fn from(path: &str) -> Self {
        RootSpec::Path(path.to_string())
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["wire.toml", ".wire.toml", "config/wire.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "wire", "wire-schema") {
            let xdg_config = config_dir.config_dir().join("wire.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("WIRE").separator("__").try_parsing(true));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn into_run(self) -> WireRun {
        WireRun {
            source_path: self.compiler.source_path.iter().map(RootSpec::to_location).collect(),
            proto_path: self.compiler.proto_path.iter().map(RootSpec::to_location).collect(),
            targets: self.targets,
            module: self.module,
            permit_package_cycles: self.compiler.permit_package_cycles,
            load_exhaustively: self.compiler.load_exhaustively,
            dry_run: self.compiler.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{RpcRole, TargetKind};

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert!(config.targets.is_empty());
        assert!(!config.compiler.permit_package_cycles);
    }

    #[test]
    fn test_parse_config() {
        let config: CompilerConfig = toml::from_str(
            r#"
            [compiler]
            source_path = ["src/main/proto"]
            proto_path = ["third_party", { base = "deps.tar", path = "a/b.proto" }]

            [[targets]]
            type = "java"
            out_directory = "gen/java"
            includes = ["squareup.*"]

            [[targets]]
            type = "kotlin"
            out_directory = "gen/kotlin"
            rpc_role = "none"
            exclusive = false
            "#,
        )
        .unwrap();

        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].includes, vec!["squareup.*"]);
        assert_eq!(config.targets[1].kind, TargetKind::Kotlin { rpc_role: RpcRole::None });
        assert!(!config.targets[1].exclusive);

        let run = config.into_run();
        assert_eq!(run.source_path, vec![Location::get("src/main/proto")]);
        assert_eq!(run.proto_path[1], Location::new("deps.tar", "a/b.proto"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wire.toml");
        let config = CompilerConfig {
            compiler: CompilerSection {
                source_path: vec!["src".into()],
                ..Default::default()
            },
            targets: vec![Target::swift("gen/swift")],
            module: None,
        };
        config.save(&path).unwrap();

        let loaded = CompilerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.targets, config.targets);
        assert_eq!(loaded.compiler.source_path, config.compiler.source_path);
    }
}
