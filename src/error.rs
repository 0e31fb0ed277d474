//! Error types for the schema compiler

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema compiler errors
///
/// Resolution, link, and profile problems never surface here one at a time:
/// they accumulate in an [`ErrorCollector`](crate::ErrorCollector) and arrive
/// together as [`SchemaError::Diagnostics`] at a phase checkpoint.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error("Failed to write {declaration} to {}: {source}", out_directory.display())]
    Write {
        declaration: String,
        out_directory: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Same file {} is getting generated by different definitions:\n  {existing}\n  {claimant}", path.display())]
    PathCollision {
        path: PathBuf,
        existing: String,
        claimant: String,
    },

    #[error("No handler factory registered for custom backend '{0}'")]
    UnregisteredBackend(String),

    #[error(transparent)]
    Parse(#[from] crate::parser::ParseError),

    #[error("Invalid root {path}: {reason}")]
    InvalidRoot { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// The accumulated diagnostics, if this error came from a checkpoint
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            SchemaError::Diagnostics(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}
