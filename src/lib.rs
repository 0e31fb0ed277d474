//! Wire Schema Compiler
//!
//! Loader, linker, and multi-target orchestration for protobuf IDL schemas.
//!
//! ## Features
//!
//! - **Root Resolution**: Source and proto paths over directories, standalone files, and tar archives
//! - **Error Accumulation**: Every load/link/profile problem is reported in one pass
//! - **Linking**: Transitive import closure, type resolution, package cycle detection
//! - **Profiles**: Per-backend `<name>.wire` overrides found by directory ancestry
//! - **Claims**: Several backends share one schema without duplicating or dropping declarations
//!
//! ## Pipeline
//!
//! ```text
//! source_path + proto_path
//!        │
//!        ▼
//!   SchemaLoader ──► checkpoint
//!        │
//!        ▼
//!     Linker ──────► checkpoint
//!        │
//!        ▼
//!  ProfileLoader ──► checkpoint
//!        │
//!        ▼
//!  Target → SchemaHandler (per target, in order, sharing claim state)
//! ```

pub mod builtin;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod linker;
pub mod loader;
pub mod location;
pub mod parser;
pub mod profile;
pub mod root;
pub mod run;
pub mod schema;

pub use codegen::{
    ClaimedDefinitions, ClaimedPaths, Declaration, EmittingRules, HandlerContext,
    HandlerRegistry, ModuleContext, SchemaHandler, SchemaHandlerFactory, Target,
    TargetKind, TargetOverrides,
};
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, ErrorCollector};
pub use error::{Result, SchemaError};
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use linker::Linker;
pub use loader::{Loader, SchemaLoader};
pub use location::Location;
pub use profile::{Profile, ProfileFileElement, ProfileLoader, TypeConfig};
pub use root::{ProtoFilePath, Root};
pub use run::{RunReport, TargetReport, WireRun};
pub use schema::{
    EnumType, Extend, Field, MessageType, ProtoFile, ProtoType, Rpc, ScalarType, Schema,
    Service, Type,
};
