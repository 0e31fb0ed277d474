//! Wire Schema Compiler CLI
//!
//! Loads and links a protobuf schema, then generates code for every
//! configured target.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wire_schema::codegen::TargetOverrides;
use wire_schema::{CompilerConfig, HandlerRegistry, LocalFileSystem, Location, SchemaError, Target, WireRun};

#[derive(Parser)]
#[command(name = "wire-compiler")]
#[command(about = "Compile protobuf schemas into Java, Kotlin, and Swift")]
struct Cli {
    /// Config file layered over wire.toml and WIRE__* variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directories, .proto files, or .tar archives whose files are generated
    #[arg(long = "source-path", value_delimiter = ',')]
    source_path: Vec<String>,

    /// Roots searched for imports
    #[arg(long = "proto-path", value_delimiter = ',')]
    proto_path: Vec<String>,

    #[arg(long)]
    java_out: Option<PathBuf>,

    #[arg(long)]
    kotlin_out: Option<PathBuf>,

    #[arg(long)]
    swift_out: Option<PathBuf>,

    /// Re-emit the linked schema files
    #[arg(long)]
    proto_out: Option<PathBuf>,

    /// Include rules applied to every target
    #[arg(long, value_delimiter = ',')]
    includes: Vec<String>,

    /// Exclude rules applied to every target
    #[arg(long, value_delimiter = ',')]
    excludes: Vec<String>,

    #[arg(long)]
    permit_package_cycles: bool,

    /// Load every file on the proto path
    #[arg(long)]
    load_exhaustively: bool,

    /// Compute outputs without writing them
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<SchemaError>().and_then(SchemaError::diagnostics) {
            Some(diagnostics) => eprintln!("{}", diagnostics.format_all()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CompilerConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut wire_run = config.into_run();
    apply_flags(&mut wire_run, &cli);

    if wire_run.targets.is_empty() {
        anyhow::bail!("No targets: pass --java-out, --kotlin-out, --swift-out, or --proto-out");
    }

    let registry = HandlerRegistry::new();
    let report = wire_run.execute(&LocalFileSystem, &registry)?;

    for target in &report.targets {
        println!(
            "{}: {} file(s) in {}",
            target.target,
            target.written.len(),
            target.out_directory.display()
        );
    }
    if report.dry_run {
        println!("(dry run, nothing written)");
    }

    if let Some(path) = &cli.report {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    Ok(())
}

/// Layer command-line flags over the configured run
fn apply_flags(wire_run: &mut WireRun, cli: &Cli) {
    if !cli.source_path.is_empty() {
        wire_run.source_path = cli.source_path.iter().map(|path| Location::get(path.as_str())).collect();
    }
    if !cli.proto_path.is_empty() {
        wire_run.proto_path = cli.proto_path.iter().map(|path| Location::get(path.as_str())).collect();
    }
    wire_run.permit_package_cycles |= cli.permit_package_cycles;
    wire_run.load_exhaustively |= cli.load_exhaustively;
    wire_run.dry_run |= cli.dry_run;

    let flag_targets = [
        cli.java_out.as_ref().map(Target::java),
        cli.kotlin_out.as_ref().map(Target::kotlin),
        cli.swift_out.as_ref().map(Target::swift),
        cli.proto_out.as_ref().map(Target::proto),
    ];
    wire_run.targets.extend(flag_targets.into_iter().flatten());

    let overrides = TargetOverrides {
        includes: (!cli.includes.is_empty()).then(|| cli.includes.clone()),
        excludes: (!cli.excludes.is_empty()).then(|| cli.excludes.clone()),
        ..Default::default()
    };
    if overrides != TargetOverrides::default() {
        wire_run.targets = wire_run
            .targets
            .iter()
            .map(|target| target.with_overrides(overrides.clone()))
            .collect();
    }
}
