//! Schema Passthrough
//!
//! Re-emits each offered file as `.proto` source under the output directory,
//! at its root-relative path. Passthrough output is a view of the schema, not
//! generated code for its declarations, so it neither honors nor records
//! declaration claims. A file is skipped when it declares types or services
//! and the target's rules include none of them.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ClaimedDefinitions, Declaration, EmittingRules, HandlerContext, SchemaHandler};
use crate::error::Result;
use crate::schema::{Extend, Field, ProtoFile, Service, Type};

pub struct ProtoHandler<'a> {
    ctx: HandlerContext<'a>,
}

impl<'a> ProtoHandler<'a> {
    pub fn new(ctx: HandlerContext<'a>) -> Self {
        Self { ctx }
    }
}

/// Whether `rules` include any declaration of `file`
fn includes_any(file: &ProtoFile, rules: &EmittingRules) -> bool {
    let mut declarations = file
        .types
        .iter()
        .map(|ty| ty.ty())
        .chain(file.services.iter().map(|service| &service.ty))
        .peekable();
    if declarations.peek().is_none() {
        return file.loaded_on_source_path;
    }
    // no short-circuit; every declaration marks the rules it matches
    declarations.fold(false, |any, ty| rules.includes(ty) || any)
}

impl<'a> SchemaHandler for ProtoHandler<'a> {
    fn handle_type(&mut self, _ty: &Type, _file: &ProtoFile) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn handle_service(&mut self, _service: &Service, _file: &ProtoFile) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn handle_extension(&mut self, _extend: &Extend, _field: &Field, _file: &ProtoFile) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn handle_file(
        &mut self,
        file: &ProtoFile,
        rules: &EmittingRules,
        _claimed_definitions: &mut ClaimedDefinitions,
        _is_exclusive: bool,
    ) -> Result<()> {
        if !includes_any(file, rules) {
            debug!(file = %file.location, "No included declarations, skipping");
            return Ok(());
        }
        debug!(file = %file.location, "Passing schema file through");
        let declaration = Declaration::File {
            path: file.location.path.clone(),
        };
        self.ctx
            .write_file(&declaration, Path::new(&file.location.path), &file.to_schema())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ClaimedPaths;
    use crate::diagnostics::ErrorCollector;
    use crate::fs::{FileSystem, MemoryFileSystem};
    use crate::location::Location;
    use crate::parser;
    use crate::profile::Profile;
    use crate::schema::{ProtoType, Schema};

    fn schema(source: &str) -> Schema {
        let mut file = parser::parse(&Location::new("src", "squareup/a.proto"), source).unwrap();
        file.loaded_on_source_path = true;
        Schema::from_files(vec![file])
    }

    fn context<'a>(
        schema: &'a Schema,
        fs: &'a MemoryFileSystem,
        errors: &'a mut ErrorCollector,
        claimed_paths: &'a mut ClaimedPaths,
    ) -> HandlerContext<'a> {
        HandlerContext {
            schema,
            fs,
            out_directory: PathBuf::from("proto-out"),
            profile: Profile::default(),
            module: None,
            dry_run: false,
            errors,
            claimed_paths,
        }
    }

    #[test]
    fn test_passthrough_ignores_claims() {
        let schema = schema("package squareup; message A { optional string name = 1; }");
        let fs = MemoryFileSystem::new();
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let mut handler = ProtoHandler::new(context(&schema, &fs, &mut errors, &mut claimed_paths));

        let mut claimed_definitions = ClaimedDefinitions::new();
        claimed_definitions.claim(Declaration::for_type(&ProtoType::get("squareup.A")));
        handler
            .handle_file(
                &schema.proto_files()[0],
                &EmittingRules::default(),
                &mut claimed_definitions,
                false,
            )
            .unwrap();
        drop(handler);

        let written = fs.read_to_string(Path::new("proto-out/squareup/a.proto")).unwrap();
        assert!(written.contains("message A {"));
        assert_eq!(claimed_definitions.len(), 1);
        assert_eq!(
            claimed_paths.owner(Path::new("proto-out/squareup/a.proto")),
            Some(&Declaration::File {
                path: "squareup/a.proto".to_string()
            })
        );
    }

    #[test]
    fn test_passthrough_skips_files_with_nothing_included() {
        let schema = schema("package squareup; message A {} message B {}");
        let fs = MemoryFileSystem::new();
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let mut handler = ProtoHandler::new(context(&schema, &fs, &mut errors, &mut claimed_paths));
        let file = &schema.proto_files()[0];

        let excluded = EmittingRules::new(vec!["*".to_string()], vec!["squareup.*".to_string()]);
        handler
            .handle_file(file, &excluded, &mut ClaimedDefinitions::new(), false)
            .unwrap();
        assert!(!fs.exists(Path::new("proto-out/squareup/a.proto")));

        let partly = EmittingRules::new(vec!["*".to_string()], vec!["squareup.A".to_string()]);
        handler
            .handle_file(file, &partly, &mut ClaimedDefinitions::new(), false)
            .unwrap();
        assert!(fs.exists(Path::new("proto-out/squareup/a.proto")));
    }
}
