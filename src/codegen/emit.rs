//! Language Stub Emitters
//!
//! Skeletal Java, Kotlin, and Swift output: one file per top-level type,
//! service, or extension field, carrying the declaration's shape (fields,
//! constants, rpcs) and any profile annotations. Types retargeted by the
//! profile or generated upstream are declined.

use std::fmt::Write;
use std::path::PathBuf;

use tracing::debug;

use super::config::{Language, RenderProfile};
use super::names::{output_package, output_path, relative_name, to_camel_case, to_pascal_case, NameResolver};
use super::{Declaration, HandlerContext, RpcRole, SchemaHandler, GENERATED_MARKER};
use crate::error::Result;
use crate::location::Location;
use crate::schema::{EnumType, Extend, Field, MessageType, ProtoFile, ProtoType, Rpc, Service, Type};

const INDENT: &str = "  ";

/// Handler for the built-in language targets
pub struct LanguageHandler<'a> {
    ctx: HandlerContext<'a>,
    render: RenderProfile,
    rpc_role: RpcRole,
}

impl<'a> LanguageHandler<'a> {
    pub fn new(ctx: HandlerContext<'a>, render: RenderProfile, rpc_role: RpcRole) -> Self {
        Self { ctx, render, rpc_role }
    }

    fn resolver(&self) -> NameResolver<'_> {
        NameResolver::new(self.ctx.schema, &self.render, &self.ctx.profile, self.ctx.upstream_types())
    }

    fn header(&self, file: &ProtoFile, location: &Location, line: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.render.comment(GENERATED_MARKER));
        let _ = writeln!(out, "{}", self.render.comment(&format!("Source: {}", location.at_line(line))));
        if self.render.language != Language::Swift {
            if let Some(package) = output_package(file, &self.render) {
                out.push('\n');
                match self.render.language {
                    Language::Java => {
                        let _ = writeln!(out, "package {};", package);
                    }
                    _ => {
                        let _ = writeln!(out, "package {}", package);
                    }
                }
            }
        }
        out.push('\n');
        out
    }

    fn documentation(&self, out: &mut String, depth: usize, documentation: &str) {
        if documentation.is_empty() {
            return;
        }
        let indent = INDENT.repeat(depth);
        for line in documentation.lines() {
            let _ = writeln!(out, "{}{}", indent, self.render.comment(line.trim()).trim_end());
        }
    }

    fn field_name(&self, field: &Field) -> String {
        self.render.escape_keyword(&to_camel_case(&field.name))
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn render_type(&self, out: &mut String, ty: &Type, depth: usize) {
        self.documentation(out, depth, ty.documentation());
        let indent = INDENT.repeat(depth);
        for annotation in self.ctx.profile.annotations(ty.ty()) {
            let marker = if annotation.starts_with('@') { "" } else { "@" };
            let _ = writeln!(out, "{}{}{}", indent, marker, annotation);
        }
        match ty {
            Type::Message(message) => self.render_message(out, message, depth),
            Type::Enum(enum_type) => self.render_enum(out, enum_type, depth),
        }
    }

    fn render_message(&self, out: &mut String, message: &MessageType, depth: usize) {
        let indent = INDENT.repeat(depth);
        let inner = INDENT.repeat(depth + 1);
        let name = message.ty.simple_name();
        let resolver = self.resolver();
        let nested = if depth > 0 { "static " } else { "" };

        match self.render.language {
            Language::Java => {
                let _ = writeln!(out, "{}public {}final class {} {{", indent, nested, name);
                for field in message.all_fields() {
                    let _ = writeln!(
                        out,
                        "{}public final {} {};",
                        inner,
                        resolver.field_type(field),
                        self.field_name(field)
                    );
                }
            }
            Language::Kotlin => {
                let _ = writeln!(out, "{}public class {}(", indent, name);
                for field in message.all_fields() {
                    let default = if field.is_repeated() { "emptyList()" } else { "null" };
                    let _ = writeln!(
                        out,
                        "{}public val {}: {} = {},",
                        inner,
                        self.field_name(field),
                        resolver.field_type(field),
                        default
                    );
                }
                let _ = writeln!(out, "{}) {{", indent);
            }
            Language::Swift => {
                let _ = writeln!(out, "{}public struct {} {{", indent, name);
                for field in message.all_fields() {
                    let _ = writeln!(
                        out,
                        "{}public var {}: {}",
                        inner,
                        self.field_name(field),
                        resolver.field_type(field)
                    );
                }
            }
        }
        for nested_type in &message.nested_types {
            out.push('\n');
            self.render_type(out, nested_type, depth + 1);
        }
        let _ = writeln!(out, "{}}}", indent);
    }

    fn render_enum(&self, out: &mut String, enum_type: &EnumType, depth: usize) {
        let indent = INDENT.repeat(depth);
        let inner = INDENT.repeat(depth + 1);
        let name = enum_type.ty.simple_name();

        match self.render.language {
            Language::Java => {
                let _ = writeln!(out, "{}public enum {} {{", indent, name);
                for constant in &enum_type.constants {
                    let _ = writeln!(out, "{}{}({}),", inner, constant.name, constant.tag);
                }
                let _ = writeln!(out, "{};", inner);
                let _ = writeln!(out);
                let _ = writeln!(out, "{}public final int value;", inner);
                let _ = writeln!(out);
                let _ = writeln!(out, "{}{}(int value) {{", inner, name);
                let _ = writeln!(out, "{}{}this.value = value;", inner, INDENT);
                let _ = writeln!(out, "{}}}", inner);
            }
            Language::Kotlin => {
                let _ = writeln!(out, "{}public enum class {}(public val value: Int) {{", indent, name);
                for constant in &enum_type.constants {
                    let _ = writeln!(out, "{}{}({}),", inner, constant.name, constant.tag);
                }
                let _ = writeln!(out, "{};", inner);
            }
            Language::Swift => {
                let _ = writeln!(out, "{}public enum {} : Int32 {{", indent, name);
                for constant in &enum_type.constants {
                    let _ = writeln!(out, "{}case {} = {}", inner, constant.name, constant.tag);
                }
            }
        }
        let _ = writeln!(out, "{}}}", indent);
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    fn rpc_type(&self, ty: Option<&ProtoType>, element: &str) -> String {
        match ty {
            Some(ty) => self.resolver().resolve(ty).name,
            None => element.to_string(),
        }
    }

    fn render_rpc(&self, out: &mut String, rpc: &Rpc) {
        let request = self.rpc_type(rpc.request_type.as_ref(), &rpc.request_element);
        let response = self.rpc_type(rpc.response_type.as_ref(), &rpc.response_element);
        let method = self.render.escape_keyword(&to_camel_case(&rpc.name));
        self.documentation(out, 1, &rpc.documentation);

        let streaming = rpc.request_streaming || rpc.response_streaming;
        match (self.render.language, self.rpc_role) {
            (Language::Java, _) => {
                let call = if streaming { "GrpcStreamingCall" } else { "GrpcCall" };
                let _ = writeln!(out, "{}{}<{}, {}> {}();", INDENT, call, request, response, method);
            }
            (Language::Kotlin, RpcRole::Server) => {
                let request = if rpc.request_streaming { format!("ReceiveChannel<{}>", request) } else { request };
                let response = if rpc.response_streaming { format!("SendChannel<{}>", response) } else { response };
                let _ = writeln!(out, "{}public suspend fun {}(request: {}): {}", INDENT, method, request, response);
            }
            (Language::Kotlin, _) => {
                let call = if streaming { "GrpcStreamingCall" } else { "GrpcCall" };
                let _ = writeln!(out, "{}public fun {}(): {}<{}, {}>", INDENT, method, call, request, response);
            }
            (Language::Swift, _) => {}
        }
    }

    fn service_suffix(&self) -> Option<&'static str> {
        match (self.render.language, self.rpc_role) {
            (Language::Swift, _) | (_, RpcRole::None) => None,
            (Language::Java, _) | (Language::Kotlin, RpcRole::Client) => Some("Client"),
            (Language::Kotlin, RpcRole::Server) => Some("Server"),
        }
    }
}

impl<'a> SchemaHandler for LanguageHandler<'a> {
    fn handle_type(&mut self, ty: &Type, file: &ProtoFile) -> Result<Option<PathBuf>> {
        let proto_type = ty.ty();
        if self.ctx.profile.target(proto_type).is_some() {
            debug!(ty = %proto_type, "Retargeted by profile, skipping");
            return Ok(None);
        }
        if self.ctx.upstream_types().contains_key(proto_type) {
            debug!(ty = %proto_type, "Generated upstream, skipping");
            return Ok(None);
        }

        let mut out = self.header(file, ty.location(), ty.line());
        self.render_type(&mut out, ty, 0);
        let relative = output_path(file, &relative_name(file, proto_type), &self.render);
        self.ctx
            .write_file(&Declaration::for_type(proto_type), &relative, &out)
            .map(Some)
    }

    fn handle_service(&mut self, service: &Service, file: &ProtoFile) -> Result<Vec<PathBuf>> {
        let Some(suffix) = self.service_suffix() else {
            return Ok(Vec::new());
        };
        let name = format!("{}{}", relative_name(file, &service.ty), suffix);

        let mut out = self.header(file, &service.location, service.line);
        self.documentation(&mut out, 0, &service.documentation);
        let _ = writeln!(out, "public interface {} {{", name);
        for rpc in &service.rpcs {
            self.render_rpc(&mut out, rpc);
        }
        out.push_str("}\n");

        let relative = output_path(file, &name, &self.render);
        let path = self
            .ctx
            .write_file(&Declaration::for_service(&service.ty), &relative, &out)?;
        Ok(vec![path])
    }

    fn handle_extension(&mut self, extend: &Extend, field: &Field, file: &ProtoFile) -> Result<Option<PathBuf>> {
        if self.render.language == Language::Swift {
            return Ok(None);
        }
        let name = format!("{}Option", to_pascal_case(&field.name));
        let extended = extend
            .ty
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| extend.element_type.clone());
        let value_type = self.resolver().field_type(field);

        let mut out = self.header(file, &extend.location, field.line);
        self.documentation(&mut out, 0, &field.documentation);
        let _ = writeln!(out, "{}", self.render.comment(&format!("Extends {} with tag {}", extended, field.tag)));
        match self.render.language {
            Language::Java => {
                let _ = writeln!(out, "public @interface {} {{", name);
                let _ = writeln!(out, "{}{} value();", INDENT, value_type);
                out.push_str("}\n");
            }
            _ => {
                let _ = writeln!(out, "public annotation class {}(", name);
                let _ = writeln!(out, "{}val value: {},", INDENT, value_type);
                out.push_str(")\n");
            }
        }

        let relative = output_path(file, &name, &self.render).with_extension("ext");
        let declaration = Declaration::for_extension(extend, field, file.package_name.as_deref());
        self.ctx.write_file(&declaration, &relative, &out).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ClaimedPaths;
    use crate::diagnostics::ErrorCollector;
    use crate::fs::{FileSystem, MemoryFileSystem};
    use crate::loader::SchemaLoader;
    use crate::profile::Profile;
    use crate::schema::Schema;
    use std::path::Path;

    const DINOSAUR: &str = r#"
        syntax = "proto2";
        package squareup.dinosaurs;
        option java_package = "com.squareup.dinosaurs";

        // A prehistoric animal.
        message Dinosaur {
          optional string name = 1;
          repeated string picture_urls = 2;
          optional Period period = 3;
        }

        enum Period {
          JURASSIC = 1;
          CRETACEOUS = 2;
        }

        service DinosaurService {
          rpc GetDinosaur (Dinosaur) returns (Dinosaur);
        }
    "#;

    fn schema(fs: &MemoryFileSystem) -> Schema {
        fs.add_file("src/squareup/dinosaurs/dinosaur.proto", DINOSAUR);
        let mut loader = SchemaLoader::new(fs);
        loader.init_roots(&[Location::get("src")], &[]).unwrap();
        loader.load_schema(false, false).unwrap()
    }

    fn dinosaur_file(schema: &Schema) -> &ProtoFile {
        schema.proto_file("squareup/dinosaurs/dinosaur.proto").unwrap()
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
            out_directory: PathBuf::from("out"),
            profile: Profile::default(),
            module: None,
            dry_run: false,
            errors,
            claimed_paths,
        }
    }

    #[test]
    fn test_java_type_file() {
        let fs = MemoryFileSystem::new();
        let schema = schema(&fs);
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let file = dinosaur_file(&schema);
        let ctx = context(&schema, &fs, &mut errors, &mut claimed_paths);
        let mut handler = LanguageHandler::new(ctx, RenderProfile::java(), RpcRole::Client);

        let path = handler.handle_type(&file.types[0], file).unwrap().unwrap();
        assert_eq!(path, PathBuf::from("out/com/squareup/dinosaurs/Dinosaur.java"));

        let contents = fs.read_to_string(&path).unwrap();
        assert!(contents.starts_with("// Code generated by wire-schema. Do not edit."));
        assert!(contents.contains("package com.squareup.dinosaurs;"));
        assert!(contents.contains("// A prehistoric animal."));
        assert!(contents.contains("public final List<String> pictureUrls;"));
        assert!(contents.contains("public final @Nullable com.squareup.dinosaurs.Period period;"));
    }

    #[test]
    fn test_kotlin_server_service() {
        let fs = MemoryFileSystem::new();
        let schema = schema(&fs);
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let file = dinosaur_file(&schema);
        let ctx = context(&schema, &fs, &mut errors, &mut claimed_paths);
        let mut handler = LanguageHandler::new(ctx, RenderProfile::kotlin(), RpcRole::Server);

        let paths = handler.handle_service(&file.services[0], file).unwrap();
        assert_eq!(paths, vec![PathBuf::from("out/com/squareup/dinosaurs/DinosaurServiceServer.kt")]);
        let contents = fs.read_to_string(&paths[0]).unwrap();
        assert!(contents.contains("public suspend fun getDinosaur("));
    }

    #[test]
    fn test_kotlin_without_rpc_role_declines_services() {
        let fs = MemoryFileSystem::new();
        let schema = schema(&fs);
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let file = dinosaur_file(&schema);
        let ctx = context(&schema, &fs, &mut errors, &mut claimed_paths);
        let mut handler = LanguageHandler::new(ctx, RenderProfile::kotlin(), RpcRole::None);

        assert!(handler.handle_service(&file.services[0], file).unwrap().is_empty());
        assert_eq!(fs.paths().len(), 1);
    }

    #[test]
    fn test_swift_enum() {
        let fs = MemoryFileSystem::new();
        let schema = schema(&fs);
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let file = dinosaur_file(&schema);
        let ctx = context(&schema, &fs, &mut errors, &mut claimed_paths);
        let mut handler = LanguageHandler::new(ctx, RenderProfile::swift(), RpcRole::None);

        let path = handler.handle_type(&file.types[1], file).unwrap().unwrap();
        assert_eq!(path, PathBuf::from("out/squareup/dinosaurs/Period.swift"));
        let contents = fs.read_to_string(Path::new("out/squareup/dinosaurs/Period.swift")).unwrap();
        assert!(contents.contains("case CRETACEOUS = 2"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let fs = MemoryFileSystem::new();
        let schema = schema(&fs);
        let mut errors = ErrorCollector::new();
        let mut claimed_paths = ClaimedPaths::new();
        let file = dinosaur_file(&schema);
        let mut ctx = context(&schema, &fs, &mut errors, &mut claimed_paths);
        ctx.dry_run = true;
        let mut handler = LanguageHandler::new(ctx, RenderProfile::java(), RpcRole::Client);

        let path = handler.handle_type(&file.types[0], file).unwrap().unwrap();
        assert_eq!(fs.paths().len(), 1);
        drop(handler);
        assert_eq!(
            claimed_paths.owner(&path),
            Some(&Declaration::for_type(&ProtoType::get("squareup.dinosaurs.Dinosaur")))
        );
    }
}
