//! Name Resolution
//!
//! Maps proto types to the names a target language uses for them, and
//! decides where each generated file lands. A type can come from three
//! places:
//! - a profile override (`target X using Adapter`),
//! - an upstream module that already generated it,
//! - this run, under its own name.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::config::RenderProfile;
use crate::profile::Profile;
use crate::schema::{Field, ProtoFile, ProtoType, Schema};

/// Where a referenced type comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Language builtin for a protobuf scalar
    Scalar,
    /// Replaced by a profile `target`
    Profile,
    /// Generated by an upstream module
    Upstream,
    /// Generated in this run
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub origin: TypeOrigin,
}

/// Resolves type references for one target
pub struct NameResolver<'a> {
    schema: &'a Schema,
    render: &'a RenderProfile,
    profile: &'a Profile,
    upstream_types: &'a BTreeMap<ProtoType, String>,
}

impl<'a> NameResolver<'a> {
    pub fn new(
        schema: &'a Schema,
        render: &'a RenderProfile,
        profile: &'a Profile,
        upstream_types: &'a BTreeMap<ProtoType, String>,
    ) -> Self {
        Self {
            schema,
            render,
            profile,
            upstream_types,
        }
    }

    pub fn resolve(&self, ty: &ProtoType) -> ResolvedName {
        match ty {
            ProtoType::Scalar(scalar) => ResolvedName {
                name: self.render.scalar_type(*scalar).to_string(),
                origin: TypeOrigin::Scalar,
            },
            ProtoType::Map { key, value } => ResolvedName {
                name: self.render.wrap_map(&self.resolve(key).name, &self.resolve(value).name),
                origin: TypeOrigin::Generated,
            },
            ProtoType::Named(_) => {
                if let Some(target) = self.profile.target(ty) {
                    return ResolvedName {
                        name: target.to_string(),
                        origin: TypeOrigin::Profile,
                    };
                }
                if let Some(upstream) = self.upstream_types.get(ty) {
                    return ResolvedName {
                        name: upstream.clone(),
                        origin: TypeOrigin::Upstream,
                    };
                }
                ResolvedName {
                    name: self.generated_name(ty),
                    origin: TypeOrigin::Generated,
                }
            }
        }
    }

    /// Language-qualified name for a type generated by this run
    pub fn generated_name(&self, ty: &ProtoType) -> String {
        let Some(file) = self.schema.proto_file_for_type(ty) else {
            return ty.simple_name();
        };
        let relative = relative_name(file, ty);
        match output_package(file, self.render) {
            Some(package) if self.render.honors_java_package => format!("{}.{}", package, relative),
            _ => relative,
        }
    }

    /// Field type with label and map wrapping applied
    pub fn field_type(&self, field: &Field) -> String {
        let Some(ty) = &field.ty else {
            return field.element_type.clone();
        };
        let name = self.resolve(ty).name;
        if field.is_repeated() {
            self.render.wrap_array(&name)
        } else if ty.is_map() {
            name
        } else {
            self.render.wrap_optional(&name)
        }
    }
}

/// `Outer.Inner` for `pkg.Outer.Inner` in package `pkg`
pub fn relative_name(file: &ProtoFile, ty: &ProtoType) -> String {
    let full = ty.to_string();
    match file.package_name.as_deref() {
        Some(package) if !package.is_empty() => full
            .strip_prefix(package)
            .and_then(|rest| rest.strip_prefix('.'))
            .map(str::to_string)
            .unwrap_or(full),
        _ => full,
    }
}

/// Package the generated code for `file` lives in
pub fn output_package(file: &ProtoFile, render: &RenderProfile) -> Option<String> {
    if render.honors_java_package {
        if let Some(java_package) = file.option("java_package").and_then(|option| option.string_value()) {
            return Some(java_package.to_string());
        }
    }
    file.package_name.clone().filter(|package| !package.is_empty())
}

/// `com/squareup/dinosaurs/Dinosaur.java` for a top-level type
pub fn output_path(file: &ProtoFile, name: &str, render: &RenderProfile) -> PathBuf {
    let mut path = PathBuf::new();
    if let Some(package) = output_package(file, render) {
        for segment in package.split('.') {
            path.push(segment);
        }
    }
    path.push(format!("{}.{}", name, render.extension));
    path
}

/// Convert snake_case to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert snake_case to camelCase
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::parser;

    fn schema() -> Schema {
        let file = parser::parse(
            &Location::new("src", "squareup/dinosaurs/dinosaur.proto"),
            r#"
            package squareup.dinosaurs;
            option java_package = "com.squareup.dinosaurs";
            message Dinosaur {
              message Egg {}
            }
            "#,
        )
        .unwrap();
        Schema::from_files(vec![file])
    }

    #[test]
    fn test_generated_names_use_java_package() {
        let schema = schema();
        let profile = Profile::default();
        let upstream = BTreeMap::new();
        let java = RenderProfile::java();
        let resolver = NameResolver::new(&schema, &java, &profile, &upstream);

        let egg = ProtoType::get("squareup.dinosaurs.Dinosaur.Egg");
        assert_eq!(resolver.generated_name(&egg), "com.squareup.dinosaurs.Dinosaur.Egg");

        let swift = RenderProfile::swift();
        let resolver = NameResolver::new(&schema, &swift, &profile, &upstream);
        assert_eq!(resolver.generated_name(&egg), "Dinosaur.Egg");
    }

    #[test]
    fn test_upstream_and_scalar_origins() {
        let schema = schema();
        let profile = Profile::default();
        let dinosaur = ProtoType::get("squareup.dinosaurs.Dinosaur");
        let upstream = BTreeMap::from([(dinosaur.clone(), "com.upstream.Dino".to_string())]);
        let kotlin = RenderProfile::kotlin();
        let resolver = NameResolver::new(&schema, &kotlin, &profile, &upstream);

        let resolved = resolver.resolve(&dinosaur);
        assert_eq!(resolved.origin, TypeOrigin::Upstream);
        assert_eq!(resolved.name, "com.upstream.Dino");
        assert_eq!(resolver.resolve(&ProtoType::get("int64")).name, "Long");
    }

    #[test]
    fn test_output_path() {
        let schema = schema();
        let file = &schema.proto_files()[0];
        assert_eq!(
            output_path(file, "Dinosaur", &RenderProfile::java()),
            PathBuf::from("com/squareup/dinosaurs/Dinosaur.java")
        );
        assert_eq!(
            output_path(file, "Dinosaur", &RenderProfile::swift()),
            PathBuf::from("squareup/dinosaurs/Dinosaur.swift")
        );
    }

    #[test]
    fn test_casing() {
        assert_eq!(to_pascal_case("picture_urls"), "PictureUrls");
        assert_eq!(to_camel_case("picture_urls"), "pictureUrls");
        assert_eq!(to_camel_case("name"), "name");
    }
}
