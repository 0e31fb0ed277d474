//! Declarations
//!
//! A [`ProtoFile`] comes out of the parser unlinked: every declared type
//! already knows its own [`ProtoType`], but references (field types, rpc
//! request/response, extended types) are only strings until the linker
//! fills in the resolved `ty` fields.

use serde::{Deserialize, Serialize};

use super::ProtoType;
use crate::location::Location;

// =============================================================================
// Options
// =============================================================================

/// Option value as written in the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Quoted string literal (unescaped)
    String(String),
    /// Anything else: identifiers, numbers, aggregate `{ ... }` text
    Raw(String),
}

/// `option name = value;` or a `[name = value]` field option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionElement {
    pub name: String,
    pub value: OptionValue,
}

impl OptionElement {
    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            OptionValue::String(value) => Some(value),
            OptionValue::Raw(_) => None,
        }
    }
}

/// Look up an option by name
pub fn find_option<'a>(options: &'a [OptionElement], name: &str) -> Option<&'a OptionElement> {
    options.iter().find(|option| option.name == name)
}

// =============================================================================
// Fields
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Optional => "optional",
            Label::Required => "required",
            Label::Repeated => "repeated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub location: Location,
    pub line: usize,
    pub documentation: String,
    pub label: Option<Label>,
    pub name: String,
    pub tag: u32,
    /// Type as written: `Period`, `.squareup.Period`, `map<string, int32>`
    pub element_type: String,
    /// Resolved by the linker
    pub ty: Option<ProtoType>,
    pub options: Vec<OptionElement>,
}

impl Field {
    pub fn is_repeated(&self) -> bool {
        self.label == Some(Label::Repeated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneOf {
    pub name: String,
    pub documentation: String,
    pub fields: Vec<Field>,
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageType {
    pub ty: ProtoType,
    pub location: Location,
    pub line: usize,
    pub documentation: String,
    pub fields: Vec<Field>,
    pub one_ofs: Vec<OneOf>,
    pub nested_types: Vec<Type>,
    pub nested_extends: Vec<Extend>,
    pub options: Vec<OptionElement>,
    /// `reserved` statements, verbatim after the keyword
    pub reserved: Vec<String>,
    /// `extensions` statements, verbatim after the keyword
    pub extensions: Vec<String>,
}

impl MessageType {
    /// Declared fields followed by oneof members
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .chain(self.one_ofs.iter().flat_map(|one_of| one_of.fields.iter()))
    }

    pub fn all_fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields
            .iter_mut()
            .chain(self.one_ofs.iter_mut().flat_map(|one_of| one_of.fields.iter_mut()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    pub tag: i32,
    pub line: usize,
    pub documentation: String,
    pub options: Vec<OptionElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub ty: ProtoType,
    pub location: Location,
    pub line: usize,
    pub documentation: String,
    pub constants: Vec<EnumConstant>,
    pub options: Vec<OptionElement>,
    pub reserved: Vec<String>,
}

/// A message or enum declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Message(MessageType),
    Enum(EnumType),
}

impl Type {
    pub fn ty(&self) -> &ProtoType {
        match self {
            Type::Message(message) => &message.ty,
            Type::Enum(enum_type) => &enum_type.ty,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Type::Message(message) => &message.location,
            Type::Enum(enum_type) => &enum_type.location,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Type::Message(message) => message.line,
            Type::Enum(enum_type) => enum_type.line,
        }
    }

    pub fn documentation(&self) -> &str {
        match self {
            Type::Message(message) => &message.documentation,
            Type::Enum(enum_type) => &enum_type.documentation,
        }
    }

    pub fn nested_types(&self) -> &[Type] {
        match self {
            Type::Message(message) => &message.nested_types,
            Type::Enum(_) => &[],
        }
    }

    pub fn as_message(&self) -> Option<&MessageType> {
        match self {
            Type::Message(message) => Some(message),
            Type::Enum(_) => None,
        }
    }

    /// This type followed by every type nested in it, depth first
    pub fn flatten(&self) -> Vec<&Type> {
        let mut result = vec![self];
        for nested in self.nested_types() {
            result.extend(nested.flatten());
        }
        result
    }

    pub(crate) fn ty_mut(&mut self) -> &mut ProtoType {
        match self {
            Type::Message(message) => &mut message.ty,
            Type::Enum(enum_type) => &mut enum_type.ty,
        }
    }

    pub(crate) fn nested_types_mut(&mut self) -> &mut [Type] {
        match self {
            Type::Message(message) => &mut message.nested_types,
            Type::Enum(_) => &mut [],
        }
    }
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rpc {
    pub name: String,
    pub line: usize,
    pub documentation: String,
    pub request_element: String,
    pub response_element: String,
    pub request_streaming: bool,
    pub response_streaming: bool,
    /// Resolved by the linker
    pub request_type: Option<ProtoType>,
    /// Resolved by the linker
    pub response_type: Option<ProtoType>,
    pub options: Vec<OptionElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub ty: ProtoType,
    pub location: Location,
    pub line: usize,
    pub documentation: String,
    pub rpcs: Vec<Rpc>,
    pub options: Vec<OptionElement>,
}

// =============================================================================
// Extensions
// =============================================================================

/// `extend Foo { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extend {
    pub location: Location,
    pub line: usize,
    pub documentation: String,
    /// Extended type as written
    pub element_type: String,
    /// Resolved by the linker
    pub ty: Option<ProtoType>,
    pub fields: Vec<Field>,
}

impl Extend {
    /// Extension fields are namespaced by the declaring file's package
    pub fn qualified_field_name(&self, package: Option<&str>, field: &Field) -> String {
        match package {
            Some(package) if !package.is_empty() => format!("{}.{}", package, field.name),
            _ => field.name.clone(),
        }
    }
}

// =============================================================================
// Files
// =============================================================================

/// One parsed `.proto` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoFile {
    pub location: Location,
    pub syntax: Option<String>,
    pub package_name: Option<String>,
    pub imports: Vec<String>,
    pub public_imports: Vec<String>,
    pub types: Vec<Type>,
    pub services: Vec<Service>,
    pub extend_list: Vec<Extend>,
    pub options: Vec<OptionElement>,
    /// User-authored (always generated) versus pulled in by an import
    pub loaded_on_source_path: bool,
}

impl ProtoFile {
    /// Placeholder for a file that could not be found or parsed
    pub fn empty(location: Location) -> Self {
        Self {
            location,
            syntax: None,
            package_name: None,
            imports: Vec::new(),
            public_imports: Vec::new(),
            types: Vec::new(),
            services: Vec::new(),
            extend_list: Vec::new(),
            options: Vec::new(),
            loaded_on_source_path: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.services.is_empty() && self.extend_list.is_empty()
    }

    /// Every import, public or not
    pub fn all_imports(&self) -> impl Iterator<Item = &String> {
        self.imports.iter().chain(self.public_imports.iter())
    }

    /// `squareup/dinosaurs/dinosaur.proto` for package `squareup.dinosaurs`
    pub fn canonical_import_path(&self) -> String {
        let file_name = self.location.file_name();
        match &self.package_name {
            Some(package) if !package.is_empty() => {
                format!("{}/{}", package.replace('.', "/"), file_name)
            }
            _ => file_name.to_string(),
        }
    }

    /// Path other files use to import this one.
    ///
    /// Files found under a root are imported by their root-relative path;
    /// standalone files fall back to the path implied by their package.
    pub fn import_path(&self) -> String {
        if self.location.base.is_empty() {
            self.canonical_import_path()
        } else {
            self.location.path.clone()
        }
    }

    /// All types in this file, nested ones included
    pub fn all_types(&self) -> Vec<&Type> {
        self.types.iter().flat_map(|ty| ty.flatten()).collect()
    }

    pub fn option(&self, name: &str) -> Option<&OptionElement> {
        find_option(&self.options, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(location: Location, package: Option<&str>) -> ProtoFile {
        let mut file = ProtoFile::empty(location);
        file.package_name = package.map(String::from);
        file
    }

    #[test]
    fn test_import_path_uses_root_relative_path() {
        let file = file(Location::new("src/proto", "dinos/dinosaur.proto"), Some("squareup.dinosaurs"));
        assert_eq!(file.import_path(), "dinos/dinosaur.proto");
        assert_eq!(file.canonical_import_path(), "squareup/dinosaurs/dinosaur.proto");
    }

    #[test]
    fn test_import_path_for_standalone_file() {
        let file = file(Location::get("/tmp/x/dinosaur.proto"), Some("squareup.dinosaurs"));
        assert_eq!(file.import_path(), "squareup/dinosaurs/dinosaur.proto");

        let no_package = super::ProtoFile::empty(Location::get("/tmp/x/plain.proto"));
        assert_eq!(no_package.import_path(), "plain.proto");
    }

    #[test]
    fn test_empty_placeholder() {
        let file = ProtoFile::empty(Location::get("missing.proto"));
        assert!(file.is_empty());
        assert!(file.types.is_empty());
        assert!(file.services.is_empty());
    }
}
