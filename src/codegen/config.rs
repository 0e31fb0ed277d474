//! Render Profiles
//!
//! Per-language rendering configuration for the stub emitters: scalar type
//! mappings, container wrapping, keyword escapes, and file layout. Nothing
//! here affects loading, linking, or claims; only emission reads it.

use serde::{Deserialize, Serialize};

use crate::schema::ScalarType;

/// Supported emitter languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Kotlin,
    Swift,
}

impl Language {
    /// Profile files for this language are named `<name>.wire`.
    /// JVM languages share the `java` profile.
    pub fn profile_name(&self) -> &'static str {
        match self {
            Language::Java | Language::Kotlin => "java",
            Language::Swift => "swift",
        }
    }
}

/// Language-specific rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderProfile {
    pub language: Language,

    /// File extension without the dot
    pub extension: String,

    /// Scalar type mappings
    pub types: TypeMappings,

    /// How optional fields are spelled
    pub optional: OptionalRepr,

    /// Prefix/suffix pair wrapping an escaped keyword
    pub keyword_escape: (String, String),

    /// Line comment prefix
    pub comment_prefix: String,

    /// Whether JVM `java_package` file options decide the output directory
    pub honors_java_package: bool,
}

/// Protobuf scalar → language type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeMappings {
    pub bool: String,
    pub bytes: String,
    pub double: String,
    pub float: String,
    /// int32, sint32, sfixed32
    pub int32: String,
    /// int64, sint64, sfixed64
    pub int64: String,
    /// uint32, fixed32
    pub uint32: String,
    /// uint64, fixed64
    pub uint64: String,
    pub string: String,
}

/// Representation of optional values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalRepr {
    /// Java: nullable reference, `@Nullable T`
    NullableAnnotation,
    /// Kotlin and Swift: `T?`
    QuestionMark,
}

// =============================================================================
// Default Profiles
// =============================================================================

impl RenderProfile {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Java => Self::java(),
            Language::Kotlin => Self::kotlin(),
            Language::Swift => Self::swift(),
        }
    }

    pub fn java() -> Self {
        Self {
            language: Language::Java,
            extension: "java".to_string(),
            types: TypeMappings {
                bool: "Boolean".to_string(),
                bytes: "ByteString".to_string(),
                double: "Double".to_string(),
                float: "Float".to_string(),
                int32: "Integer".to_string(),
                int64: "Long".to_string(),
                uint32: "Integer".to_string(),
                uint64: "Long".to_string(),
                string: "String".to_string(),
            },
            optional: OptionalRepr::NullableAnnotation,
            keyword_escape: ("".to_string(), "_".to_string()),
            comment_prefix: "//".to_string(),
            honors_java_package: true,
        }
    }

    pub fn kotlin() -> Self {
        Self {
            language: Language::Kotlin,
            extension: "kt".to_string(),
            types: TypeMappings {
                bool: "Boolean".to_string(),
                bytes: "ByteString".to_string(),
                double: "Double".to_string(),
                float: "Float".to_string(),
                int32: "Int".to_string(),
                int64: "Long".to_string(),
                uint32: "Int".to_string(),
                uint64: "Long".to_string(),
                string: "String".to_string(),
            },
            optional: OptionalRepr::QuestionMark,
            keyword_escape: ("`".to_string(), "`".to_string()),
            comment_prefix: "//".to_string(),
            honors_java_package: true,
        }
    }

    pub fn swift() -> Self {
        Self {
            language: Language::Swift,
            extension: "swift".to_string(),
            types: TypeMappings {
                bool: "Bool".to_string(),
                bytes: "Foundation.Data".to_string(),
                double: "Double".to_string(),
                float: "Float".to_string(),
                int32: "Int32".to_string(),
                int64: "Int64".to_string(),
                uint32: "UInt32".to_string(),
                uint64: "UInt64".to_string(),
                string: "String".to_string(),
            },
            optional: OptionalRepr::QuestionMark,
            keyword_escape: ("`".to_string(), "`".to_string()),
            comment_prefix: "//".to_string(),
            honors_java_package: false,
        }
    }
}

// =============================================================================
// Render Helpers
// =============================================================================

impl RenderProfile {
    /// Escape a keyword if needed
    pub fn escape_keyword(&self, name: &str) -> String {
        let keywords = match self.language {
            Language::Java => JAVA_KEYWORDS,
            Language::Kotlin => KOTLIN_KEYWORDS,
            Language::Swift => SWIFT_KEYWORDS,
        };
        if keywords.contains(&name) {
            format!("{}{}{}", self.keyword_escape.0, name, self.keyword_escape.1)
        } else {
            name.to_string()
        }
    }

    pub fn scalar_type(&self, scalar: ScalarType) -> &str {
        match scalar {
            ScalarType::Bool => &self.types.bool,
            ScalarType::Bytes => &self.types.bytes,
            ScalarType::Double => &self.types.double,
            ScalarType::Float => &self.types.float,
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => &self.types.int32,
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => &self.types.int64,
            ScalarType::Uint32 | ScalarType::Fixed32 => &self.types.uint32,
            ScalarType::Uint64 | ScalarType::Fixed64 => &self.types.uint64,
            ScalarType::String => &self.types.string,
        }
    }

    pub fn wrap_optional(&self, type_str: &str) -> String {
        match self.optional {
            OptionalRepr::NullableAnnotation => format!("@Nullable {}", type_str),
            OptionalRepr::QuestionMark => format!("{}?", type_str),
        }
    }

    pub fn wrap_array(&self, type_str: &str) -> String {
        match self.language {
            Language::Java | Language::Kotlin => format!("List<{}>", type_str),
            Language::Swift => format!("[{}]", type_str),
        }
    }

    pub fn wrap_map(&self, key: &str, value: &str) -> String {
        match self.language {
            Language::Java | Language::Kotlin => format!("Map<{}, {}>", key, value),
            Language::Swift => format!("[{}: {}]", key, value),
        }
    }

    pub fn comment(&self, text: &str) -> String {
        format!("{} {}", self.comment_prefix, text)
    }
}

// =============================================================================
// Keywords
// =============================================================================

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char",
    "class", "const", "continue", "default", "do", "double", "else", "enum",
    "extends", "final", "finally", "float", "for", "goto", "if", "implements",
    "import", "instanceof", "int", "interface", "long", "native", "new",
    "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null",
];

const KOTLIN_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun",
    "if", "in", "interface", "is", "null", "object", "package", "return",
    "super", "this", "throw", "true", "try", "typealias", "typeof", "val",
    "var", "when", "while",
];

const SWIFT_KEYWORDS: &[&str] = &[
    "associatedtype", "class", "deinit", "enum", "extension", "fileprivate",
    "func", "import", "init", "inout", "internal", "let", "open", "operator",
    "private", "protocol", "public", "rethrows", "static", "struct",
    "subscript", "typealias", "var", "break", "case", "continue", "default",
    "defer", "do", "else", "fallthrough", "for", "guard", "if", "in", "repeat",
    "return", "switch", "where", "while", "as", "Any", "catch", "false", "is",
    "nil", "super", "self", "Self", "throw", "throws", "true", "try", "Type",
];
