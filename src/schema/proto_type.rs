//! Type References
//!
//! [`ProtoType`] names a scalar, a declared message/enum/service, or a map.
//! It is the key of the linked schema's type index, so equality and hashing
//! follow the canonical name.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Protobuf scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Bytes,
    Double,
    Float,
    Fixed32,
    Fixed64,
    Int32,
    Int64,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
    String,
    Uint32,
    Uint64,
}

impl ScalarType {
    pub const ALL: [ScalarType; 15] = [
        Self::Bool,
        Self::Bytes,
        Self::Double,
        Self::Float,
        Self::Fixed32,
        Self::Fixed64,
        Self::Int32,
        Self::Int64,
        Self::Sfixed32,
        Self::Sfixed64,
        Self::Sint32,
        Self::Sint64,
        Self::String,
        Self::Uint32,
        Self::Uint64,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scalar| scalar.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::Double => "double",
            Self::Float => "float",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::String => "string",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
        }
    }
}

/// A reference to a type. Serializes as its display form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtoType {
    Scalar(ScalarType),
    /// Fully qualified declared name: `squareup.dinosaurs.Dinosaur.Period`
    Named(String),
    Map {
        key: Box<ProtoType>,
        value: Box<ProtoType>,
    },
}

impl ProtoType {
    /// Parse a type as written in a schema or profile.
    ///
    /// Scalars and `map<K, V>` are recognized; everything else is taken as a
    /// name (leading `.` stripped).
    pub fn get(name: &str) -> ProtoType {
        let name = name.trim();
        if let Some(scalar) = ScalarType::from_name(name) {
            return ProtoType::Scalar(scalar);
        }
        if let Some(inner) = name.strip_prefix("map<").and_then(|rest| rest.strip_suffix('>')) {
            if let Some((key, value)) = inner.split_once(',') {
                return ProtoType::map(ProtoType::get(key), ProtoType::get(value));
            }
        }
        ProtoType::Named(name.trim_start_matches('.').to_string())
    }

    /// A declared type in `package` (which may be empty)
    pub fn named(package: Option<&str>, name: &str) -> ProtoType {
        match package {
            Some(package) if !package.is_empty() => ProtoType::Named(format!("{}.{}", package, name)),
            _ => ProtoType::Named(name.to_string()),
        }
    }

    pub fn map(key: ProtoType, value: ProtoType) -> ProtoType {
        ProtoType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// The type nested in this one called `name`
    pub fn nested(&self, name: &str) -> ProtoType {
        ProtoType::Named(format!("{}.{}", self, name))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, ProtoType::Scalar(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, ProtoType::Map { .. })
    }

    pub fn value_type(&self) -> Option<&ProtoType> {
        match self {
            ProtoType::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Last segment of a declared name, or the full display form otherwise
    pub fn simple_name(&self) -> String {
        match self {
            ProtoType::Named(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
            other => other.to_string(),
        }
    }

    /// Everything before the last `.` of a declared name
    pub fn enclosing_type_or_package(&self) -> Option<&str> {
        match self {
            ProtoType::Named(name) => name.rfind('.').map(|dot| &name[..dot]),
            _ => None,
        }
    }
}

impl fmt::Display for ProtoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoType::Scalar(scalar) => write!(f, "{}", scalar.as_str()),
            ProtoType::Named(name) => write!(f, "{}", name),
            ProtoType::Map { key, value } => write!(f, "map<{}, {}>", key, value),
        }
    }
}

impl Serialize for ProtoType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProtoType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ProtoType::get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scalar() {
        assert_eq!(ProtoType::get("int32"), ProtoType::Scalar(ScalarType::Int32));
        assert_eq!(ProtoType::get("string"), ProtoType::Scalar(ScalarType::String));
        assert!(ProtoType::get("bytes").is_scalar());
    }

    #[test]
    fn test_get_map() {
        let map = ProtoType::get("map<string, squareup.Period>");
        assert!(map.is_map());
        assert_eq!(map.value_type(), Some(&ProtoType::Named("squareup.Period".to_string())));
        assert_eq!(map.to_string(), "map<string, squareup.Period>");
    }

    #[test]
    fn test_get_named_strips_leading_dot() {
        assert_eq!(ProtoType::get(".a.b.C"), ProtoType::Named("a.b.C".to_string()));
    }

    #[test]
    fn test_names() {
        let ty = ProtoType::named(Some("squareup.dinosaurs"), "Dinosaur");
        assert_eq!(ty.to_string(), "squareup.dinosaurs.Dinosaur");
        assert_eq!(ty.simple_name(), "Dinosaur");
        assert_eq!(ty.enclosing_type_or_package(), Some("squareup.dinosaurs"));

        let nested = ty.nested("Period");
        assert_eq!(nested.to_string(), "squareup.dinosaurs.Dinosaur.Period");

        assert_eq!(ProtoType::named(None, "Root").to_string(), "Root");
    }

    #[test]
    fn test_serializes_as_name() {
        let map = ProtoType::get("map<string, a.B>");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "\"map<string, a.B>\"");
        let back: ProtoType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
