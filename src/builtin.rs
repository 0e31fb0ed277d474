//! Built-in Core Declarations
//!
//! Well-known `google/protobuf/*.proto` files and `wire/extensions.proto`,
//! compiled into the binary. The loader falls back to these when no
//! proto-path root provides an import.

use include_dir::{include_dir, Dir};

use crate::location::Location;

/// Base of every location served from the embedded tree
pub const CORE_BASE: &str = "wire-schema-core";

static CORE_PROTOS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/core");

/// True when `path` names an embedded core file
pub fn is_builtin(path: &str) -> bool {
    source(path).is_some()
}

/// The text of an embedded core file
pub fn source(path: &str) -> Option<&'static str> {
    if !(path.starts_with("google/protobuf/") || path == "wire/extensions.proto") {
        return None;
    }
    CORE_PROTOS.get_file(path).and_then(|file| file.contents_utf8())
}

/// Location an embedded file is reported under
pub fn location(path: &str) -> Location {
    Location::new(CORE_BASE, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn collect(dir: &'static Dir<'static>, out: &mut Vec<&'static str>) {
        for file in dir.files() {
            if let Some(path) = file.path().to_str() {
                if path.ends_with(".proto") {
                    out.push(path);
                }
            }
        }
        for sub in dir.dirs() {
            collect(sub, out);
        }
    }

    fn paths() -> Vec<&'static str> {
        let mut paths = Vec::new();
        collect(&CORE_PROTOS, &mut paths);
        paths
    }

    #[test]
    fn test_core_files_are_embedded() {
        assert!(is_builtin("google/protobuf/timestamp.proto"));
        assert!(is_builtin("google/protobuf/descriptor.proto"));
        assert!(is_builtin("wire/extensions.proto"));
        assert!(!is_builtin("google/protobuf/missing.proto"));
        assert!(!is_builtin("squareup/dinosaur.proto"));
        assert_eq!(paths().len(), 7);
    }

    #[test]
    fn test_core_files_parse() {
        for path in paths() {
            let source = source(path).unwrap();
            let file = parser::parse(&location(path), source).unwrap();
            assert!(!file.is_empty(), "{} has no declarations", path);
        }
    }
}
