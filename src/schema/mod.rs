//! Schema Model
//!
//! Declarations produced by the parser and the linked [`Schema`] produced by
//! the linker. Once linking succeeds every reference held by a declaration
//! resolves through the schema's type index.

mod proto_type;
mod render;
mod types;

pub use proto_type::{ProtoType, ScalarType};
pub use types::{
    find_option, EnumConstant, EnumType, Extend, Field, Label, MessageType, OneOf,
    OptionElement, OptionValue, ProtoFile, Rpc, Service, Type,
};

use std::collections::HashMap;

/// The linked schema: every loaded file plus a total type index
#[derive(Debug, Clone, Default)]
pub struct Schema {
    proto_files: Vec<ProtoFile>,
    /// Declared type → index into `proto_files`
    type_index: HashMap<ProtoType, usize>,
    /// Service → index into `proto_files`
    service_index: HashMap<ProtoType, usize>,
}

impl Schema {
    pub(crate) fn new(
        proto_files: Vec<ProtoFile>,
        type_index: HashMap<ProtoType, usize>,
        service_index: HashMap<ProtoType, usize>,
    ) -> Self {
        Self {
            proto_files,
            type_index,
            service_index,
        }
    }

    /// Link `files` with no loader behind them (every import must be present)
    pub fn from_files(files: Vec<ProtoFile>) -> Self {
        let mut type_index = HashMap::new();
        let mut service_index = HashMap::new();
        for (index, file) in files.iter().enumerate() {
            for ty in file.all_types() {
                type_index.entry(ty.ty().clone()).or_insert(index);
            }
            for service in &file.services {
                service_index.entry(service.ty.clone()).or_insert(index);
            }
        }
        Self::new(files, type_index, service_index)
    }

    pub fn proto_files(&self) -> &[ProtoFile] {
        &self.proto_files
    }

    /// The file at `path` (root-relative import path)
    pub fn proto_file(&self, path: &str) -> Option<&ProtoFile> {
        self.proto_files
            .iter()
            .find(|file| file.location.path == path || file.import_path() == path)
    }

    /// The file declaring `ty`
    pub fn proto_file_for_type(&self, ty: &ProtoType) -> Option<&ProtoFile> {
        self.type_index.get(ty).map(|&index| &self.proto_files[index])
    }

    pub fn get_type(&self, ty: &ProtoType) -> Option<&Type> {
        let file = self.proto_file_for_type(ty)?;
        file.all_types().into_iter().find(|candidate| candidate.ty() == ty)
    }

    pub fn get_service(&self, ty: &ProtoType) -> Option<&Service> {
        let &index = self.service_index.get(ty)?;
        self.proto_files[index].services.iter().find(|service| &service.ty == ty)
    }

    /// Every declared type, in no particular order
    pub fn types(&self) -> impl Iterator<Item = &ProtoType> {
        self.type_index.keys()
    }

    pub fn services(&self) -> impl Iterator<Item = &ProtoType> {
        self.service_index.keys()
    }

    pub fn type_count(&self) -> usize {
        self.type_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::parser;

    #[test]
    fn test_lookup_nested_type() {
        let file = parser::parse(
            &Location::new("p", "a/b.proto"),
            "package a; message Outer { message Inner {} } service S {}",
        )
        .unwrap();
        let schema = Schema::from_files(vec![file]);

        let inner = ProtoType::get("a.Outer.Inner");
        assert_eq!(schema.get_type(&inner).unwrap().ty(), &inner);
        assert_eq!(schema.proto_file_for_type(&inner).unwrap().location.path, "a/b.proto");
        assert!(schema.get_service(&ProtoType::get("a.S")).is_some());
        assert!(schema.get_type(&ProtoType::get("a.Missing")).is_none());
        assert_eq!(schema.type_count(), 2);
        assert!(schema.proto_file("a/b.proto").is_some());
    }
}
