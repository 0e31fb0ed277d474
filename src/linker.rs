//! Linker
//!
//! Closes over the imports of the source-path files, indexes every declared
//! type, and resolves each field, rpc, and extend reference using protobuf
//! scoping: the innermost enclosing scope is tried first, then each outer
//! scope, and a leading `.` makes a name absolute.
//!
//! Link problems are recorded in the [`ErrorCollector`]; the caller decides
//! when to checkpoint.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticCode, ErrorCollector};
use crate::loader::Loader;
use crate::location::Location;
use crate::schema::{Extend, Field, ProtoFile, ProtoType, ScalarType, Schema, Type};

pub struct Linker<'a> {
    loader: &'a mut dyn Loader,
    errors: &'a mut ErrorCollector,
    permit_package_cycles: bool,
    load_exhaustively: bool,
}

impl<'a> Linker<'a> {
    pub fn new(loader: &'a mut dyn Loader, errors: &'a mut ErrorCollector) -> Self {
        Self {
            loader,
            errors,
            permit_package_cycles: false,
            load_exhaustively: false,
        }
    }

    /// Allow packages whose files import each other in a cycle
    pub fn permit_package_cycles(mut self, permit: bool) -> Self {
        self.permit_package_cycles = permit;
        self
    }

    /// Also load every file on the proto path, imported or not
    pub fn load_exhaustively(mut self, exhaustive: bool) -> Self {
        self.load_exhaustively = exhaustive;
        self
    }

    /// Link `sources` and everything they reach into one schema
    pub fn link(self, sources: Vec<ProtoFile>) -> Schema {
        let Linker {
            loader,
            errors,
            permit_package_cycles,
            load_exhaustively,
        } = self;

        let mut files = FileSet::default();
        for file in sources {
            files.add(None, file);
        }

        // Import closure, breadth first.
        let mut queue: VecDeque<usize> = (0..files.len()).collect();
        loop {
            while let Some(index) = queue.pop_front() {
                let imports: Vec<String> = files.files[index].all_imports().cloned().collect();
                for import in imports {
                    if files.index_of(&import).is_none() {
                        let loaded = loader.load(&import, errors);
                        queue.push_back(files.add(Some(&import), loaded));
                    }
                }
            }
            if !load_exhaustively {
                break;
            }
            let before = files.len();
            for import in loader.proto_path_imports(errors) {
                if files.index_of(&import).is_none() {
                    let loaded = loader.load(&import, errors);
                    queue.push_back(files.add(Some(&import), loaded));
                }
            }
            if files.len() == before {
                break;
            }
        }
        debug!(files = files.len(), "Closed over imports");

        let (type_index, service_index) = index_declarations(&files.files, errors);
        let visible = visible_files(&files);

        let resolver = Resolver {
            type_index: &type_index,
            import_paths: files.files.iter().map(|file| file.location.path.clone()).collect(),
        };
        for (index, file) in files.files.iter_mut().enumerate() {
            resolver.resolve_file(index, file, &visible[index], errors);
        }

        if !permit_package_cycles {
            check_package_cycles(&files, errors);
        }

        info!(
            files = files.len(),
            types = type_index.len(),
            services = service_index.len(),
            "Linked schema"
        );
        Schema::new(files.files, type_index, service_index)
    }
}

// =============================================================================
// Loaded files
// =============================================================================

/// Loaded files plus every path each was requested by
#[derive(Default)]
struct FileSet {
    files: Vec<ProtoFile>,
    by_path: HashMap<String, usize>,
}

impl FileSet {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn index_of(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    fn add(&mut self, requested_as: Option<&str>, file: ProtoFile) -> usize {
        let index = self.files.len();
        if let Some(path) = requested_as {
            self.by_path.insert(path.to_string(), index);
        }
        self.by_path.entry(file.import_path()).or_insert(index);
        self.by_path.entry(file.location.path.clone()).or_insert(index);
        self.files.push(file);
        index
    }
}

/// Each file's imports plus, transitively, the public imports of those
fn visible_files(files: &FileSet) -> Vec<HashSet<usize>> {
    files
        .files
        .iter()
        .map(|file| {
            let mut visible = HashSet::new();
            let mut stack: Vec<usize> = file.all_imports().filter_map(|path| files.index_of(path)).collect();
            while let Some(index) = stack.pop() {
                if visible.insert(index) {
                    stack.extend(
                        files.files[index]
                            .public_imports
                            .iter()
                            .filter_map(|path| files.index_of(path)),
                    );
                }
            }
            visible
        })
        .collect()
}

// =============================================================================
// Indexing
// =============================================================================

type Index = HashMap<ProtoType, usize>;

fn index_declarations(files: &[ProtoFile], errors: &mut ErrorCollector) -> (Index, Index) {
    let mut type_index = Index::new();
    let mut service_index = Index::new();
    let mut first_seen: HashMap<ProtoType, String> = HashMap::new();

    let mut register = |index: &mut Index, ty: &ProtoType, file: usize, at: String, errors: &mut ErrorCollector| {
        if let Some(existing) = first_seen.get(ty) {
            errors.push(
                Diagnostic::new(DiagnosticCode::DuplicateType, format!("{} is defined multiple times", ty))
                    .with_context(existing.clone())
                    .with_context(at),
            );
            return;
        }
        first_seen.insert(ty.clone(), at);
        index.insert(ty.clone(), file);
    };

    for (index, file) in files.iter().enumerate() {
        for ty in file.all_types() {
            register(&mut type_index, ty.ty(), index, ty.location().at_line(ty.line()), errors);
        }
        for service in &file.services {
            register(&mut service_index, &service.ty, index, service.location.at_line(service.line), errors);
        }
    }
    (type_index, service_index)
}

// =============================================================================
// Resolution
// =============================================================================

struct Resolver<'i> {
    type_index: &'i Index,
    import_paths: Vec<String>,
}

/// What a reference belongs to, for diagnostics
struct Site<'s> {
    location: &'s Location,
    line: usize,
    description: String,
}

impl Resolver<'_> {
    fn resolve_file(&self, index: usize, file: &mut ProtoFile, visible: &HashSet<usize>, errors: &mut ErrorCollector) {
        let package = file.package_name.clone().unwrap_or_default();
        let ctx = FileCtx {
            index,
            path: file.location.path.clone(),
            visible,
        };

        for ty in &mut file.types {
            self.resolve_type(&ctx, ty, errors);
        }
        for extend in &mut file.extend_list {
            self.resolve_extend(&ctx, &package, extend, errors);
        }
        for service in &mut file.services {
            let scope = service.ty.enclosing_type_or_package().unwrap_or_default().to_string();
            for rpc in &mut service.rpcs {
                let site = Site {
                    location: &service.location,
                    line: rpc.line,
                    description: format!("rpc {}.{}", service.ty, rpc.name),
                };
                rpc.request_type = self.resolve(&ctx, &scope, &rpc.request_element, &site, errors);
                rpc.response_type = self.resolve(&ctx, &scope, &rpc.response_element, &site, errors);
            }
        }
    }

    fn resolve_type(&self, ctx: &FileCtx<'_>, ty: &mut Type, errors: &mut ErrorCollector) {
        let Type::Message(message) = ty else {
            return;
        };
        let scope = message.ty.to_string();
        for field in message.all_fields_mut() {
            self.resolve_field(ctx, &scope, &format!("field {}.{}", scope, field.name), field, errors);
        }
        for extend in &mut message.nested_extends {
            self.resolve_extend(ctx, &scope, extend, errors);
        }
        for nested in &mut message.nested_types {
            self.resolve_type(ctx, nested, errors);
        }
    }

    fn resolve_extend(&self, ctx: &FileCtx<'_>, scope: &str, extend: &mut Extend, errors: &mut ErrorCollector) {
        let site = Site {
            location: &extend.location,
            line: extend.line,
            description: format!("extend {}", extend.element_type),
        };
        extend.ty = self.resolve(ctx, scope, &extend.element_type, &site, errors);
        let extended = extend.element_type.clone();
        for field in &mut extend.fields {
            let description = format!("extension field {}#{}", extended, field.name);
            self.resolve_field(ctx, scope, &description, field, errors);
        }
    }

    fn resolve_field(&self, ctx: &FileCtx<'_>, scope: &str, description: &str, field: &mut Field, errors: &mut ErrorCollector) {
        let site = Site {
            location: &field.location,
            line: field.line,
            description: description.to_string(),
        };
        field.ty = self.resolve(ctx, scope, &field.element_type, &site, errors);
    }

    /// Resolve `name` as written inside `scope`, reporting failures
    fn resolve(
        &self,
        ctx: &FileCtx<'_>,
        scope: &str,
        name: &str,
        site: &Site<'_>,
        errors: &mut ErrorCollector,
    ) -> Option<ProtoType> {
        let name = name.trim();
        if let Some((key, value)) = name
            .strip_prefix("map<")
            .and_then(|rest| rest.strip_suffix('>'))
            .and_then(|inner| inner.split_once(','))
        {
            let key = self.resolve(ctx, scope, key, site, errors)?;
            let value = self.resolve(ctx, scope, value, site, errors)?;
            return Some(ProtoType::map(key, value));
        }
        if let Some(scalar) = ScalarType::from_name(name) {
            return Some(ProtoType::Scalar(scalar));
        }

        let Some((resolved, declaring_file)) = self.lookup(scope, name) else {
            errors.push(
                Diagnostic::new(DiagnosticCode::UnresolvedType, format!("unable to resolve {}", name))
                    .at(site.location)
                    .with_context(format!("for {} ({})", site.description, site.location.at_line(site.line))),
            );
            return None;
        };
        if declaring_file != ctx.index && !ctx.visible.contains(&declaring_file) {
            errors.push(
                Diagnostic::new(
                    DiagnosticCode::MissingImport,
                    format!("{} needs to import {}", ctx.path, self.import_paths[declaring_file]),
                )
                .at(site.location)
                .with_context(format!("for {} ({})", site.description, site.location.at_line(site.line))),
            );
        }
        Some(resolved)
    }

    /// Innermost scope first; `.a.B` is absolute
    fn lookup(&self, scope: &str, name: &str) -> Option<(ProtoType, usize)> {
        if let Some(absolute) = name.strip_prefix('.') {
            let ty = ProtoType::Named(absolute.to_string());
            return self.type_index.get(&ty).map(|&file| (ty, file));
        }
        let mut prefix = scope;
        loop {
            let candidate = if prefix.is_empty() {
                ProtoType::Named(name.to_string())
            } else {
                ProtoType::Named(format!("{}.{}", prefix, name))
            };
            if let Some(&file) = self.type_index.get(&candidate) {
                return Some((candidate, file));
            }
            if prefix.is_empty() {
                return None;
            }
            prefix = prefix.rfind('.').map(|dot| &prefix[..dot]).unwrap_or("");
        }
    }
}

struct FileCtx<'v> {
    index: usize,
    path: String,
    visible: &'v HashSet<usize>,
}

// =============================================================================
// Package cycles
// =============================================================================

fn check_package_cycles(files: &FileSet, errors: &mut ErrorCollector) {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    // (from package, to package) → (importing file, import)
    let mut evidence: HashMap<(String, String), Vec<(String, String)>> = HashMap::new();

    let mut node = |graph: &mut DiGraph<String, ()>, package: &str| {
        *nodes
            .entry(package.to_string())
            .or_insert_with(|| graph.add_node(package.to_string()))
    };

    for file in &files.files {
        let Some(from) = file.package_name.as_deref() else {
            continue;
        };
        for import in file.all_imports() {
            let Some(target) = files.index_of(import) else {
                continue;
            };
            let Some(to) = files.files[target].package_name.as_deref() else {
                continue;
            };
            if from == to {
                continue;
            }
            let (a, b) = (node(&mut graph, from), node(&mut graph, to));
            let key = (from.to_string(), to.to_string());
            if !evidence.contains_key(&key) {
                graph.add_edge(a, b, ());
            }
            evidence
                .entry(key)
                .or_default()
                .push((file.location.path.clone(), import.clone()));
        }
    }

    for component in kosaraju_scc(&graph) {
        if component.len() < 2 {
            continue;
        }
        let members: BTreeSet<&str> = component.iter().map(|&index| graph[index].as_str()).collect();
        let mut diagnostic = Diagnostic::new(DiagnosticCode::PackageCycle, "packages form a cycle:");
        let mut edges: Vec<(&(String, String), &Vec<(String, String)>)> = evidence
            .iter()
            .filter(|((from, to), _)| members.contains(from.as_str()) && members.contains(to.as_str()))
            .collect();
        edges.sort();
        for ((from, to), imports) in edges {
            diagnostic = diagnostic.with_context(format!("{} imports {}", from, to));
            for (path, import) in imports {
                diagnostic = diagnostic.with_context(format!("  {}:", path));
                diagnostic = diagnostic.with_context(format!("    import \"{}\";", import));
            }
        }
        errors.push(diagnostic);
    }
}
