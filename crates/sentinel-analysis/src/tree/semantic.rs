//! Per-file semantic context and the shared, incrementally updated index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tree_sitter::Node;

use super::query::{self, is_function, pattern_names, string_literal_value};

/// An `import` declaration or a `require(..)` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub source: String,
    /// Local names the import binds (default, named, namespace).
    pub names: SmallVec<[String; 4]>,
    pub line: u32,
}

/// A function-like scope.
#[derive(Debug, Clone)]
pub struct FunctionScope {
    pub start: usize,
    pub end: usize,
    pub is_async: bool,
    bindings: FxHashSet<String>,
}

impl FunctionScope {
    pub fn contains(&self, byte: usize) -> bool {
        self.start <= byte && byte < self.end
    }

    pub fn binds(&self, name: &str) -> bool {
        self.bindings.contains(name)
    }
}

/// Scopes, imports and exports of one file.
#[derive(Debug, Clone, Default)]
pub struct SemanticContext {
    module: FxHashSet<String>,
    functions: Vec<FunctionScope>,
    imports: Vec<ImportDecl>,
    exports: Vec<String>,
}

impl SemanticContext {
    pub fn build(root: Node, src: &[u8]) -> Self {
        let mut ctx = Self::default();
        ctx.visit(root, src, None);
        ctx
    }

    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    pub fn functions(&self) -> &[FunctionScope] {
        &self.functions
    }

    pub fn imports_from(&self, source: &str) -> Option<&ImportDecl> {
        self.imports.iter().find(|i| i.source == source)
    }

    /// Whether any import binds `name` locally.
    pub fn is_imported(&self, name: &str) -> bool {
        self.imports.iter().any(|i| i.names.iter().any(|n| n == name))
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.exports.iter().any(|e| e == name)
    }

    /// Whether `name` is visible at `byte` through a module-level binding or
    /// any function scope enclosing `byte`.
    pub fn is_bound_at(&self, byte: usize, name: &str) -> bool {
        self.module.contains(name)
            || self
                .functions
                .iter()
                .any(|scope| scope.contains(byte) && scope.binds(name))
    }

    /// Innermost function scope containing `byte`.
    pub fn function_at(&self, byte: usize) -> Option<&FunctionScope> {
        self.functions
            .iter()
            .filter(|s| s.contains(byte))
            .min_by_key(|s| s.end - s.start)
    }

    fn bind(&mut self, scope: Option<usize>, name: String) {
        match scope.and_then(|i| self.functions.get_mut(i)) {
            Some(f) => {
                f.bindings.insert(name);
            }
            None => {
                self.module.insert(name);
            }
        }
    }

    fn visit(&mut self, node: Node, src: &[u8], scope: Option<usize>) {
        match node.kind() {
            "import_statement" => self.record_import(node, src),
            "export_statement" => self.record_export(node, src),
            "variable_declarator" => self.record_declarator(node, src, scope),
            "class_declaration" => {
                if let Some(name) = node.child_by_field_name("name").and_then(|n| n.utf8_text(src).ok()) {
                    self.bind(scope, name.to_string());
                }
            }
            _ => {}
        }

        if is_function(node) {
            if node.kind() == "function_declaration" || node.kind() == "generator_function_declaration" {
                if let Some(name) = node.child_by_field_name("name").and_then(|n| n.utf8_text(src).ok()) {
                    self.bind(scope, name.to_string());
                }
            }
            let inner = self.open_function(node, src);
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                self.visit(child, src, Some(inner));
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, src, scope);
        }
    }

    fn open_function(&mut self, node: Node, src: &[u8]) -> usize {
        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

        let mut names = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "required_parameter" | "optional_parameter" => {
                        if let Some(pattern) = param.child_by_field_name("pattern") {
                            pattern_names(pattern, src, &mut names);
                        }
                    }
                    _ => pattern_names(param, src, &mut names),
                }
            }
        } else if let Some(param) = node.child_by_field_name("parameter") {
            pattern_names(param, src, &mut names);
        }

        self.functions.push(FunctionScope {
            start: node.start_byte(),
            end: node.end_byte(),
            is_async,
            bindings: names.into_iter().collect(),
        });
        self.functions.len() - 1
    }

    fn record_declarator(&mut self, node: Node, src: &[u8], scope: Option<usize>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let mut names = Vec::new();
        pattern_names(name, src, &mut names);

        // const x = require('mod')
        if let Some(value) = node.child_by_field_name("value") {
            if value.kind() == "call_expression" && query::callee_name(value, src) == Some("require") {
                let source = query::call_arguments(value)
                    .first()
                    .and_then(|a| string_literal_value(*a, src))
                    .map(str::to_string);
                if let Some(source) = source {
                    self.imports.push(ImportDecl {
                        source,
                        names: names.iter().cloned().collect(),
                        line: query::position(node).0,
                    });
                }
            }
        }

        for n in names {
            self.bind(scope, n);
        }
    }

    fn record_import(&mut self, node: Node, src: &[u8]) {
        let Some(source) = node
            .child_by_field_name("source")
            .and_then(|s| string_literal_value(s, src))
        else {
            return;
        };
        let mut names: SmallVec<[String; 4]> = SmallVec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "import_clause" {
                continue;
            }
            let mut clause_cursor = child.walk();
            for part in child.named_children(&mut clause_cursor) {
                match part.kind() {
                    "identifier" => push_text(&mut names, part, src),
                    "namespace_import" => {
                        let mut c = part.walk();
                        for id in part.named_children(&mut c) {
                            if id.kind() == "identifier" {
                                push_text(&mut names, id, src);
                            }
                        }
                    }
                    "named_imports" => {
                        let mut c = part.walk();
                        for spec in part.named_children(&mut c) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let local = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(local) = local {
                                push_text(&mut names, local, src);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        for name in &names {
            self.module.insert(name.clone());
        }
        self.imports.push(ImportDecl {
            source: source.to_string(),
            names,
            line: query::position(node).0,
        });
    }

    fn record_export(&mut self, node: Node, src: &[u8]) {
        if let Some(decl) = node.child_by_field_name("declaration") {
            match decl.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    let mut cursor = decl.walk();
                    for declarator in decl.named_children(&mut cursor) {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            let mut names = Vec::new();
                            pattern_names(name, src, &mut names);
                            self.exports.extend(names);
                        }
                    }
                }
                _ => {
                    if let Some(name) = decl.child_by_field_name("name").and_then(|n| n.utf8_text(src).ok()) {
                        self.exports.push(name.to_string());
                    }
                }
            }
            return;
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "export_clause" {
                continue;
            }
            let mut c = child.walk();
            for spec in child.named_children(&mut c) {
                let exported = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"))
                    .and_then(|n| n.utf8_text(src).ok());
                if let Some(name) = exported {
                    self.exports.push(name.to_string());
                }
            }
        }
    }
}

fn push_text(names: &mut SmallVec<[String; 4]>, node: Node, src: &[u8]) {
    if let Ok(text) = node.utf8_text(src) {
        names.push(text.to_string());
    }
}

/// Shared semantic index keyed by path. An entry is rebuilt only when the
/// file's content hash changes.
#[derive(Debug, Default)]
pub struct SemanticIndex {
    entries: DashMap<PathBuf, (u64, Arc<SemanticContext>)>,
}

impl SemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached context for `path` when `hash` matches, otherwise `build()`
    /// replaces the entry.
    pub fn resolve(
        &self,
        path: &Path,
        hash: u64,
        build: impl FnOnce() -> SemanticContext,
    ) -> Arc<SemanticContext> {
        if let Some(entry) = self.entries.get(path) {
            if entry.0 == hash {
                return Arc::clone(&entry.1);
            }
        }
        let ctx = Arc::new(build());
        self.entries
            .insert(path.to_path_buf(), (hash, Arc::clone(&ctx)));
        ctx
    }

    pub fn get(&self, path: &Path) -> Option<Arc<SemanticContext>> {
        self.entries.get(path).map(|e| Arc::clone(&e.1))
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
