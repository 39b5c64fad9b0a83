//! Tenant-isolation guard: queries on tenant-scoped resources must filter by
//! the tenant field before the chain's terminal call.

use std::path::Path;

use rustc_hash::FxHashSet;
use sentinel_core::config::{TenantConfig, GUARD_TENANT_ISOLATION};
use sentinel_core::errors::GuardError;
use sentinel_core::{Category, FixDescriptor, Severity, TextEdit, Violation};
use tree_sitter::Node;

use super::traits::Guard;
use crate::tree::query::{
    call_arguments, callee_anchor, callee_name, callee_receiver, chain_parent_call,
    enclosing_function, enclosing_statement, find_calls_by_name, indent_of, line_start,
    object_has_key, string_literal_value,
};
use crate::tree::{Dialect, SourceTree};

/// Calls that end the filterable part of a chain.
const TERMINALS: &[&str] = &["select", "insert", "update", "upsert", "delete"];

pub struct TenantIsolationGuard {
    resources: FxHashSet<String>,
    field: String,
    variable: String,
    extraction: String,
}

impl TenantIsolationGuard {
    pub fn new(config: &TenantConfig) -> Self {
        Self {
            resources: config.effective_resources().into_iter().collect(),
            field: config.effective_field(),
            variable: config.effective_variable(),
            extraction: config.effective_extraction(),
        }
    }

    fn is_tenant_filter(&self, call: Node, src: &[u8]) -> bool {
        let Some(name) = callee_name(call, src) else {
            return false;
        };
        let args = call_arguments(call);
        let Some(first) = args.first().copied() else {
            return false;
        };
        match name {
            "eq" | "filter" | "where" if string_literal_value(first, src) == Some(self.field.as_str()) => true,
            "match" | "where" => object_has_key(first, src, &self.field),
            _ => false,
        }
    }

    /// Walk forward from `.from(..)` to the first terminal. Returns the
    /// terminal call and whether a tenant filter preceded it.
    fn walk_chain<'t>(&self, from_call: Node<'t>, src: &[u8]) -> Option<(Node<'t>, bool)> {
        let mut filtered = false;
        let mut current = from_call;
        while let Some(next) = chain_parent_call(current) {
            let name = callee_name(next, src)?;
            if TERMINALS.contains(&name) {
                return Some((next, filtered));
            }
            filtered |= self.is_tenant_filter(next, src);
            current = next;
        }
        None
    }

    /// Insert/upsert payloads that already carry the tenant field.
    fn payload_scoped(&self, terminal: Node, terminal_name: &str, src: &[u8]) -> bool {
        if !matches!(terminal_name, "insert" | "upsert") {
            return false;
        }
        let args = call_arguments(terminal);
        let Some(payload) = args.first().copied() else {
            return false;
        };
        match payload.kind() {
            "object" => object_has_key(payload, src, &self.field),
            "array" => {
                let mut cursor = payload.walk();
                let rows: Vec<Node> = payload.named_children(&mut cursor).collect();
                !rows.is_empty() && rows.iter().all(|row| object_has_key(*row, src, &self.field))
            }
            _ => false,
        }
    }

    fn build_fix(&self, tree: &SourceTree, from_call: Node, terminal: Node, terminal_name: &str) -> FixDescriptor {
        let object_payload = call_arguments(terminal)
            .first()
            .copied()
            .filter(|p| p.kind() == "object" && matches!(terminal_name, "insert" | "upsert"));

        let mut fix = match object_payload {
            Some(payload) => FixDescriptor::new(format!(
                "Add {} to the {terminal_name} payload",
                self.field
            ))
            .with_edit(TextEdit::insert(
                payload.start_byte() + 1,
                format!(" {}: {},", self.field, self.variable),
            )),
            None => {
                let insert_at = terminal
                    .child_by_field_name("function")
                    .and_then(|f| f.child_by_field_name("object"))
                    .map_or(from_call.end_byte(), |o| o.end_byte());
                FixDescriptor::new(format!(
                    "Filter by {} before .{terminal_name}()",
                    self.field
                ))
                .with_edit(TextEdit::insert(
                    insert_at,
                    format!(".eq('{}', {})", self.field, self.variable),
                ))
            }
        };

        if !tree.semantic().is_bound_at(from_call.start_byte(), &self.variable) {
            fix.edits.extend(self.extraction_edits(tree, from_call));
        }
        fix
    }

    /// Declare the tenant variable at the top of the enclosing function body,
    /// or above the statement at module level. An expression-bodied arrow is
    /// given a block body that declares the variable and returns the
    /// expression.
    fn extraction_edits(&self, tree: &SourceTree, node: Node) -> Vec<TextEdit> {
        let src = tree.source();
        let Some(function) = enclosing_function(node) else {
            let stmt = enclosing_statement(node);
            let indent = indent_of(src, stmt.start_byte());
            return vec![TextEdit::insert(
                line_start(src, stmt.start_byte()),
                format!("{indent}{}\n", self.extraction),
            )];
        };
        let Some(body) = function.child_by_field_name("body") else {
            return Vec::new();
        };

        let outer = indent_of(src, function.start_byte());
        if body.kind() != "statement_block" {
            return vec![
                TextEdit::insert(
                    body.start_byte(),
                    format!("{{\n{outer}  {}\n{outer}  return ", self.extraction),
                ),
                TextEdit::insert(body.end_byte(), format!(";\n{outer}}}")),
            ];
        }

        let indent = match body.named_child(0) {
            Some(first) if first.start_position().row != body.start_position().row => {
                indent_of(src, first.start_byte()).to_string()
            }
            _ => format!("{outer}  "),
        };
        vec![TextEdit::insert(
            body.start_byte() + 1,
            format!("\n{indent}{}", self.extraction),
        )]
    }
}

impl Guard for TenantIsolationGuard {
    fn name(&self) -> &'static str {
        GUARD_TENANT_ISOLATION
    }

    fn should_process(&self, path: &Path) -> bool {
        Dialect::from_path(path).is_some()
    }

    fn check(&self, tree: &SourceTree, path: &Path) -> Result<Vec<Violation>, GuardError> {
        let src = tree.bytes();
        let mut violations = Vec::new();
        let mut ordinal = 0usize;

        for from_call in find_calls_by_name(tree.root(), src, &["from"]) {
            if callee_receiver(from_call, src).is_none() {
                continue;
            }
            let args = call_arguments(from_call);
            let Some(resource) = args.first().and_then(|a| string_literal_value(*a, src)) else {
                continue;
            };
            if !self.resources.contains(resource) {
                continue;
            }
            let Some((terminal, filtered)) = self.walk_chain(from_call, src) else {
                continue;
            };
            let index = ordinal;
            ordinal += 1;

            let terminal_name = callee_name(terminal, src).unwrap_or("select");
            if filtered || self.payload_scoped(terminal, terminal_name, src) {
                continue;
            }

            let anchor = callee_anchor(from_call);
            violations.push(
                Violation::new(
                    GUARD_TENANT_ISOLATION,
                    Category::Security,
                    Severity::Error,
                    format!(
                        "Query on tenant-scoped resource '{resource}' is missing a {} filter before .{terminal_name}()",
                        self.field
                    ),
                    path,
                    tree.position(anchor),
                    format!("{GUARD_TENANT_ISOLATION}:{resource}:{terminal_name}:{index}"),
                )
                .with_suggestion(format!(
                    "Add .eq('{}', {}) before .{terminal_name}()",
                    self.field, self.variable
                ))
                .with_fix(self.build_fix(tree, from_call, terminal, terminal_name)),
            );
        }

        Ok(violations)
    }
}
