//! Error-handling guard: async operations in handler, service and library
//! code must be covered by try/catch or a `.catch(..)` in their chain.

use std::path::Path;

use rustc_hash::FxHashMap;
use sentinel_core::config::GUARD_ERROR_HANDLING;
use sentinel_core::errors::GuardError;
use sentinel_core::{Category, FixDescriptor, Severity, TextEdit, Violation};
use tree_sitter::Node;

use super::patterns::{classify_call, AccessCall};
use super::traits::Guard;
use crate::tree::query::{
    callee_anchor, chain_top, enclosing_statement, indent_of, is_guarded, pattern_names, walk,
};
use crate::tree::SourceTree;

const HANDLER_DIRS: &[&str] = &[
    "api", "app", "services", "service", "lib", "handlers", "server", "actions",
];

/// Handler, service or library locations.
pub fn is_handler_location(path: &Path) -> bool {
    let stem_matches = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s == "route" || s.ends_with(".service"));
    stem_matches
        || path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|c| HANDLER_DIRS.contains(&c))
}

/// Indent every line after the first by `extra`. Text containing template
/// literals is returned as is.
fn reindent(text: &str, extra: &str) -> String {
    if text.contains('`') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 16);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.trim().is_empty() {
                out.push_str(extra);
            }
        }
        out.push_str(line);
    }
    out
}

#[derive(Default)]
pub struct ErrorHandlingGuard;

impl ErrorHandlingGuard {
    pub fn new() -> Self {
        Self
    }

    /// `const x = await op(), y = 1` → (`let x, y;`, [`x = await op()`,
    /// `y = 1`]), so every binding stays visible after the try block.
    fn split_declaration(tree: &SourceTree, statement: Node) -> Option<(String, Vec<String>)> {
        if !matches!(statement.kind(), "lexical_declaration" | "variable_declaration") {
            return None;
        }
        let mut cursor = statement.walk();
        let declarators: Vec<Node> = statement
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "variable_declarator")
            .collect();
        if declarators.is_empty() {
            return None;
        }

        let mut bindings = Vec::new();
        let mut assignments = Vec::new();
        for declarator in declarators {
            let name = declarator.child_by_field_name("name")?;
            let value = declarator.child_by_field_name("value").map(|v| tree.text(v));
            match name.kind() {
                "identifier" => {
                    let ty = declarator
                        .child_by_field_name("type")
                        .map_or("", |t| tree.text(t));
                    let binding = tree.text(name);
                    bindings.push(format!("{binding}{ty}"));
                    if let Some(value) = value {
                        assignments.push(format!("{binding} = {value}"));
                    }
                }
                "object_pattern" | "array_pattern" => {
                    let value = value?;
                    let before = bindings.len();
                    pattern_names(name, tree.bytes(), &mut bindings);
                    if bindings.len() == before {
                        return None;
                    }
                    let pattern = tree.text(name);
                    assignments.push(if name.kind() == "object_pattern" {
                        format!("({pattern} = {value})")
                    } else {
                        format!("{pattern} = {value}")
                    });
                }
                _ => return None,
            }
        }
        Some((format!("let {};", bindings.join(", ")), assignments))
    }

    fn build_fix(&self, tree: &SourceTree, access: &AccessCall) -> FixDescriptor {
        let src = tree.source();
        let label = access.label.replace('\'', "\\'");
        let log = format!("console.error('{label} failed', error)");
        let top = chain_top(access.node);
        let awaited = top
            .parent()
            .filter(|p| p.kind() == "await_expression")
            .map(enclosing_statement)
            .filter(|stmt| stmt.kind() != "export_statement");

        let append_catch = || {
            FixDescriptor::new(format!("Append .catch() to the {} call", access.label)).with_edit(
                TextEdit::insert(top.end_byte(), format!(".catch((error) => {log})")),
            )
        };
        let Some(statement) = awaited else {
            return append_catch();
        };

        let indent = indent_of(src, statement.start_byte());
        let inner = format!("{indent}  ");
        let catch = format!("{indent}}} catch (error) {{\n{inner}{log};\n{indent}}}");
        let is_declaration = matches!(
            statement.kind(),
            "lexical_declaration" | "variable_declaration"
        );
        let replacement = match Self::split_declaration(tree, statement) {
            Some((declare, assignments)) => {
                let body: Vec<String> = assignments
                    .iter()
                    .map(|a| format!("{inner}{};", reindent(a, "  ")))
                    .collect();
                format!("{declare}\n{indent}try {{\n{}\n{catch}", body.join("\n"))
            }
            // Wrapping would hide the declared bindings from later statements.
            None if is_declaration => return append_catch(),
            None => format!(
                "try {{\n{inner}{}\n{catch}",
                reindent(tree.text(statement), "  ")
            ),
        };
        FixDescriptor::new(format!("Wrap the {} call in try/catch", access.label)).with_edit(
            TextEdit::replace(statement.start_byte(), statement.end_byte(), replacement),
        )
    }
}

impl Guard for ErrorHandlingGuard {
    fn name(&self) -> &'static str {
        GUARD_ERROR_HANDLING
    }

    fn should_process(&self, path: &Path) -> bool {
        is_handler_location(path)
    }

    fn check(&self, tree: &SourceTree, path: &Path) -> Result<Vec<Violation>, GuardError> {
        let src = tree.bytes();
        let mut candidates = Vec::new();
        walk(tree.root(), |node| {
            if let Some(access) = classify_call(tree, node) {
                candidates.push(access);
            }
        });

        let mut ordinals: FxHashMap<String, usize> = FxHashMap::default();
        let mut violations = Vec::new();
        for access in &candidates {
            let counter = ordinals.entry(access.label.clone()).or_insert(0);
            let index = *counter;
            *counter += 1;

            if is_guarded(access.node, src) {
                continue;
            }
            violations.push(
                Violation::new(
                    GUARD_ERROR_HANDLING,
                    Category::Quality,
                    Severity::Warning,
                    format!(
                        "{}() is not wrapped in try/catch and has no .catch() handler",
                        access.label
                    ),
                    path,
                    tree.position(callee_anchor(access.node)),
                    format!("{GUARD_ERROR_HANDLING}:{}:{index}", access.label),
                )
                .with_suggestion("Handle the failure with try/catch or .catch()")
                .with_fix(self.build_fix(tree, access)),
            );
        }
        Ok(violations)
    }
}
