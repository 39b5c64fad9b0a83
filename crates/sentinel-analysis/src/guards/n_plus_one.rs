//! Repeated-query guard: data access nested in loops and collection-mapping
//! callbacks runs once per element.

use std::path::Path;

use sentinel_core::config::GUARD_N_PLUS_ONE;
use sentinel_core::errors::GuardError;
use sentinel_core::{Category, FixDescriptor, Severity, TextEdit, Violation};
use tree_sitter::Node;

use super::patterns::{classify_call, is_parameterized_internal_target, AccessCall, AccessKind};
use super::traits::Guard;
use crate::tree::query::{
    call_arguments, callee_anchor, callee_name, callee_receiver, enclosing_statement, indent_of,
    is_function, line_start, previous_line, walk,
};
use crate::tree::{Dialect, SourceTree};

const MAPPING_METHODS: &[&str] = &["map", "forEach", "flatMap", "filter", "reduce", "some", "every"];

/// Marker text of the advisory comment; its presence makes the fix a no-op.
pub const ADVISORY_MARKER: &str = "possible N+1 query";

/// A loop or mapping callback whose body runs once per element.
struct Site<'t> {
    /// `for`, `for-of`, `for-in`, `while`, `do`, or the mapping method name.
    kind: String,
    anchor: Node<'t>,
    /// Node the site's statement is computed from.
    node: Node<'t>,
    body: Node<'t>,
}

fn loop_kind(node: Node, src: &[u8]) -> Option<&'static str> {
    match node.kind() {
        "for_statement" => Some("for"),
        "for_in_statement" => {
            let mut cursor = node.walk();
            let is_of = node
                .children(&mut cursor)
                .any(|c| c.utf8_text(src).ok() == Some("of"));
            Some(if is_of { "for-of" } else { "for-in" })
        }
        "while_statement" => Some("while"),
        "do_statement" => Some("do"),
        _ => None,
    }
}

fn as_site<'t>(node: Node<'t>, src: &[u8]) -> Option<Site<'t>> {
    if let Some(kind) = loop_kind(node, src) {
        let body = node.child_by_field_name("body")?;
        return Some(Site {
            kind: kind.to_string(),
            anchor: node,
            node,
            body,
        });
    }
    if node.kind() != "call_expression" {
        return None;
    }
    let method = callee_name(node, src)?;
    if !MAPPING_METHODS.contains(&method) || callee_receiver(node, src).is_none() {
        return None;
    }
    let callback = call_arguments(node).into_iter().find(|a| is_function(*a))?;
    let body = callback.child_by_field_name("body")?;
    Some(Site {
        kind: method.to_string(),
        anchor: callee_anchor(node),
        node,
        body,
    })
}

fn is_repeated_access(access: &AccessCall, src: &[u8]) -> bool {
    match access.kind {
        AccessKind::QueryBuilder | AccessKind::Orm => true,
        AccessKind::Network => {
            callee_name(access.node, src) == Some("fetch")
                && call_arguments(access.node)
                    .first()
                    .is_some_and(|target| is_parameterized_internal_target(*target, src))
        }
        AccessKind::FileSystem => false,
    }
}

/// First data-access call in `body`, not descending into nested sites.
fn first_access<'t>(tree: &SourceTree, body: Node<'t>) -> Option<AccessCall<'t>> {
    let src = tree.bytes();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node != body && as_site(node, src).is_some() {
            continue;
        }
        if let Some(access) = classify_call(tree, node) {
            if is_repeated_access(&access, src) {
                return Some(access);
            }
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

#[derive(Default)]
pub struct NPlusOneGuard;

impl NPlusOneGuard {
    pub fn new() -> Self {
        Self
    }

    /// Advisory comment above the site's statement. Empty when the comment
    /// is already there.
    fn advisory_fix(&self, tree: &SourceTree, site: &Site) -> FixDescriptor {
        let src = tree.source();
        let statement = enclosing_statement(site.node);
        let fix = FixDescriptor::new("Add a note to batch these lookups into one query");
        if previous_line(src, statement.start_byte()).is_some_and(|l| l.contains(ADVISORY_MARKER)) {
            return fix;
        }
        let indent = indent_of(src, statement.start_byte());
        fix.with_edit(TextEdit::insert(
            line_start(src, statement.start_byte()),
            format!(
                "{indent}// {ADVISORY_MARKER}: load all rows with one batched query (e.g. an `in` filter) before iterating\n"
            ),
        ))
    }
}

impl Guard for NPlusOneGuard {
    fn name(&self) -> &'static str {
        GUARD_N_PLUS_ONE
    }

    fn should_process(&self, path: &Path) -> bool {
        Dialect::from_path(path).is_some()
    }

    fn check(&self, tree: &SourceTree, path: &Path) -> Result<Vec<Violation>, GuardError> {
        let src = tree.bytes();
        let mut sites = Vec::new();
        walk(tree.root(), |node| {
            if let Some(site) = as_site(node, src) {
                sites.push(site);
            }
        });

        let mut violations = Vec::new();
        for (ordinal, site) in sites.iter().enumerate() {
            let Some(access) = first_access(tree, site.body) else {
                continue;
            };
            let site_label = match site.kind.as_str() {
                "for" | "for-of" | "for-in" | "while" | "do" => format!("a {} loop", site.kind),
                method => format!("a .{method}() callback"),
            };
            violations.push(
                Violation::new(
                    GUARD_N_PLUS_ONE,
                    Category::Performance,
                    Severity::Warning,
                    format!(
                        "Possible N+1 query: {}() runs once per element inside {site_label}",
                        access.label
                    ),
                    path,
                    tree.position(site.anchor),
                    format!("{GUARD_N_PLUS_ONE}:{}:{ordinal}", site.kind),
                )
                .with_suggestion(
                    "Fetch all rows in one query before the loop and look them up in memory",
                )
                .with_fix(self.advisory_fix(tree, site)),
            );
        }
        Ok(violations)
    }
}
