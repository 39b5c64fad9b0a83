//! Rate-limiting guard: exported request handlers in route files must go
//! through a rate limiter.

use std::path::Path;

use sentinel_core::config::{RateLimitConfig, GUARD_RATE_LIMIT};
use sentinel_core::errors::GuardError;
use sentinel_core::{Category, FixDescriptor, Severity, TextEdit, Violation};
use tree_sitter::Node;

use super::traits::Guard;
use crate::tree::query::{contains_any, find_imports};
use crate::tree::SourceTree;

pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Library and helper names whose presence means the file is rate limited.
const KNOWN_MARKERS: &[&str] = &[
    "@upstash/ratelimit",
    "Ratelimit",
    "rateLimit",
    "rateLimiter",
    "rate-limiter-flexible",
    "express-rate-limit",
];

/// Requests per hour for a handler.
pub fn hourly_quota(method: &str) -> u32 {
    match method {
        "GET" => 1000,
        "DELETE" => 50,
        _ => 100,
    }
}

enum HandlerForm<'t> {
    /// `export async function POST(..) {..}`
    Function(Node<'t>),
    /// `export const POST = ..`; holds the initializer.
    Const(Node<'t>),
    /// `export { handler as POST }`
    Alias,
}

struct Handler<'t> {
    method: &'static str,
    anchor: Node<'t>,
    form: HandlerForm<'t>,
}

fn as_method(text: &str) -> Option<&'static str> {
    HTTP_METHODS.iter().copied().find(|m| *m == text)
}

fn exported_handlers<'t>(tree: &'t SourceTree) -> Vec<Handler<'t>> {
    let root = tree.root();
    let mut handlers = Vec::new();
    let mut cursor = root.walk();
    for export in root.named_children(&mut cursor) {
        if export.kind() != "export_statement" {
            continue;
        }
        if let Some(decl) = export.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" => {
                    if let Some(name) = decl.child_by_field_name("name") {
                        if let Some(method) = as_method(tree.text(name)) {
                            handlers.push(Handler {
                                method,
                                anchor: name,
                                form: HandlerForm::Function(decl),
                            });
                        }
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let mut decl_cursor = decl.walk();
                    for declarator in decl.named_children(&mut decl_cursor) {
                        let (Some(name), Some(value)) = (
                            declarator.child_by_field_name("name"),
                            declarator.child_by_field_name("value"),
                        ) else {
                            continue;
                        };
                        if let Some(method) = as_method(tree.text(name)) {
                            handlers.push(Handler {
                                method,
                                anchor: name,
                                form: HandlerForm::Const(value),
                            });
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        let mut export_cursor = export.walk();
        for clause in export.named_children(&mut export_cursor) {
            if clause.kind() != "export_clause" {
                continue;
            }
            let mut spec_cursor = clause.walk();
            for spec in clause.named_children(&mut spec_cursor) {
                let exported = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"));
                if let Some(method) = exported.and_then(|n| as_method(tree.text(n))) {
                    handlers.push(Handler {
                        method,
                        anchor: spec,
                        form: HandlerForm::Alias,
                    });
                }
            }
        }
    }
    handlers
}

pub struct RateLimitGuard {
    wrapper: String,
    import_path: String,
}

impl RateLimitGuard {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            wrapper: config.effective_wrapper(),
            import_path: config.effective_import_path(),
        }
    }

    fn is_rate_limited(&self, source: &str) -> bool {
        let mut markers: Vec<&str> = KNOWN_MARKERS.to_vec();
        markers.push(&self.wrapper);
        contains_any(source, &markers)
    }

    fn limits(&self, method: &str) -> String {
        format!("{{ requests: {}, window: '1h' }}", hourly_quota(method))
    }

    /// Insert the wrapper import after the last import, or after any leading
    /// directives (`'use server'`) when the file has no imports.
    fn import_edit(&self, tree: &SourceTree) -> Option<TextEdit> {
        if tree.semantic().is_imported(&self.wrapper) {
            return None;
        }
        let statement = format!("import {{ {} }} from '{}';", self.wrapper, self.import_path);
        let root = tree.root();
        if let Some(last) = find_imports(root).last() {
            return Some(TextEdit::insert(last.end_byte(), format!("\n{statement}")));
        }

        let mut cursor = root.walk();
        let last_directive = root
            .named_children(&mut cursor)
            .take_while(|n| {
                n.kind() == "expression_statement"
                    && n.named_child(0).is_some_and(|c| c.kind() == "string")
            })
            .last();
        Some(match last_directive {
            Some(directive) => TextEdit::insert(directive.end_byte(), format!("\n{statement}")),
            None => TextEdit::insert(0, format!("{statement}\n")),
        })
    }

    fn build_fix(&self, tree: &SourceTree, handler: &Handler) -> Option<FixDescriptor> {
        let method = handler.method;
        let wrap = match handler.form {
            HandlerForm::Function(decl) => TextEdit::replace(
                decl.start_byte(),
                decl.end_byte(),
                format!(
                    "const {method} = {}({}, {});",
                    self.wrapper,
                    tree.text(decl),
                    self.limits(method)
                ),
            ),
            HandlerForm::Const(value) => TextEdit::replace(
                value.start_byte(),
                value.end_byte(),
                format!("{}({}, {})", self.wrapper, tree.text(value), self.limits(method)),
            ),
            HandlerForm::Alias => return None,
        };
        let mut fix = FixDescriptor::new(format!("Wrap {method} with {}", self.wrapper)).with_edit(wrap);
        if let Some(import) = self.import_edit(tree) {
            fix = fix.with_edit(import);
        }
        Some(fix)
    }
}

/// Request-handler files: stem `route`, or anywhere under an `api` directory.
pub fn is_request_handler_path(path: &Path) -> bool {
    path.file_stem().is_some_and(|s| s == "route")
        || path.components().any(|c| c.as_os_str() == "api")
}

impl Guard for RateLimitGuard {
    fn name(&self) -> &'static str {
        GUARD_RATE_LIMIT
    }

    fn should_process(&self, path: &Path) -> bool {
        is_request_handler_path(path)
    }

    fn check(&self, tree: &SourceTree, path: &Path) -> Result<Vec<Violation>, GuardError> {
        if self.is_rate_limited(tree.source()) {
            return Ok(Vec::new());
        }

        let violations = exported_handlers(tree)
            .into_iter()
            .map(|handler| {
                let method = handler.method;
                let severity = if method == "GET" {
                    Severity::Warning
                } else {
                    Severity::Error
                };
                let suggestion = match handler.form {
                    HandlerForm::Alias => format!(
                        "{method} is re-exported; apply {} where the handler is defined",
                        self.wrapper
                    ),
                    _ => format!(
                        "Wrap {method} with {}(handler, {})",
                        self.wrapper,
                        self.limits(method)
                    ),
                };
                let violation = Violation::new(
                    GUARD_RATE_LIMIT,
                    Category::Security,
                    severity,
                    format!("{method} handler is exported without rate limiting"),
                    path,
                    tree.position(handler.anchor),
                    format!("{GUARD_RATE_LIMIT}:{method}"),
                )
                .with_suggestion(suggestion);
                match self.build_fix(tree, &handler) {
                    Some(fix) => violation.with_fix(fix),
                    None => violation,
                }
            })
            .collect();
        Ok(violations)
    }
}
