//! Query helpers shared by every guard.
//!
//! All helpers work on borrowed tree-sitter nodes plus the source bytes the
//! tree was parsed from; none of them allocate a new tree.

use aho_corasick::AhoCorasick;
use tree_sitter::Node;

/// Node kinds that open a function scope.
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Parents whose direct children are statements.
const STATEMENT_CONTAINERS: &[&str] = &["program", "statement_block", "switch_case", "switch_default"];

pub fn is_function(node: Node) -> bool {
    FUNCTION_KINDS.contains(&node.kind())
}

/// Visit `root` and all of its descendants in document order.
pub fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node() == root {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// All nodes under `root` (inclusive) whose kind is one of `kinds`.
pub fn find_nodes_by_kind<'t>(root: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    walk(root, |node| {
        if kinds.contains(&node.kind()) {
            out.push(node);
        }
    });
    out
}

/// Name being called: the identifier for `f(..)`, the property for `a.b.f(..)`.
pub fn callee_name<'s>(call: Node, src: &'s [u8]) -> Option<&'s str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => function.utf8_text(src).ok(),
        "member_expression" => function
            .child_by_field_name("property")?
            .utf8_text(src)
            .ok(),
        _ => None,
    }
}

/// Receiver text of a member call (`a.b` for `a.b.f(..)`).
pub fn callee_receiver<'s>(call: Node, src: &'s [u8]) -> Option<&'s str> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "member_expression" {
        return None;
    }
    function.child_by_field_name("object")?.utf8_text(src).ok()
}

/// Node a finding about `call` is anchored at: the property of a member
/// call, otherwise the call itself.
pub fn callee_anchor(call: Node) -> Node {
    call.child_by_field_name("function")
        .filter(|f| f.kind() == "member_expression")
        .and_then(|f| f.child_by_field_name("property"))
        .unwrap_or(call)
}

/// Call expressions whose callee name is one of `names`, either as a direct
/// identifier call or as a member-access call.
pub fn find_calls_by_name<'t>(root: Node<'t>, src: &[u8], names: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    walk(root, |node| {
        if node.kind() == "call_expression" {
            if let Some(name) = callee_name(node, src) {
                if names.contains(&name) {
                    out.push(node);
                }
            }
        }
    });
    out
}

/// Top-level import declarations, in order.
pub fn find_imports(root: Node) -> Vec<Node> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|n| n.kind() == "import_statement")
        .collect()
}

/// Positional arguments of a call, skipping punctuation and comments.
pub fn call_arguments(call: Node) -> Vec<Node> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// 1-based (line, byte column) of a node's start.
pub fn position(node: Node) -> (u32, u32) {
    let point = node.start_position();
    (point.row as u32 + 1, point.column as u32 + 1)
}

/// Content of a string literal, or of a template string without
/// substitutions. Escapes are left as written.
pub fn string_literal_value<'s>(node: Node, src: &'s [u8]) -> Option<&'s str> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution")
            {
                return None;
            }
        }
        _ => return None,
    }
    let text = node.utf8_text(src).ok()?;
    if text.len() < 2 {
        return None;
    }
    text.get(1..text.len() - 1)
}

/// Free-text containment of any pattern.
pub fn contains_any<P: AsRef<[u8]>>(text: &str, patterns: &[P]) -> bool {
    match AhoCorasick::new(patterns) {
        Ok(ac) => ac.is_match(text),
        Err(e) => {
            tracing::warn!(error = %e, "could not build pattern matcher");
            false
        }
    }
}

/// Whether an object literal has `key` as a property name.
pub fn object_has_key(object: Node, src: &[u8], key: &str) -> bool {
    if object.kind() != "object" {
        return false;
    }
    let mut cursor = object.walk();
    let found = object.named_children(&mut cursor).any(|prop| match prop.kind() {
        "shorthand_property_identifier" => prop.utf8_text(src).ok() == Some(key),
        "pair" => prop.child_by_field_name("key").is_some_and(|k| {
            let text = k.utf8_text(src).unwrap_or("");
            text == key || string_literal_value(k, src) == Some(key)
        }),
        _ => false,
    });
    found
}

/// Nearest enclosing function-like node.
pub fn enclosing_function(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if is_function(parent) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// The statement containing `node`: the ancestor (or `node` itself) whose
/// parent is a program, block or switch arm.
pub fn enclosing_statement(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if STATEMENT_CONTAINERS.contains(&parent.kind()) {
            return current;
        }
        current = parent;
    }
    current
}

/// `a.f()` → the call of `.g` in `a.f().g()`, if the chain continues.
pub fn chain_parent_call<'t>(call: Node<'t>) -> Option<Node<'t>> {
    let member = call.parent()?;
    if member.kind() != "member_expression" || member.child_by_field_name("object") != Some(call) {
        return None;
    }
    let outer = member.parent()?;
    if outer.kind() == "call_expression" && outer.child_by_field_name("function") == Some(member) {
        Some(outer)
    } else {
        None
    }
}

/// Outermost call of the member chain `call` belongs to.
pub fn chain_top(call: Node) -> Node {
    let mut top = call;
    while let Some(next) = chain_parent_call(top) {
        top = next;
    }
    top
}

/// True when `call` is lexically inside the body of a `try` that has a
/// `catch` clause, or a `.catch(..)` appears later in its call chain.
pub fn is_guarded(call: Node, src: &[u8]) -> bool {
    let mut link = call;
    while let Some(next) = chain_parent_call(link) {
        if callee_name(next, src) == Some("catch") {
            return true;
        }
        link = next;
    }

    let mut current = call.parent();
    while let Some(parent) = current {
        if parent.kind() == "try_statement" && parent.child_by_field_name("handler").is_some() {
            if let Some(body) = parent.child_by_field_name("body") {
                if body.start_byte() <= call.start_byte() && call.end_byte() <= body.end_byte() {
                    return true;
                }
            }
        }
        current = parent.parent();
    }
    false
}

/// Byte offset of the start of the line containing `byte`.
pub fn line_start(src: &str, byte: usize) -> usize {
    let byte = byte.min(src.len());
    src[..byte].rfind('\n').map_or(0, |i| i + 1)
}

/// Leading whitespace of the line containing `byte`.
pub fn indent_of(src: &str, byte: usize) -> &str {
    let start = line_start(src, byte);
    let line = &src[start..];
    let width = line
        .bytes()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    &line[..width]
}

/// Text of the line before the one containing `byte`.
pub fn previous_line(src: &str, byte: usize) -> Option<&str> {
    let start = line_start(src, byte);
    if start == 0 {
        return None;
    }
    let prev_start = line_start(src, start - 1);
    Some(&src[prev_start..start - 1])
}

/// Binding names introduced by a declaration or parameter pattern.
pub fn pattern_names(pattern: Node, src: &[u8], out: &mut Vec<String>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            if let Ok(text) = pattern.utf8_text(src) {
                out.push(text.to_string());
            }
        }
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                pattern_names(value, src, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                pattern_names(left, src, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = pattern.walk();
            for child in pattern.named_children(&mut cursor) {
                pattern_names(child, src, out);
            }
        }
        _ => {}
    }
}
