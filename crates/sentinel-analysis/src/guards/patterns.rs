//! Recognizers for data-access, network and file-system calls shared by the
//! repeated-query and error-handling guards.

use tree_sitter::Node;

use crate::tree::query::{call_arguments, callee_name, callee_receiver, string_literal_value};
use crate::tree::SourceTree;

/// ORM finder methods.
pub const ORM_FINDERS: &[&str] = &[
    "findUnique",
    "findUniqueOrThrow",
    "findFirst",
    "findFirstOrThrow",
    "findMany",
    "findOne",
    "findOneBy",
    "findOneOrFail",
    "findById",
    "findByPk",
    "findAll",
    "findAndCountAll",
];

/// Aggregates that only count as data access on a database-like receiver.
const ORM_AGGREGATES: &[&str] = &["count", "aggregate", "groupBy"];

/// Query-builder entry points (`.from('table')`, `.rpc('fn')`).
pub const QUERY_BUILDER_STARTS: &[&str] = &["from", "rpc"];

/// Raw query methods, recognized on database-like receivers only.
const RAW_QUERY_METHODS: &[&str] = &["query", "raw", "$queryRaw", "$executeRaw"];

const DB_RECEIVER_HINTS: &[&str] = &[
    "db", "pool", "client", "knex", "sql", "prisma", "sequelize", "connection", "supabase",
];

const NETWORK_FUNCTIONS: &[&str] = &["fetch", "axios", "ky", "got"];
const NETWORK_MODULES: &[&str] = &["axios", "ky", "got", "http", "https"];
/// Methods on a network module or client that issue a request.
const REQUEST_METHODS: &[&str] = &[
    "get", "post", "put", "patch", "delete", "head", "options", "request",
];

/// Built-ins whose `from(..)` converts a value rather than selecting a table.
const BUILTIN_CONVERTERS: &[&str] = &[
    "Array",
    "Buffer",
    "Object",
    "String",
    "Set",
    "Map",
    "Promise",
    "Blob",
    "Iterator",
    "Int8Array",
    "Uint8Array",
    "Uint8ClampedArray",
    "Int16Array",
    "Uint16Array",
    "Int32Array",
    "Uint32Array",
    "Float32Array",
    "Float64Array",
    "BigInt64Array",
    "BigUint64Array",
];

const FS_MODULES: &[&str] = &["fs", "fs/promises", "node:fs", "node:fs/promises"];
const FS_RECEIVERS: &[&str] = &["fs", "fs.promises", "fsp", "fsPromises"];

/// What a recognized call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    QueryBuilder,
    Orm,
    Network,
    FileSystem,
}

/// A recognized async-operation call site.
#[derive(Debug, Clone)]
pub struct AccessCall<'t> {
    pub node: Node<'t>,
    pub kind: AccessKind,
    /// Short callee label used in messages and fingerprints.
    pub label: String,
}

fn db_like(receiver: &str) -> bool {
    let lower = receiver.to_ascii_lowercase();
    DB_RECEIVER_HINTS.iter().any(|h| lower.contains(h))
}

/// Root identifier of a member receiver (`axios` for `axios.create().get`).
fn receiver_root(receiver: &str) -> &str {
    let end = receiver
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(receiver.len());
    &receiver[..end]
}

fn short_label(tree: &SourceTree, call: Node, fallback: &str) -> String {
    let text = call
        .child_by_field_name("function")
        .map(|f| tree.text(f))
        .unwrap_or(fallback);
    if text.is_empty() || text.len() > 40 || text.contains(|c| c == '\n' || c == '(') {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

/// Whether `name` was imported from a node file-system module.
fn imported_from_fs(tree: &SourceTree, name: &str) -> bool {
    tree.semantic()
        .imports()
        .iter()
        .any(|i| FS_MODULES.contains(&i.source.as_str()) && i.names.iter().any(|n| n == name))
}

/// Classify a `call_expression`. Returns `None` for calls that are not
/// async operations.
pub fn classify_call<'t>(tree: &SourceTree, call: Node<'t>) -> Option<AccessCall<'t>> {
    if call.kind() != "call_expression" {
        return None;
    }
    let src = tree.bytes();
    let name = callee_name(call, src)?;
    let receiver = callee_receiver(call, src);

    let kind = match receiver {
        None => {
            if NETWORK_FUNCTIONS.contains(&name) {
                AccessKind::Network
            } else if !name.ends_with("Sync") && imported_from_fs(tree, name) {
                AccessKind::FileSystem
            } else {
                return None;
            }
        }
        Some(receiver) => {
            let root = receiver_root(receiver);
            if QUERY_BUILDER_STARTS.contains(&name) {
                if BUILTIN_CONVERTERS.contains(&root) || !is_table_selection(call, src) {
                    return None;
                }
                AccessKind::QueryBuilder
            } else if RAW_QUERY_METHODS.contains(&name) && db_like(receiver) {
                AccessKind::QueryBuilder
            } else if ORM_FINDERS.contains(&name)
                || (ORM_AGGREGATES.contains(&name) && db_like(receiver))
            {
                AccessKind::Orm
            } else if NETWORK_MODULES.contains(&root) && REQUEST_METHODS.contains(&name) {
                AccessKind::Network
            } else if (FS_RECEIVERS.contains(&receiver) || imported_from_fs(tree, root))
                && !name.ends_with("Sync")
            {
                AccessKind::FileSystem
            } else {
                return None;
            }
        }
    };

    let label = match kind {
        AccessKind::QueryBuilder | AccessKind::Orm => name.to_string(),
        AccessKind::Network | AccessKind::FileSystem => short_label(tree, call, name),
    };
    Some(AccessCall {
        node: call,
        kind,
        label,
    })
}

/// `.from('<table>')` or `.rpc('<fn>')` with a literal name.
fn is_table_selection(call: Node, src: &[u8]) -> bool {
    call_arguments(call)
        .first()
        .is_some_and(|arg| string_literal_value(*arg, src).is_some())
}

/// A `fetch` target built from a parameter: a template with substitutions,
/// or a concatenation, pointing at an internal path.
pub fn is_parameterized_internal_target(arg: Node, src: &[u8]) -> bool {
    let text = arg.utf8_text(src).unwrap_or("");
    let internal = |body: &str| body.starts_with('/') || body.contains("/api/");
    match arg.kind() {
        "template_string" => {
            let mut cursor = arg.walk();
            let parameterized = arg
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            parameterized && internal(text.trim_start_matches('`'))
        }
        "binary_expression" => {
            let mut leftmost = arg;
            while leftmost.kind() == "binary_expression" {
                match leftmost.child_by_field_name("left") {
                    Some(left) => leftmost = left,
                    None => break,
                }
            }
            text.contains('+')
                && string_literal_value(leftmost, src).is_some_and(internal)
        }
        _ => false,
    }
}
