//! Repeated-query guard tests.

use std::path::Path;

use sentinel_analysis::fixes::apply_edits;
use sentinel_analysis::guards::n_plus_one::ADVISORY_MARKER;
use sentinel_analysis::guards::{Guard, NPlusOneGuard};
use sentinel_analysis::TreeBuilder;
use sentinel_core::{Category, Severity, Violation};

const FILE: &str = "src/lib/orders.ts";

fn check(src: &str) -> Vec<Violation> {
    let builder = TreeBuilder::new();
    let tree = builder.build_from_source(Path::new(FILE), src).unwrap();
    NPlusOneGuard::new().check(&tree, Path::new(FILE)).unwrap()
}

const FOR_OF: &str = r#"export async function loadOrders(ids: string[]) {
  const orders = [];
  for (const id of ids) {
    const { data } = await supabase.from('orders').select('*').eq('id', id);
    orders.push(data);
  }
  return orders;
}
"#;

#[test]
fn test_query_in_for_of_loop() {
    let violations = check(FOR_OF);
    assert_eq!(violations.len(), 1);
    let v = &violations[0];
    assert_eq!(v.severity, Severity::Warning);
    assert_eq!(v.category, Category::Performance);
    assert_eq!(v.fingerprint, "n-plus-one:for-of:0");
    assert_eq!((v.line, v.column), (3, 3));
    assert!(v.message.contains("from()"));
    assert!(v.message.contains("for-of loop"));
}

#[test]
fn test_orm_call_in_map_callback() {
    let src = r#"export async function loadUsers(ids: string[]) {
  const users = await Promise.all(ids.map((id) => prisma.user.findUnique({ where: { id } })));
  return users;
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "n-plus-one:map:0");
    assert!(violations[0].message.contains(".map() callback"));
}

/// Only parameterized internal fetch targets count as repeated queries.
#[test]
fn test_fetch_targets() {
    let internal = r#"export async function refresh(ids: string[]) {
  for (const id of ids) {
    await fetch(`/api/orders/${id}`);
  }
}
"#;
    assert_eq!(check(internal).len(), 1);

    let external = r#"export async function refresh(ids: string[]) {
  for (const id of ids) {
    await fetch(`https://example.com/items/${id}`);
    await fetch('/api/orders');
  }
}
"#;
    assert!(check(external).is_empty());
}

#[test]
fn test_queries_outside_loops_pass() {
    let src = r#"export async function loadAll(ids: string[]) {
  const { data } = await supabase.from('orders').select('*').eq('batch', ids[0]);
  const copies = [];
  for (const row of data) {
    copies.push(Array.from(row.tags));
  }
  return copies;
}
"#;
    assert!(check(src).is_empty());
}

/// The innermost site owns the query; its ordinal counts every site.
#[test]
fn test_nested_sites_report_innermost() {
    let src = r#"export function sync(groups: string[][]) {
  groups.forEach((group) => {
    for (const id of group) {
      db.query('select 1', [id]);
    }
  });
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "n-plus-one:for-of:1");
}

#[test]
fn test_while_loop() {
    let src = r#"export async function drain(db: Pool) {
  let cursor = await db.query('select 1');
  while (cursor) {
    cursor = await db.query('select next');
  }
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "n-plus-one:while:0");
}

/// The advisory fix adds a comment once; afterwards the fix is empty and the
/// finding remains.
#[test]
fn test_advisory_fix_is_idempotent() {
    let violations = check(FOR_OF);
    let out = apply_edits(FOR_OF, &violations[0].quick_fix.as_ref().unwrap().edits).unwrap();
    let marker_line = out.lines().nth(2).unwrap();
    assert!(marker_line.starts_with("  // "));
    assert!(marker_line.contains(ADVISORY_MARKER));

    let again = check(&out);
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].fingerprint, "n-plus-one:for-of:0");
    assert!(again[0].quick_fix.as_ref().unwrap().is_noop());
}

/// Built-in `from` converters inside loops are not queries.
#[test]
fn test_builtin_from_in_loops_is_not_a_query() {
    let src = r#"export function encode(xs: string[]) {
  const views = xs.map((x) => Buffer.from('abc'));
  for (const x of xs) {
    views.push(Uint8Array.from([x.length]));
  }
  return views;
}
"#;
    assert!(check(src).is_empty());
}
