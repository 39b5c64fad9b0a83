//! Tenant-isolation guard tests.

use std::path::Path;

use sentinel_analysis::fixes::apply_edits;
use sentinel_analysis::guards::{Guard, TenantIsolationGuard};
use sentinel_analysis::TreeBuilder;
use sentinel_core::config::TenantConfig;
use sentinel_core::{Category, Severity, Violation};

const ROUTE: &str = "app/api/orders/route.ts";

fn guard() -> TenantIsolationGuard {
    TenantIsolationGuard::new(&TenantConfig::default())
}

fn check_with(guard: &TenantIsolationGuard, src: &str) -> Vec<Violation> {
    let builder = TreeBuilder::new();
    let tree = builder.build_from_source(Path::new(ROUTE), src).unwrap();
    guard.check(&tree, Path::new(ROUTE)).unwrap()
}

fn check(src: &str) -> Vec<Violation> {
    check_with(&guard(), src)
}

fn fixed(src: &str, violation: &Violation) -> String {
    apply_edits(src, &violation.quick_fix.as_ref().unwrap().edits).unwrap()
}

const UNFILTERED: &str = r#"import { createClient } from '@/lib/supabase';

export async function GET(request: Request) {
  const supabase = createClient();
  const { data } = await supabase.from('orders').select('*');
  return Response.json(data);
}
"#;

#[test]
fn test_unfiltered_select_is_flagged() {
    let violations = check(UNFILTERED);
    assert_eq!(violations.len(), 1);
    let v = &violations[0];
    assert_eq!(v.guard, "tenant-isolation");
    assert_eq!(v.severity, Severity::Error);
    assert_eq!(v.category, Category::Security);
    assert_eq!(v.fingerprint, "tenant-isolation:orders:select:0");
    assert!(v.message.contains("'orders'"));
    assert!(v.suggestion.as_deref().unwrap().contains(".eq('tenant_id', tenantId)"));

    let line_text = UNFILTERED.lines().nth(4).unwrap();
    assert_eq!(v.line, 5);
    assert_eq!(v.column, line_text.find("from").unwrap() as u32 + 1);
}

/// The fix filters the chain and extracts the tenant variable when it is not
/// in scope; the fixed source no longer trips the guard.
#[test]
fn test_fix_filters_and_extracts_variable() {
    let violations = check(UNFILTERED);
    let fix = violations[0].quick_fix.as_ref().unwrap();
    assert_eq!(fix.edits.len(), 2);

    let out = fixed(UNFILTERED, &violations[0]);
    assert!(out.contains(
        "export async function GET(request: Request) {\n  const tenantId = request.headers.get('x-tenant-id');\n  const supabase = createClient();"
    ));
    assert!(out.contains("supabase.from('orders').eq('tenant_id', tenantId).select('*')"));
    assert!(check(&out).is_empty());
}

#[test]
fn test_filter_before_terminal_passes() {
    let src = r#"export async function GET(tenantId: string) {
  return supabase.from('orders').eq('tenant_id', tenantId).select('*');
}
"#;
    assert!(check(src).is_empty());
}

#[test]
fn test_filter_after_terminal_does_not_count() {
    let src = r#"export async function GET(tenantId: string) {
  return supabase.from('orders').select('*').eq('tenant_id', tenantId);
}
"#;
    assert_eq!(check(src).len(), 1);
}

#[test]
fn test_match_object_counts_as_filter() {
    let src = r#"export async function GET(tenantId: string) {
  return supabase.from('customers').match({ tenant_id: tenantId }).select();
}
"#;
    assert!(check(src).is_empty());
}

#[test]
fn test_unscoped_resources_and_chains_without_terminal_are_ignored() {
    let src = r#"export async function GET() {
  const countries = await supabase.from('countries').select('*');
  const pending = supabase.from('orders');
  const copy = Array.from(countries);
  return { copy, pending };
}
"#;
    assert!(check(src).is_empty());
}

/// A variable already in scope produces a single filter edit.
#[test]
fn test_insert_payload_fix_adds_field() {
    let src = r#"export async function createOrder(tenantId: string) {
  await supabase.from('orders').insert({ total: 10 });
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "tenant-isolation:orders:insert:0");
    assert_eq!(violations[0].quick_fix.as_ref().unwrap().edits.len(), 1);

    let out = fixed(src, &violations[0]);
    assert!(out.contains(".insert({ tenant_id: tenantId, total: 10 })"));
    assert!(check(&out).is_empty());
}

#[test]
fn test_scoped_insert_payloads_pass() {
    let src = r#"export async function seed(tenantId: string) {
  await supabase.from('orders').insert({ tenant_id: tenantId, total: 1 });
  await supabase.from('invoices').insert([{ tenant_id: tenantId }, { tenant_id: tenantId }]);
}
"#;
    assert!(check(src).is_empty());
}

#[test]
fn test_fingerprints_are_ordinal_per_chain() {
    let src = r#"export async function GET() {
  const a = await supabase.from('orders').select('*');
  const b = await supabase.from('orders').select('id');
  return [a, b];
}
"#;
    let violations = check(src);
    let fingerprints: Vec<&str> = violations.iter().map(|v| v.fingerprint.as_str()).collect();
    assert_eq!(
        fingerprints,
        vec!["tenant-isolation:orders:select:0", "tenant-isolation:orders:select:1"]
    );
}

#[test]
fn test_custom_field_and_resources() {
    let guard = TenantIsolationGuard::new(&TenantConfig {
        resources: vec!["accounts".into()],
        field: Some("org_id".into()),
        variable: Some("orgId".into()),
        extraction: Some("const orgId = session.orgId;".into()),
    });
    let src = r#"export async function GET() {
  const orders = await supabase.from('orders').select('*');
  const accounts = await supabase.from('accounts').select('*');
  return [orders, accounts];
}
"#;
    let violations = check_with(&guard, src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "tenant-isolation:accounts:select:0");

    let out = fixed(src, &violations[0]);
    assert!(out.contains("const orgId = session.orgId;"));
    assert!(out.contains(".from('accounts').eq('org_id', orgId).select('*')"));
    assert!(check_with(&guard, &out).is_empty());
}

/// Module-level queries get the extraction above the statement.
#[test]
fn test_module_level_extraction() {
    let src = "const rows = supabase.from('orders').select('*');\n";
    let violations = check(src);
    let out = fixed(src, &violations[0]);
    assert!(out.starts_with("const tenantId = request.headers.get('x-tenant-id');\nconst rows"));
}

/// An expression-bodied arrow gets a block body so the extracted variable is
/// bound where the filter uses it.
#[test]
fn test_expression_arrow_gets_block_body() {
    let src = "export const listOrders = () => supabase.from('orders').select('*');\n";
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].quick_fix.as_ref().unwrap().edits.len(), 3);

    let out = fixed(src, &violations[0]);
    assert_eq!(
        out,
        "export const listOrders = () => {\n  const tenantId = request.headers.get('x-tenant-id');\n  return supabase.from('orders').eq('tenant_id', tenantId).select('*');\n};\n"
    );
    assert!(check(&out).is_empty());
}
