//! Error-handling guard tests.

use std::path::Path;

use sentinel_analysis::fixes::apply_edits;
use sentinel_analysis::guards::{ErrorHandlingGuard, Guard};
use sentinel_analysis::TreeBuilder;
use sentinel_core::{Category, Severity, Violation};

const FILE: &str = "src/lib/profile.ts";

fn check(src: &str) -> Vec<Violation> {
    let builder = TreeBuilder::new();
    let tree = builder.build_from_source(Path::new(FILE), src).unwrap();
    ErrorHandlingGuard::new().check(&tree, Path::new(FILE)).unwrap()
}

fn fixed(src: &str, violation: &Violation) -> String {
    apply_edits(src, &violation.quick_fix.as_ref().unwrap().edits).unwrap()
}

#[test]
fn test_handler_locations() {
    let guard = ErrorHandlingGuard::new();
    assert!(guard.should_process(Path::new("app/api/orders/route.ts")));
    assert!(guard.should_process(Path::new("src/services/orders.ts")));
    assert!(guard.should_process(Path::new("src/orders.service.ts")));
    assert!(guard.should_process(Path::new("lib/db.ts")));
    assert!(!guard.should_process(Path::new("src/components/Button.tsx")));
}

const AWAITED: &str = r#"export async function loadProfile(id: string) {
  const response = await fetch(`/api/profiles/${id}`);
  return response.json();
}
"#;

#[test]
fn test_unguarded_await_is_flagged() {
    let violations = check(AWAITED);
    assert_eq!(violations.len(), 1);
    let v = &violations[0];
    assert_eq!(v.severity, Severity::Warning);
    assert_eq!(v.category, Category::Quality);
    assert_eq!(v.fingerprint, "error-handling:fetch:0");
    assert_eq!(v.line, 2);
    assert!(v.message.starts_with("fetch()"));
}

/// Declarations are split so the binding stays visible after the try block.
#[test]
fn test_declaration_fix_hoists_binding() {
    let violations = check(AWAITED);
    let out = fixed(AWAITED, &violations[0]);
    assert!(out.contains(
        "  let response;\n  try {\n    response = await fetch(`/api/profiles/${id}`);\n  } catch (error) {\n    console.error('fetch failed', error);\n  }\n  return response.json();"
    ));
    assert!(check(&out).is_empty());
}

#[test]
fn test_destructuring_fix() {
    let src = r#"export async function listOrders() {
  const { data, error } = await supabase.from('orders').select('*');
  return data ?? error;
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "error-handling:from:0");
    let out = fixed(src, &violations[0]);
    assert!(out.contains("let data, error;"));
    assert!(out.contains("({ data, error } = await supabase.from('orders').select('*'));"));
    assert!(check(&out).is_empty());
}

#[test]
fn test_expression_statement_is_wrapped() {
    let src = r#"export async function audit(action: string) {
  await supabase.from('audit_logs').insert({ action });
}
"#;
    let violations = check(src);
    let out = fixed(src, &violations[0]);
    assert!(out.contains(
        "  try {\n    await supabase.from('audit_logs').insert({ action });\n  } catch (error) {"
    ));
    assert!(check(&out).is_empty());
}

#[test]
fn test_unawaited_chain_gets_catch() {
    let src = r#"export function ping() {
  return fetch('/api/ping').then((r) => r.ok);
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    let out = fixed(src, &violations[0]);
    assert!(out.contains(
        "return fetch('/api/ping').then((r) => r.ok).catch((error) => console.error('fetch failed', error));"
    ));
    assert!(check(&out).is_empty());
}

#[test]
fn test_guarded_calls_pass() {
    let src = r#"export async function load() {
  try {
    const res = await fetch('/api/a');
    return await res.json();
  } catch (e) {
    return null;
  }
}

export function loadLater() {
  return fetch('/api/b').catch(() => null);
}
"#;
    assert!(check(src).is_empty());
}

/// A try without a catch clause does not handle the rejection.
#[test]
fn test_try_finally_is_not_a_guard() {
    let src = r#"export async function load() {
  try {
    await fetch('/api/a');
  } finally {
    console.log('done');
  }
}
"#;
    assert_eq!(check(src).len(), 1);
}

/// Ordinals count guarded calls too, so fingerprints stay put when a sibling
/// call gets wrapped.
#[test]
fn test_ordinals_count_guarded_calls() {
    let src = r#"export async function load() {
  try {
    await fetch('/api/a');
  } catch (e) {
    console.error(e);
  }
  await fetch('/api/b');
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "error-handling:fetch:1");
}

#[test]
fn test_file_system_calls() {
    let src = r#"import { readFile, readFileSync } from 'fs/promises';

export async function loadConfig() {
  const raw = await readFile('config.json', 'utf8');
  const fallback = readFileSync('default.json', 'utf8');
  return JSON.parse(raw ?? fallback);
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "error-handling:readFile:0");
}

/// Synchronous helpers on network modules and built-in `from` converters are
/// not async operations.
#[test]
fn test_synchronous_calls_are_not_flagged() {
    let src = r#"import axios from 'axios';
import http from 'http';

export function helpers(err: unknown) {
  const bytes = Buffer.from('hello');
  const list = Array.from(new Set([1, 2]));
  const view = Uint8Array.from([1, 2, 3]);
  const client = axios.create({ baseURL: '/api' });
  const server = http.createServer(() => {});
  return axios.isAxiosError(err) ? [bytes, list, view, client, server] : null;
}
"#;
    assert!(check(src).is_empty());
}

#[test]
fn test_request_methods_on_network_modules_are_flagged() {
    let src = r#"import axios from 'axios';

export function loadOrders() {
  return axios.get('/api/orders').then((res) => res.data);
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "error-handling:axios.get:0");
    let out = fixed(src, &violations[0]);
    assert!(out.contains(
        "axios.get('/api/orders').then((res) => res.data).catch((error) => console.error('axios.get failed', error));"
    ));
}

/// Every declarator is hoisted, so all bindings outlive the try block.
#[test]
fn test_multiple_declarators_are_all_hoisted() {
    let src = r#"export async function loadOrders() {
  const response = await fetch('/api/orders'), retries = 1;
  return [await response.json(), retries];
}
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    let out = fixed(src, &violations[0]);
    assert!(out.contains(
        "  let response, retries;\n  try {\n    response = await fetch('/api/orders');\n    retries = 1;\n  } catch (error) {\n    console.error('fetch failed', error);\n  }\n  return [await response.json(), retries];"
    ));
    assert!(check(&out).is_empty());
}
