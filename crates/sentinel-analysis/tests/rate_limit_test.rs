//! Rate-limiting guard tests.

use std::path::Path;

use sentinel_analysis::fixes::apply_edits;
use sentinel_analysis::guards::rate_limit::{hourly_quota, is_request_handler_path};
use sentinel_analysis::guards::{Guard, RateLimitGuard};
use sentinel_analysis::TreeBuilder;
use sentinel_core::config::RateLimitConfig;
use sentinel_core::{Severity, Violation};

const ROUTE: &str = "app/api/orders/route.ts";

fn check(src: &str) -> Vec<Violation> {
    let guard = RateLimitGuard::new(&RateLimitConfig::default());
    let builder = TreeBuilder::new();
    let tree = builder.build_from_source(Path::new(ROUTE), src).unwrap();
    guard.check(&tree, Path::new(ROUTE)).unwrap()
}

fn fixed(src: &str, violation: &Violation) -> String {
    apply_edits(src, &violation.quick_fix.as_ref().unwrap().edits).unwrap()
}

fn by_fingerprint<'a>(violations: &'a [Violation], fingerprint: &str) -> &'a Violation {
    violations
        .iter()
        .find(|v| v.fingerprint == fingerprint)
        .unwrap()
}

const HANDLERS: &str = r#"export async function GET(request: Request) {
  return Response.json({ ok: true });
}

export async function POST(request: Request) {
  const body = await request.json();
  return Response.json(body);
}
"#;

#[test]
fn test_handler_paths() {
    let guard = RateLimitGuard::new(&RateLimitConfig::default());
    assert!(guard.should_process(Path::new("app/api/orders/route.ts")));
    assert!(guard.should_process(Path::new("app/orders/route.ts")));
    assert!(guard.should_process(Path::new("pages/api/orders.ts")));
    assert!(!guard.should_process(Path::new("src/lib/util.ts")));
    assert!(is_request_handler_path(Path::new("src/api/client.ts")));
}

#[test]
fn test_quota_by_method() {
    assert_eq!(hourly_quota("GET"), 1000);
    assert_eq!(hourly_quota("POST"), 100);
    assert_eq!(hourly_quota("PUT"), 100);
    assert_eq!(hourly_quota("DELETE"), 50);
}

/// Reads are warnings; mutating methods are errors.
#[test]
fn test_severity_by_method() {
    let violations = check(HANDLERS);
    assert_eq!(violations.len(), 2);
    assert_eq!(by_fingerprint(&violations, "rate-limit:GET").severity, Severity::Warning);
    let post = by_fingerprint(&violations, "rate-limit:POST");
    assert_eq!(post.severity, Severity::Error);
    assert_eq!(post.line, 5);
    assert_eq!(post.column, 23);
}

#[test]
fn test_wrapped_or_marked_files_pass() {
    let wrapped = r#"import { withRateLimit } from '@/lib/rate-limit';

export const POST = withRateLimit(async (req: Request) => Response.json({}), { requests: 100, window: '1h' });
"#;
    assert!(check(wrapped).is_empty());

    let upstash = r#"import { Ratelimit } from '@upstash/ratelimit';

export async function POST(request: Request) {
  return new Response('ok');
}
"#;
    assert!(check(upstash).is_empty());
}

#[test]
fn test_function_handler_fix() {
    let violations = check(HANDLERS);
    let out = fixed(HANDLERS, by_fingerprint(&violations, "rate-limit:POST"));
    assert!(out.starts_with("import { withRateLimit } from '@/lib/rate-limit';\n"));
    assert!(out.contains("export const POST = withRateLimit(async function POST(request: Request) {"));
    assert!(out.contains("}, { requests: 100, window: '1h' });"));
    assert!(check(&out).is_empty());
}

#[test]
fn test_const_handler_fix() {
    let src = r#"import { db } from '@/lib/db';

export const DELETE = async (request: Request) => new Response(null, { status: 204 });
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    let out = fixed(src, &violations[0]);
    assert!(out.contains(
        "import { db } from '@/lib/db';\nimport { withRateLimit } from '@/lib/rate-limit';"
    ));
    assert!(out.contains(
        "export const DELETE = withRateLimit(async (request: Request) => new Response(null, { status: 204 }), { requests: 50, window: '1h' });"
    ));
}

/// Re-exported handlers are reported without a quick-fix.
#[test]
fn test_aliased_handler_has_no_fix() {
    let src = r#"async function handler(req: Request) {
  return new Response('ok');
}

export { handler as PUT };
"#;
    let violations = check(src);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].fingerprint, "rate-limit:PUT");
    assert!(violations[0].quick_fix.is_none());
    assert!(violations[0].suggestion.as_deref().unwrap().contains("re-exported"));
}

#[test]
fn test_import_goes_after_directives() {
    let src = "'use server';\n\nexport async function POST() {\n  return new Response('ok');\n}\n";
    let violations = check(src);
    let out = fixed(src, &violations[0]);
    assert!(out.starts_with("'use server';\nimport { withRateLimit } from '@/lib/rate-limit';\n"));
}

#[test]
fn test_non_method_exports_are_ignored() {
    let src = "export const revalidate = 60;\nexport function helper() {}\n";
    assert!(check(src).is_empty());
}

#[test]
fn test_custom_wrapper() {
    let guard = RateLimitGuard::new(&RateLimitConfig {
        wrapper: Some("throttle".into()),
        import_path: Some("@/server/throttle".into()),
    });
    let builder = TreeBuilder::new();
    let tree = builder.build_from_source(Path::new(ROUTE), HANDLERS).unwrap();
    let violations = guard.check(&tree, Path::new(ROUTE)).unwrap();
    let out = fixed(HANDLERS, by_fingerprint(&violations, "rate-limit:GET"));
    assert!(out.starts_with("import { throttle } from '@/server/throttle';\n"));
    assert!(out.contains("{ requests: 1000, window: '1h' }"));
}
