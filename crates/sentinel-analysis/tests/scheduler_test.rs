//! Debounce and watch scheduler tests.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sentinel_analysis::scheduler::{Debouncer, FileEvent};
use sentinel_analysis::{Analyzer, GuardRegistry, PathFilter, WatchScheduler};
use sentinel_core::errors::WatchError;
use sentinel_core::events::EventDispatcher;
use sentinel_core::SentinelConfig;
use tempfile::TempDir;

const ROUTE_SRC: &str = r#"export async function GET(request: Request) {
  const { data } = await supabase.from('orders').select('*');
  return Response.json(data);
}
"#;

fn counting_action(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(())
    }
}

#[tokio::test]
async fn test_debouncer_coalesces_per_key() {
    let debouncer: Debouncer<&'static str> = Debouncer::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        debouncer.schedule("a", Duration::from_millis(50), counting_action(&counter));
    }
    debouncer.schedule("b", Duration::from_millis(50), counting_action(&counter));
    assert_eq!(debouncer.pending(), 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(debouncer.pending(), 0);
}

#[tokio::test]
async fn test_debouncer_cancel() {
    let debouncer: Debouncer<&'static str> = Debouncer::new();
    let counter = Arc::new(AtomicUsize::new(0));
    debouncer.schedule("a", Duration::from_millis(50), counting_action(&counter));
    debouncer.schedule("b", Duration::from_millis(50), counting_action(&counter));

    assert!(debouncer.cancel(&"a"));
    assert!(!debouncer.cancel(&"a"));
    debouncer.cancel_all();
    assert_eq!(debouncer.pending(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

struct Fixture {
    dir: TempDir,
    root: PathBuf,
    analyzer: Arc<Analyzer>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config = SentinelConfig::default();
        let analyzer = Arc::new(Analyzer::new(
            GuardRegistry::from_config(&config),
            Arc::new(EventDispatcher::new()),
        ));
        Self { dir, root, analyzer }
    }

    fn scheduler(&self, enabled: bool, debounce_ms: u64) -> Arc<WatchScheduler> {
        let filter = PathFilter::from_config(&self.root, &SentinelConfig::default()).unwrap();
        Arc::new(WatchScheduler::new(
            Arc::clone(&self.analyzer),
            filter,
            enabled,
            debounce_ms,
        ))
    }

    fn write(&self, rel: &str, src: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, src).unwrap();
        path
    }
}

/// A burst of change events for one path yields one analysis pass.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_of_changes_runs_one_pass() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(true, 50);
    let path = fixture.write("app/api/orders/route.ts", ROUTE_SRC);

    for _ in 0..5 {
        scheduler.handle_event(FileEvent::changed(&path));
    }
    assert_eq!(scheduler.pending(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fixture.analyzer.stats().total_files, 1);
    assert_eq!(fixture.analyzer.store().get(&path).len(), 3);
    assert_eq!(scheduler.pending(), 0);
}

/// A removal cancels the pending pass and clears stored violations.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removal_cancels_pending_pass() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(true, 100);
    let path = fixture.write("app/api/orders/route.ts", ROUTE_SRC);
    fixture.analyzer.analyze(&path).unwrap();
    let before = fixture.analyzer.stats().total_files;

    scheduler.handle_event(FileEvent::changed(&path));
    fs::remove_file(&path).unwrap();
    scheduler.handle_event(FileEvent::removed(&path));
    assert_eq!(scheduler.pending(), 0);
    assert!(fixture.analyzer.store().get(&path).is_empty());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fixture.analyzer.stats().total_files, before);
}

#[tokio::test]
async fn test_filtered_and_unsupported_paths_are_ignored() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(true, 50);
    for rel in [
        "node_modules/pkg/index.ts",
        "app/README.md",
        "scripts/seed.ts",
        "src/lib/orders.test.ts",
    ] {
        scheduler.handle_event(FileEvent::changed(fixture.root.join(rel)));
    }
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test]
async fn test_disabled_scheduler_does_not_watch() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(false, 50);
    scheduler.start().unwrap();
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn test_missing_root_is_an_error() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(true, 50);
    fs::remove_dir_all(fixture.dir.path()).unwrap();
    let err = scheduler.start().unwrap_err();
    assert!(matches!(err, WatchError::MissingRoot { .. }));
}

#[test]
fn test_start_outside_runtime_is_an_error() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(true, 50);
    assert!(matches!(scheduler.start(), Err(WatchError::NoRuntime)));
}

#[tokio::test]
async fn test_runtime_debounce_update() {
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler(true, 500);
    scheduler.set_debounce_ms(20);
    assert_eq!(scheduler.debounce(), Duration::from_millis(20));
    scheduler.set_enabled(false);
    assert!(!scheduler.is_enabled());
}

/// End to end through the OS watcher: writing a file eventually lands its
/// violations in the store.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_analyzes_written_file() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.root.join("app/api/orders")).unwrap();
    let scheduler = fixture.scheduler(true, 50);
    scheduler.start().unwrap();
    assert!(scheduler.is_running());
    scheduler.start().unwrap();

    let path = fixture.write("app/api/orders/route.ts", ROUTE_SRC);
    let deadline = Instant::now() + Duration::from_secs(10);
    while fixture.analyzer.store().get(&path).is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(fixture.analyzer.store().get(&path).len(), 3);

    scheduler.stop();
    assert!(!scheduler.is_running());
}

/// Stopping with events in flight leaves no timer behind, and writes after
/// the stop are not analyzed.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_leaves_no_pending_pass() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.root.join("app/api/orders")).unwrap();
    let scheduler = fixture.scheduler(true, 200);
    scheduler.start().unwrap();

    let path = fixture.write("app/api/orders/route.ts", ROUTE_SRC);
    let deadline = Instant::now() + Duration::from_secs(10);
    while scheduler.pending() == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    scheduler.handle_event(FileEvent::changed(&path));
    scheduler.stop();
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.pending(), 0);

    fixture.write("app/api/orders/route.ts", ROUTE_SRC);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(fixture.analyzer.stats().total_files, 0);
    assert!(fixture.analyzer.store().get(&path).is_empty());
}
