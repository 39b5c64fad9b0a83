//! Recursive OS watcher feeding debounced analysis passes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sentinel_core::errors::WatchError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::debouncer::Debouncer;
use super::path_filter::PathFilter;
use crate::pipeline::Analyzer;
use crate::tree::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// Added or modified.
    Changed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Changed,
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Removed,
        }
    }
}

/// Owns the OS watch and the task pumping its events. Dropping the handle
/// releases both.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    pump: JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Translate a raw notify event. Renames surface as a removal of the old
/// path and a change of the new one, decided by whether the path still exists.
fn translate(event: notify::Event) -> Vec<FileEvent> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| {
                if path.exists() {
                    FileEvent::changed(path)
                } else {
                    FileEvent::removed(path)
                }
            })
            .collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(FileEvent::removed).collect(),
        _ => Vec::new(),
    }
}

pub struct WatchScheduler {
    analyzer: Arc<Analyzer>,
    filter: Arc<PathFilter>,
    debouncer: Debouncer<PathBuf>,
    enabled: AtomicBool,
    debounce_ms: AtomicU64,
    handle: Mutex<Option<WatchHandle>>,
}

impl WatchScheduler {
    pub fn new(analyzer: Arc<Analyzer>, filter: PathFilter, enabled: bool, debounce_ms: u64) -> Self {
        Self {
            analyzer,
            filter: Arc::new(filter),
            debouncer: Debouncer::new(),
            enabled: AtomicBool::new(enabled),
            debounce_ms: AtomicU64::new(debounce_ms),
            handle: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        self.filter.root()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.load(Ordering::Relaxed))
    }

    /// Applies to timers armed after the call.
    pub fn set_debounce_ms(&self, ms: u64) {
        self.debounce_ms.store(ms, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn pending(&self) -> usize {
        self.debouncer.pending()
    }

    /// Begin watching the root recursively. A no-op when disabled or already
    /// running. Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), WatchError> {
        if !self.is_enabled() {
            tracing::info!(root = %self.root().display(), "watching disabled; not starting watcher");
            return Ok(());
        }
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let root = self.root().to_path_buf();
        if !root.is_dir() {
            return Err(WatchError::MissingRoot { path: root });
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => tracing::warn!(error = %e, "watch error"),
            }
        })
        .map_err(|e| WatchError::Watcher {
            path: root.clone(),
            message: e.to_string(),
        })?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watcher {
                path: root.clone(),
                message: e.to_string(),
            })?;

        let weak: Weak<Self> = Arc::downgrade(self);
        let pump = runtime.spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(scheduler) = weak.upgrade() else {
                    break;
                };
                for file_event in translate(event) {
                    scheduler.handle_event(file_event);
                }
            }
        });

        *slot = Some(WatchHandle {
            _watcher: watcher,
            pump,
        });
        tracing::info!(
            root = %root.display(),
            debounce_ms = self.debounce_ms.load(Ordering::Relaxed),
            "watching"
        );
        Ok(())
    }

    /// Release the watch, then cancel pending timers. In-flight passes finish.
    pub fn stop(&self) {
        let released = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let was_running = released.is_some();
        drop(released);
        self.debouncer.cancel_all();
        if was_running {
            tracing::info!(root = %self.root().display(), "watcher stopped");
        }
    }

    /// Route one file event. Changes are debounced per path; removals cancel
    /// the pending timer and clear the file's violations immediately.
    pub fn handle_event(&self, event: FileEvent) {
        if Dialect::from_path(&event.path).is_none() || !self.filter.matches(&event.path) {
            return;
        }
        match event.kind {
            FileEventKind::Changed => {
                let analyzer = Arc::clone(&self.analyzer);
                let path = event.path.clone();
                self.debouncer.schedule(event.path, self.debounce(), move || async move {
                    let task_path = path.clone();
                    let joined =
                        tokio::task::spawn_blocking(move || analyzer.analyze(&task_path)).await;
                    if let Err(e) = joined {
                        tracing::error!(file = %path.display(), error = %e, "analysis task failed");
                    }
                });
            }
            FileEventKind::Removed => {
                self.debouncer.cancel(&event.path);
                self.analyzer.handle_removed(&event.path);
            }
        }
    }
}

impl Drop for WatchScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
