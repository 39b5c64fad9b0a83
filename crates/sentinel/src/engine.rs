//! Composition root. An `Engine` is built from a project root and a resolved
//! configuration, and owned by whoever runs it; there is no global instance.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use sentinel_analysis::fixes::FixOutcome;
use sentinel_analysis::{Analyzer, FileReport, GuardRegistry, PathFilter, WatchScheduler};
use sentinel_channel::{Broadcaster, ChannelSettings, CommandHandler, LiveChannel};
use sentinel_core::config::ConfigUpdate;
use sentinel_core::errors::{EngineError, FixError};
use sentinel_core::events::{EventDispatcher, SentinelEventHandler};
use sentinel_core::{GuardStats, SentinelConfig, Violation};

/// The channel's view of the engine.
pub struct EngineCore {
    analyzer: Arc<Analyzer>,
}

impl CommandHandler for EngineCore {
    fn apply_fix(&self, violation_id: &str) -> Result<(), FixError> {
        self.analyzer.apply_fix(violation_id).map(|_| ())
    }

    fn dismiss(&self, violation_id: &str) -> bool {
        self.analyzer.dismiss(violation_id)
    }

    fn stats(&self) -> GuardStats {
        self.analyzer.stats()
    }

    fn snapshot(&self) -> Vec<(PathBuf, Vec<Violation>)> {
        self.analyzer.store().snapshot()
    }
}

pub struct Engine {
    root: PathBuf,
    config: Mutex<SentinelConfig>,
    analyzer: Arc<Analyzer>,
    filter: PathFilter,
    scheduler: Arc<WatchScheduler>,
    broadcaster: Arc<Broadcaster>,
    channel: Mutex<Option<LiveChannel>>,
}

impl Engine {
    pub fn new(root: &Path, config: SentinelConfig) -> Result<Self, EngineError> {
        Self::with_handlers(root, config, Vec::new())
    }

    /// Build the engine with extra event handlers registered after the
    /// channel's broadcaster.
    pub fn with_handlers(
        root: &Path,
        config: SentinelConfig,
        handlers: Vec<Arc<dyn SentinelEventHandler>>,
    ) -> Result<Self, EngineError> {
        SentinelConfig::validate(&config)?;
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let filter = PathFilter::from_config(&root, &config)?;

        let broadcaster = Arc::new(Broadcaster::new());
        let mut events = EventDispatcher::new();
        events.register(broadcaster.clone());
        for handler in handlers {
            events.register(handler);
        }

        let registry = GuardRegistry::from_config(&config);
        tracing::debug!(guards = ?registry.names(), "guards registered");
        let analyzer = Arc::new(Analyzer::new(registry, Arc::new(events)));
        let scheduler = Arc::new(WatchScheduler::new(
            Arc::clone(&analyzer),
            filter.clone(),
            config.effective_enabled(),
            config.effective_debounce_ms(),
        ));

        Ok(Self {
            root,
            config: Mutex::new(config),
            analyzer,
            filter,
            scheduler,
            broadcaster,
            channel: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> SentinelConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn scheduler(&self) -> &WatchScheduler {
        &self.scheduler
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Address of the live channel while started.
    pub fn channel_addr(&self) -> Option<SocketAddr> {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(LiveChannel::local_addr)
    }

    /// Open the live channel, then start watching. Returns the channel's
    /// address; calling it again while started returns the same address.
    pub async fn start(&self) -> Result<SocketAddr, EngineError> {
        if let Some(addr) = self.channel_addr() {
            return Ok(addr);
        }
        let config = self.config();
        let handler: Arc<dyn CommandHandler> = Arc::new(EngineCore {
            analyzer: Arc::clone(&self.analyzer),
        });
        let channel = LiveChannel::bind(
            &config.channel.effective_host(),
            config.effective_channel_port(),
            ChannelSettings::from_config(&config.channel),
            Arc::clone(&self.broadcaster),
            handler,
        )
        .await?;
        let addr = channel.local_addr();

        if let Err(e) = self.scheduler.start() {
            channel.close().await;
            return Err(e.into());
        }
        *self.channel.lock().unwrap_or_else(PoisonError::into_inner) = Some(channel);
        tracing::info!(root = %self.root.display(), addr = %addr, "sentinel started");
        Ok(addr)
    }

    /// Stop watching, then close the channel.
    pub async fn shutdown(&self) {
        self.scheduler.stop();
        let channel = self
            .channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(channel) = channel {
            channel.close().await;
        }
        tracing::info!(root = %self.root.display(), "sentinel stopped");
    }

    /// Analyze one file now. Relative paths are taken from the root.
    pub fn analyze_file(&self, path: &Path) -> Result<Option<FileReport>, EngineError> {
        let path = if path.is_relative() {
            self.root.join(path)
        } else {
            path.to_path_buf()
        };
        Ok(self.analyzer.analyze(&path)?)
    }

    /// Analyze every watched file under the root.
    pub fn analyze_tree(&self) -> Vec<FileReport> {
        self.analyzer.analyze_tree(&self.filter)
    }

    pub fn apply_fix(&self, violation_id: &str) -> Result<FixOutcome, EngineError> {
        Ok(self.analyzer.apply_fix(violation_id)?)
    }

    pub fn dismiss(&self, violation_id: &str) -> bool {
        self.analyzer.dismiss(violation_id)
    }

    pub fn stats(&self) -> GuardStats {
        self.analyzer.stats()
    }

    /// Every file currently holding violations, sorted by path.
    pub fn violations(&self) -> Vec<(PathBuf, Vec<Violation>)> {
        self.analyzer.store().snapshot()
    }

    /// Apply a runtime configuration patch. Nothing changes when the patch
    /// names an unknown guard or fails validation.
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<(), EngineError> {
        let registry = self.analyzer.registry();
        if let Some(name) = update
            .guards_enabled
            .keys()
            .find(|name| registry.get(name.as_str()).is_none())
        {
            return Err(EngineError::UnknownGuard { name: name.clone() });
        }

        let (was_enabled, now_enabled) = {
            let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = config.clone();
            next.apply_update(update)?;

            for (name, on) in &update.guards_enabled {
                registry.set_enabled(name, *on);
            }
            self.scheduler.set_debounce_ms(next.effective_debounce_ms());
            let was_enabled = self.scheduler.is_enabled();
            let now_enabled = next.effective_enabled();
            self.scheduler.set_enabled(now_enabled);
            *config = next;
            (was_enabled, now_enabled)
        };

        if let Some(verbose) = update.verbose {
            if !sentinel_core::tracing::set_verbose(verbose) {
                tracing::debug!(verbose, "log filter fixed by environment; verbose stored only");
            }
        }
        if was_enabled && !now_enabled {
            self.scheduler.stop();
        } else if !was_enabled && now_enabled && self.channel_addr().is_some() {
            self.scheduler.start()?;
        }
        tracing::info!(
            enabled = now_enabled,
            debounce_ms = self.scheduler.debounce().as_millis() as u64,
            "configuration updated"
        );
        Ok(())
    }
}
