//! Tracing initialization and configuration.

use std::sync::{Once, OnceLock};

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

static INIT: Once = Once::new();

/// Set only when the fallback filter is in use.
static FALLBACK: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

const LOG_ENV: &str = "SENTINEL_LOG";

fn fallback_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose {
        "sentinel=debug,sentinel_core=debug,sentinel_analysis=debug,sentinel_channel=debug"
    } else {
        "sentinel=info,sentinel_core=info,sentinel_analysis=info,sentinel_channel=info"
    })
}

/// Initialize the Sentinel tracing/logging system.
///
/// Reads the `SENTINEL_LOG` environment variable for per-module log levels.
/// Format: `SENTINEL_LOG=sentinel_analysis=debug,sentinel_channel=info`
///
/// Falls back to `sentinel=info` (or `sentinel=debug` when `verbose`) if
/// `SENTINEL_LOG` is not set or is invalid. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let (filter, from_env) = match EnvFilter::try_from_env(LOG_ENV) {
            Ok(filter) => (filter, true),
            Err(_) => (fallback_filter(verbose), false),
        };
        let (filter, handle) = reload::Layer::new(filter);
        if !from_env {
            let _ = FALLBACK.set(handle);
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(verbose)
                    .with_file(verbose)
                    .with_line_number(verbose),
            )
            .init();
    });
}

/// Swap the fallback filter between info and debug levels at runtime.
///
/// Returns `false` when nothing changed: tracing was not initialized through
/// [`init_tracing`], or `SENTINEL_LOG` chose the levels.
pub fn set_verbose(verbose: bool) -> bool {
    let Some(handle) = FALLBACK.get() else {
        return false;
    };
    match handle.reload(fallback_filter(verbose)) {
        Ok(()) => {
            tracing::debug!(verbose, "log filter reloaded");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to reload log filter");
            false
        }
    }
}
