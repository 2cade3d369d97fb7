//! Subscriber setup for hosts that want to see the engine's events.
//!
//! The engine never installs a subscriber itself. What it emits, by level:
//!
//! - `info`: engine and executor start and shutdown, with worker counts
//! - `warn`: rejected configurations, worker spawn failures and panics
//! - `debug`: cache sweeps and invalidation, algorithm registration,
//!   configuration resets, pools left busy by a clear
//! - `trace`: arena growth, per-thread pool creation and release

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset: engine lifecycle and warnings only.
pub const DEFAULT_FILTER: &str = "textsim_core=info";

/// Install a compact stdout subscriber filtered by `RUST_LOG`, falling back
/// to [`DEFAULT_FILTER`].
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Same as [`init`] with a caller-chosen fallback, e.g.
/// `"textsim_core::memory=trace"` to follow arena growth.
///
/// Does nothing if the process already has a global subscriber.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
