//! Library log verbosity.
//!
//! The crate's own events (study creation, per-trial results) are emitted
//! through `tracing` only when their level passes the library threshold set
//! here. The threshold is process-wide; [`temporary_verbosity`] installs a
//! scoped override for the current thread and restores the previous state
//! when the guard drops, including during unwinding.
//!
//! ```
//! use docktuna::logging::{self, Verbosity};
//!
//! let before = logging::verbosity();
//! {
//!     let _quiet = logging::temporary_verbosity(Verbosity::Warning);
//!     assert_eq!(logging::verbosity(), Verbosity::Warning);
//! }
//! assert_eq!(logging::verbosity(), before);
//! ```

use core::cell::Cell;
use core::sync::atomic::{AtomicU8, Ordering};

/// Threshold for the library's own log events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Everything, including per-suggestion detail.
    Debug,
    /// Study lifecycle and per-trial results (the default).
    Info,
    /// Only warnings and errors.
    Warning,
    /// Only errors.
    Error,
}

impl Verbosity {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warning,
            _ => Self::Error,
        }
    }
}

static GLOBAL: AtomicU8 = AtomicU8::new(Verbosity::Info as u8);

thread_local! {
    static OVERRIDE: Cell<Option<Verbosity>> = const { Cell::new(None) };
}

/// The verbosity in effect on the current thread.
#[must_use]
pub fn verbosity() -> Verbosity {
    OVERRIDE
        .with(Cell::get)
        .unwrap_or_else(|| Verbosity::from_u8(GLOBAL.load(Ordering::Relaxed)))
}

/// Set the process-wide verbosity.
pub fn set_verbosity(level: Verbosity) {
    GLOBAL.store(level as u8, Ordering::Relaxed);
}

/// Whether an event at `level` passes the current threshold.
#[must_use]
pub fn enabled(level: Verbosity) -> bool {
    level >= verbosity()
}

/// Restores the previous thread override when dropped.
#[must_use = "the override ends when the guard is dropped"]
#[derive(Debug)]
pub struct VerbosityGuard {
    previous: Option<Verbosity>,
}

impl Drop for VerbosityGuard {
    fn drop(&mut self) {
        OVERRIDE.with(|cell| cell.set(self.previous));
    }
}

/// Override the verbosity on this thread until the returned guard drops.
pub fn temporary_verbosity(level: Verbosity) -> VerbosityGuard {
    let previous = OVERRIDE.with(|cell| cell.replace(Some(level)));
    VerbosityGuard { previous }
}

/// Install the `tracing` subscriber used by the binaries.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the configured
/// `loglevel` (`info` if the configuration cannot be loaded).
///
/// # Errors
///
/// Returns [`Error::Config`](crate::Error::Config) if a global subscriber is
/// already installed.
#[cfg(feature = "cli")]
pub fn init_subscriber() -> crate::Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let loglevel =
        crate::config::Config::load().map_or_else(|_| "info".to_string(), |cfg| cfg.loglevel);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(loglevel));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| crate::Error::Config(e.to_string()))
}
