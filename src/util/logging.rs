//! Process-wide diagnostic verbosity control.
//!
//! The bridge logs through `tracing`. Hosts that drive the flat interface
//! select verbosity with a single integer level (0 = quiet .. 4 = trace),
//! which installs a `tracing-subscriber` formatter the first time a
//! non-quiet level is requested. Purely observational: no behavioral
//! coupling to any bridge operation.

use std::sync::atomic::{AtomicI32, Ordering};

use tracing_subscriber::filter::LevelFilter;

static DEBUG_LEVEL: AtomicI32 = AtomicI32::new(0);

/// Current debug level (0 = quiet, 1 = error, 2 = warn, 3 = info, 4 = trace).
#[inline]
pub fn debug_level() -> i32 {
    DEBUG_LEVEL.load(Ordering::Relaxed)
}

/// Set the process-wide debug level.
///
/// Installs the global `tracing` subscriber on first use; later calls only
/// update the stored level (the subscriber's filter is fixed at install
/// time, so the highest verbosity wanted for a run should be set first).
pub fn set_debug_level(level: i32) {
    DEBUG_LEVEL.store(level, Ordering::Relaxed);

    let filter = match level {
        i32::MIN..=0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        _ => LevelFilter::TRACE,
    };

    // try_init fails if a subscriber is already installed; that is fine.
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_level_roundtrip() {
        let prev = debug_level();
        set_debug_level(3);
        assert_eq!(debug_level(), 3);
        set_debug_level(prev);
    }
}
