//! Scoped phase timing.
//!
//! [`timed`] runs a closure inside a `tracing` span named after the phase
//! and emits one event with the elapsed milliseconds when it returns.

use std::time::{Duration, Instant};

/// Runs `f` as the named phase and returns its result with the elapsed time.
pub fn timed<T>(phase: &'static str, f: impl FnOnce() -> T) -> (T, Duration) {
    let span = tracing::info_span!("phase", name = phase);
    let _guard = span.enter();
    let started = Instant::now();
    let out = f();
    let elapsed = started.elapsed();
    tracing::info!(phase, elapsed_ms = millis(elapsed), "phase finished");
    (out, elapsed)
}

/// Whole milliseconds of `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
