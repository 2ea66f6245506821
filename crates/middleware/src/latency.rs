//! TSC clock for latency measurement without syscalls on the hot path

use once_cell::sync::Lazy;
use quanta::Clock;
use std::time::Duration;

/// Global TSC clock - zero syscall timestamp reads
pub static CLOCK: Lazy<Clock> = Lazy::new(Clock::new);

/// Get current TSC timestamp (zero syscalls)
#[inline]
pub fn now_tsc() -> u64 {
    CLOCK.raw()
}

/// Elapsed wall time since a TSC reading
#[inline]
pub fn elapsed_since(start_tsc: u64) -> Duration {
    CLOCK.delta(start_tsc, now_tsc())
}
