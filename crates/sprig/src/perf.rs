// perf.rs - Performance timing for index construction and workspace scans
//
// Controlled via the SPRIG_PERF environment variable.
//
// Usage:
//   SPRIG_PERF=1 sprig --stdio          # Log scope durations
//   SPRIG_PERF=verbose sprig symbols .  # Also warn when thresholds are exceeded

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PERF_ENABLED: OnceLock<bool> = OnceLock::new();

static PERF_VERBOSE: OnceLock<bool> = OnceLock::new();

/// Check if performance timing is enabled
pub fn is_enabled() -> bool {
    *PERF_ENABLED.get_or_init(|| {
        std::env::var("SPRIG_PERF")
            .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
            .unwrap_or(false)
    })
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    *PERF_VERBOSE.get_or_init(|| {
        std::env::var("SPRIG_PERF")
            .map(|v| v.to_lowercase() == "verbose")
            .unwrap_or(false)
    })
}

/// RAII timing guard that logs duration on drop
///
/// ```
/// use sprig::perf::TimingGuard;
///
/// let _guard = TimingGuard::new("type_index_build");
/// // ... do work ...
/// ```
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    threshold_warn_ms: Option<u64>,
    enabled: bool,
}

impl TimingGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: None,
            enabled: is_enabled(),
        }
    }

    /// Create a timing guard that warns (in verbose mode) past `threshold_ms`.
    pub fn with_threshold(name: &'static str, threshold_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: Some(threshold_ms),
            enabled: is_enabled(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Consume the guard without logging and return the duration.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        std::mem::forget(self);
        elapsed
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.start.elapsed();
        log::info!("[PERF] {} completed in {:?}", self.name, elapsed);

        if let Some(threshold) = self.threshold_warn_ms {
            if elapsed.as_millis() > threshold as u128 && is_verbose() {
                log::warn!(
                    "[PERF] {} exceeded threshold ({}ms > {}ms)",
                    self.name,
                    elapsed.as_millis(),
                    threshold
                );
            }
        }
    }
}
