//! ThroughputMonitor - periodic processed-count sampling
//!
//! Sampling is a pure function of `(now, processed)` so it can be tested
//! without timers. The periodic task only drives it.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Items per second, 0 below one millisecond
pub fn rate(items: u64, elapsed: Duration) -> f64 {
    if elapsed < MIN_ELAPSED {
        0.0
    } else {
        items as f64 / elapsed.as_secs_f64()
    }
}

/// Cumulative and incremental throughput counters
#[derive(Debug, Clone)]
pub struct ThroughputStats {
    base_processed: u64,
    last_processed: u64,
    last_sample: Instant,
    total_runtime: Duration,
}

impl ThroughputStats {
    pub fn new(now: Instant, processed: u64) -> Self {
        Self {
            base_processed: processed,
            last_processed: processed,
            last_sample: now,
            total_runtime: Duration::ZERO,
        }
    }

    /// Start counting again from `processed`
    pub fn reset(&mut self, now: Instant, processed: u64) {
        *self = Self::new(now, processed);
    }

    /// Take a sample
    ///
    /// A processed count lower than the previous sample (members removed)
    /// counts as no new items.
    pub fn sample(&mut self, now: Instant, processed: u64) -> ThroughputSnapshot {
        let interval = now.saturating_duration_since(self.last_sample);
        self.total_runtime += interval;
        self.last_sample = now;

        let interval_items = processed.saturating_sub(self.last_processed);
        self.last_processed = processed;
        let total_items = processed.saturating_sub(self.base_processed);

        ThroughputSnapshot {
            total_runtime: self.total_runtime,
            total_items,
            total_rate: rate(total_items, self.total_runtime),
            interval,
            interval_items,
            interval_rate: rate(interval_items, interval),
        }
    }

    pub fn total_runtime(&self) -> Duration {
        self.total_runtime
    }

    /// Items counted up to the last sample
    pub fn total_items(&self) -> u64 {
        self.last_processed.saturating_sub(self.base_processed)
    }
}

/// One throughput sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSnapshot {
    pub total_runtime: Duration,
    pub total_items: u64,
    pub total_rate: f64,
    pub interval: Duration,
    pub interval_items: u64,
    pub interval_rate: f64,
}

impl fmt::Display for ThroughputSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Process statistics for {} total runtime:",
            format_runtime(self.total_runtime)
        )?;
        writeln!(f)?;
        writeln!(f, "{:<14} {:^17} {:^10}", "Time span", "Entities", "Per second")?;
        writeln!(f, "{} {} {}", "-".repeat(14), "-".repeat(17), "-".repeat(10))?;
        writeln!(
            f,
            "{:<14} {:^17} {:^10}",
            "Entire runtime",
            group_thousands(self.total_items),
            group_thousands(self.total_rate as u64)
        )?;
        write!(
            f,
            "{:<14} {:^17} {:^10}",
            interval_label(self.interval),
            group_thousands(self.interval_items),
            group_thousands(self.interval_rate as u64)
        )
    }
}

fn interval_label(interval: Duration) -> &'static str {
    if interval.as_secs() == 60 {
        "Last minute"
    } else {
        "Last interval"
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `3725s` -> `1 hour, 2 minutes, 5 seconds`
pub fn format_runtime(runtime: Duration) -> String {
    let secs = runtime.as_secs();
    let parts = [
        (secs / 86_400, "day"),
        (secs % 86_400 / 3_600, "hour"),
        (secs % 3_600 / 60, "minute"),
        (secs % 60, "second"),
    ];

    let text: Vec<String> = parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n} {unit}{}", if *n == 1 { "" } else { "s" }))
        .collect();

    if text.is_empty() {
        "0 seconds".to_string()
    } else {
        text.join(", ")
    }
}

/// Periodic throughput sampler owned by a group
pub struct ThroughputMonitor {
    interval: Duration,
    stats: Mutex<ThroughputStats>,
    last: Mutex<Option<ThroughputSnapshot>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ThroughputMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stats: Mutex::new(ThroughputStats::new(now(), 0)),
            last: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking; `on_tick` returns `false` to end the task
    ///
    /// No-op when already running.
    pub fn start<F>(&self, runtime: &Handle, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let period = self.interval;
        *task = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
            debug!("throughput monitor task ended");
        }));
    }

    pub fn stop(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Sample now
    pub fn sample(&self, processed: u64) -> ThroughputSnapshot {
        let snapshot = self
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample(now(), processed);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        snapshot
    }

    pub fn reset(&self, processed: u64) {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(now(), processed);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Most recent sample since the last reset
    pub fn last_snapshot(&self) -> Option<ThroughputSnapshot> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ThroughputMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

// tokio's clock (pausable in tests); works outside a runtime too
fn now() -> Instant {
    Instant::now()
}
