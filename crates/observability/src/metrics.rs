//! 集中器指标收集模块
//!
//! 记录组通知、解析帧与组吞吐量的 Prometheus 指标，并提供运行结束时
//! 汇总用的内存聚合器。

use std::collections::BTreeMap;
use std::fmt;

use contracts::{ComponentEvent, EventSource, FrameCategory, Notification, SourceChannel};
use metrics::{counter, gauge, histogram};

/// 记录一条组通知
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_notification;
///
/// group.subscribe(|n| record_notification(n));
/// ```
pub fn record_notification(notification: &Notification) {
    let source_kind = match notification.source {
        EventSource::Group { .. } => "group",
        EventSource::Component { .. } => "component",
    };

    counter!(
        "concentrator_notifications_total",
        "source_kind" => source_kind,
        "event" => notification.event.name()
    )
    .increment(1);

    match &notification.event {
        ComponentEvent::ProcessError(err) => {
            counter!(
                "concentrator_process_errors_total",
                "source" => notification.source.name().to_string(),
                "kind" => err.kind()
            )
            .increment(1);
        }
        ComponentEvent::EntitiesDiscarded(items) => {
            counter!(
                "concentrator_entities_discarded_total",
                "source" => notification.source.name().to_string()
            )
            .increment(items.len() as u64);
        }
        _ => {}
    }
}

/// Record a parsed frame per channel
pub fn record_channel_frame(channel: &SourceChannel, category: FrameCategory, length: usize) {
    counter!(
        "concentrator_channel_frames_total",
        "channel" => channel.to_string(),
        "category" => category.as_str()
    )
    .increment(1);
    histogram!("concentrator_frame_length_bytes").record(length as f64);
}

/// Record group throughput
pub fn record_throughput(group: &str, processed: u64, items_per_second: f64) {
    gauge!("concentrator_group_processed", "group" => group.to_string()).set(processed as f64);
    gauge!("concentrator_group_throughput", "group" => group.to_string()).set(items_per_second);
    histogram!("concentrator_group_throughput_hist", "group" => group.to_string())
        .record(items_per_second);
}

/// Record group size and initialized members
pub fn record_group_members(group: &str, members: usize, initialized: usize) {
    gauge!("concentrator_group_size", "group" => group.to_string()).set(members as f64);
    gauge!("concentrator_group_initialized", "group" => group.to_string())
        .set(initialized as f64);
}

/// Notification aggregator
///
/// Aggregates in memory for summaries printed at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct NotificationAggregator {
    /// Total notifications
    pub total: u64,

    /// Notifications per event name
    pub by_event: BTreeMap<String, u64>,

    /// Process errors per error kind
    pub errors_by_kind: BTreeMap<String, u64>,

    /// Process errors per source name
    pub errors_by_source: BTreeMap<String, u64>,

    /// Discarded measurements
    pub discarded: u64,

    /// Throughput samples (items / second)
    pub throughput: RunningStats,
}

impl NotificationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, notification: &Notification) {
        self.total += 1;
        *self
            .by_event
            .entry(notification.event.name().to_string())
            .or_insert(0) += 1;

        match &notification.event {
            ComponentEvent::ProcessError(err) => {
                *self.errors_by_kind.entry(err.kind().to_string()).or_insert(0) += 1;
                *self
                    .errors_by_source
                    .entry(notification.source.name().to_string())
                    .or_insert(0) += 1;
            }
            ComponentEvent::EntitiesDiscarded(items) => self.discarded += items.len() as u64,
            _ => {}
        }
    }

    /// Add a throughput sample
    pub fn record_throughput(&mut self, items_per_second: f64) {
        self.throughput.push(items_per_second);
    }

    pub fn error_count(&self) -> u64 {
        self.errors_by_kind.values().sum()
    }

    pub fn summary(&self) -> NotificationSummary {
        NotificationSummary {
            total: self.total,
            errors: self.error_count(),
            discarded: self.discarded,
            error_rate: if self.total > 0 {
                self.error_count() as f64 / self.total as f64 * 100.0
            } else {
                0.0
            },
            by_event: self.by_event.clone(),
            errors_by_kind: self.errors_by_kind.clone(),
            throughput: StatsSummary::from(&self.throughput),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Notification summary
#[derive(Debug, Clone, Default)]
pub struct NotificationSummary {
    pub total: u64,
    pub errors: u64,
    pub discarded: u64,
    pub error_rate: f64,
    pub by_event: BTreeMap<String, u64>,
    pub errors_by_kind: BTreeMap<String, u64>,
    pub throughput: StatsSummary,
}

impl fmt::Display for NotificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Notification Summary ===")?;
        writeln!(f, "Total notifications: {}", self.total)?;
        writeln!(f, "Process errors: {} ({:.2}%)", self.errors, self.error_rate)?;
        writeln!(f, "Discarded measurements: {}", self.discarded)?;
        writeln!(f, "Throughput (items/s): {}", self.throughput)?;

        if !self.by_event.is_empty() {
            writeln!(f, "By event:")?;
            for (event, count) in &self.by_event {
                writeln!(f, "  {event}: {count}")?;
            }
        }
        if !self.errors_by_kind.is_empty() {
            writeln!(f, "Errors by kind:")?;
            for (kind, count) in &self.errors_by_kind {
                writeln!(f, "  {kind}: {count}")?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
