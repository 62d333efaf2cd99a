//! Group configuration

use std::time::Duration;

use contracts::{ComponentRole, GroupDefinition, DEFAULT_INITIALIZATION_TIMEOUT};

/// Default throughput sampling period
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Component group configuration
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Group name (logs, notifications, status)
    pub name: String,

    /// Role shared by every member
    pub role: ComponentRole,

    /// Load only temporal-session rows
    pub temporal: bool,

    /// Watchdog timeout when a descriptor does not set one
    pub default_initialization_timeout: Duration,

    /// Throughput sampling period
    pub monitor_interval: Duration,

    /// Emit periodic throughput statistics while started
    pub monitor_enabled: bool,

    /// Hold auto-start until the group is started
    pub delay_auto_start: bool,
}

impl GroupConfig {
    /// Configuration with default settings
    pub fn new(name: impl Into<String>, role: ComponentRole) -> Self {
        Self {
            name: name.into(),
            role,
            temporal: false,
            default_initialization_timeout: DEFAULT_INITIALIZATION_TIMEOUT,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            monitor_enabled: true,
            delay_auto_start: false,
        }
    }

    pub fn with_temporal(mut self, temporal: bool) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_initialization_timeout(mut self, timeout: Duration) -> Self {
        self.default_initialization_timeout = timeout;
        self
    }

    pub fn with_monitor(mut self, enabled: bool, interval: Duration) -> Self {
        self.monitor_enabled = enabled;
        self.monitor_interval = interval;
        self
    }

    pub fn with_delay_auto_start(mut self, delay: bool) -> Self {
        self.delay_auto_start = delay;
        self
    }
}

impl From<&GroupDefinition> for GroupConfig {
    fn from(def: &GroupDefinition) -> Self {
        Self {
            name: def.name.clone(),
            role: def.role,
            temporal: def.temporal,
            default_initialization_timeout: Duration::from_millis(def.initialization_timeout_ms),
            monitor_interval: Duration::from_secs(def.monitor_interval_secs),
            monitor_enabled: def.monitor_enabled,
            delay_auto_start: def.delay_auto_start,
        }
    }
}
