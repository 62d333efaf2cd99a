//! Mock component implementation
//!
//! Implements `Component` with configurable delays and injected failures.
//! Used for testing and for running the concentrator without real devices.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use contracts::{
    Component, ComponentId, ContractError, DataSource, Descriptor, EventEmitter, SignalId,
    TemporalConstraint, DEFAULT_PROCESSING_INTERVAL,
};
use tracing::{debug, trace};

/// Mock component configuration
#[derive(Debug, Clone)]
pub struct MockComponentConfig {
    /// Blocking delay inside `initialize()`
    pub initialize_delay: Duration,
    pub fail_initialize: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub fail_status: bool,
    /// Start automatically once initialized
    pub auto_start: bool,
    pub inputs: Vec<SignalId>,
    pub outputs: Vec<SignalId>,
}

impl Default for MockComponentConfig {
    fn default() -> Self {
        Self {
            initialize_delay: Duration::ZERO,
            fail_initialize: false,
            fail_start: false,
            fail_stop: false,
            fail_status: false,
            auto_start: true,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl MockComponentConfig {
    /// Apply connection string settings
    ///
    /// Recognized keys: `initializeDelay` (ms), `failInitialize`, `failStart`,
    /// `failStop`, `failStatus`, `autoStart`, `inputs` and `outputs`
    /// (comma-separated signal ids).
    pub fn apply(&mut self, descriptor: &Descriptor) -> Result<(), ContractError> {
        let settings = descriptor.settings()?;
        let invalid = |key: &str, value: &str| {
            ContractError::invalid_configuration(
                descriptor.display_name(),
                format!("invalid value \"{value}\" for setting '{key}'"),
            )
        };

        if let Some(value) = settings.get("initializeDelay") {
            let ms = value.parse::<u64>().map_err(|_| invalid("initializeDelay", value))?;
            self.initialize_delay = Duration::from_millis(ms);
        }

        for (key, flag) in [
            ("failInitialize", &mut self.fail_initialize),
            ("failStart", &mut self.fail_start),
            ("failStop", &mut self.fail_stop),
            ("failStatus", &mut self.fail_status),
            ("autoStart", &mut self.auto_start),
        ] {
            if let Some(value) = settings.get(key) {
                *flag = parse_bool(value).ok_or_else(|| invalid(key, value))?;
            }
        }

        if let Some(value) = settings.get("inputs") {
            self.inputs = parse_signals(value).ok_or_else(|| invalid("inputs", value))?;
        }
        if let Some(value) = settings.get("outputs") {
            self.outputs = parse_signals(value).ok_or_else(|| invalid("outputs", value))?;
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_signals(value: &str) -> Option<Vec<SignalId>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().ok().map(SignalId))
        .collect()
}

/// Call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub initialize: usize,
    pub start: usize,
    pub stop: usize,
    pub dispose: usize,
}

#[derive(Debug, Default)]
struct CallCounters {
    initialize: AtomicUsize,
    start: AtomicUsize,
    stop: AtomicUsize,
    dispose: AtomicUsize,
}

/// Mock component
///
/// Does no processing of its own; tests drive `processed_count` through
/// [`simulate_processed`](Self::simulate_processed).
pub struct MockComponent {
    id: ComponentId,
    name: String,
    config: RwLock<MockComponentConfig>,
    events: RwLock<EventEmitter>,
    data_source: RwLock<Option<Arc<DataSource>>>,
    temporal: RwLock<Option<TemporalConstraint>>,
    running: AtomicBool,
    processed: AtomicU64,
    processing_interval: AtomicI32,
    calls: CallCounters,
}

impl MockComponent {
    /// Create mock component with default configuration
    pub fn new(id: ComponentId, name: impl Into<String>) -> Self {
        Self::with_config(id, name, MockComponentConfig::default())
    }

    pub fn with_config(id: ComponentId, name: impl Into<String>, config: MockComponentConfig) -> Self {
        Self {
            id,
            name: name.into(),
            config: RwLock::new(config),
            events: RwLock::new(EventEmitter::detached()),
            data_source: RwLock::new(None),
            temporal: RwLock::new(None),
            running: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            processing_interval: AtomicI32::new(DEFAULT_PROCESSING_INTERVAL),
            calls: CallCounters::default(),
        }
    }

    /// Pretend `count` more items were processed
    pub fn simulate_processed(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
        trace!(component = %self.name, count, "mock items processed");
    }

    /// Emitter handed over by the owning group
    pub fn events(&self) -> EventEmitter {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> MockCalls {
        MockCalls {
            initialize: self.calls.initialize.load(Ordering::SeqCst),
            start: self.calls.start.load(Ordering::SeqCst),
            stop: self.calls.stop.load(Ordering::SeqCst),
            dispose: self.calls.dispose.load(Ordering::SeqCst),
        }
    }

    pub fn config(&self) -> MockComponentConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Constraint currently in effect
    pub fn temporal_constraint(&self) -> Option<TemporalConstraint> {
        self.temporal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn data_source(&self) -> Option<Arc<DataSource>> {
        self.data_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Component for MockComponent {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&self, descriptor: &Descriptor) -> Result<(), ContractError> {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(descriptor)
    }

    fn connect_events(&self, events: EventEmitter) {
        *self.events.write().unwrap_or_else(PoisonError::into_inner) = events;
    }

    fn set_data_source(&self, data_source: Arc<DataSource>) {
        *self
            .data_source
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(data_source);
    }

    fn initialize(&self) -> Result<(), ContractError> {
        self.calls.initialize.fetch_add(1, Ordering::SeqCst);
        let config = self.config();

        if !config.initialize_delay.is_zero() {
            thread::sleep(config.initialize_delay);
        }
        if config.fail_initialize {
            return Err(ContractError::initialization(&self.name, "simulated initialization failure"));
        }

        debug!(component = %self.name, "mock component initialized");
        Ok(())
    }

    fn start(&self) -> Result<(), ContractError> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        if self.config().fail_start {
            return Err(ContractError::start(&self.name, "simulated start failure"));
        }

        // Idempotent
        if !self.running.swap(true, Ordering::SeqCst) {
            self.events().status(format!("{} started", self.name));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), ContractError> {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        if self.config().fail_stop {
            return Err(ContractError::stop(&self.name, "simulated stop failure"));
        }

        if self.running.swap(false, Ordering::SeqCst) {
            self.events().status(format!("{} stopped", self.name));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn auto_start(&self) -> bool {
        self.config().auto_start
    }

    fn processing_interval(&self) -> i32 {
        self.processing_interval.load(Ordering::Relaxed)
    }

    fn set_processing_interval(&self, interval: i32) {
        self.processing_interval.store(interval, Ordering::Relaxed);
    }

    fn set_temporal_constraint(
        &self,
        start: Option<&str>,
        stop: Option<&str>,
        parameters: &str,
    ) -> Result<(), ContractError> {
        let constraint = TemporalConstraint::parse(start, stop, parameters)?;
        *self.temporal.write().unwrap_or_else(PoisonError::into_inner) = constraint;
        Ok(())
    }

    fn status(&self) -> Result<String, ContractError> {
        if self.config().fail_status {
            return Err(ContractError::Other("simulated status failure".to_string()));
        }

        Ok(format!(
            "       Running: {}\n     Processed: {}\n      Interval: {}\n",
            self.is_running(),
            self.processed_count(),
            self.processing_interval()
        ))
    }

    fn input_signals(&self) -> HashSet<SignalId> {
        self.config().inputs.into_iter().collect()
    }

    fn output_signals(&self) -> HashSet<SignalId> {
        self.config().outputs.into_iter().collect()
    }

    fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    fn dispose(&self) {
        self.calls.dispose.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.events().disposed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_from_settings() {
        let mock = MockComponent::new(1, "pmu_a");
        let descriptor = Descriptor::new(
            1,
            "pmu_a",
            "mock",
            "initializeDelay=25; FailStart=true; autoStart=0; inputs=1,2; outputs={3}",
        );

        mock.configure(&descriptor).unwrap();

        let config = mock.config();
        assert_eq!(config.initialize_delay, Duration::from_millis(25));
        assert!(config.fail_start);
        assert!(!config.auto_start);
        assert_eq!(mock.input_signals().len(), 2);
        assert!(mock.output_signals().contains(&SignalId(3)));
    }

    #[test]
    fn test_configure_rejects_bad_values() {
        let mock = MockComponent::new(1, "pmu_a");
        let err = mock
            .configure(&Descriptor::new(1, "pmu_a", "mock", "failStart=maybe"))
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_lifecycle_counters() {
        let mock = MockComponent::new(1, "pmu_a");
        mock.initialize().unwrap();
        mock.start().unwrap();
        mock.start().unwrap();
        assert!(mock.is_running());
        mock.stop().unwrap();
        mock.dispose();

        assert_eq!(
            mock.calls(),
            MockCalls {
                initialize: 1,
                start: 2,
                stop: 1,
                dispose: 1
            }
        );
    }

    #[test]
    fn test_injected_failures() {
        let mock = MockComponent::with_config(
            9,
            "broken",
            MockComponentConfig {
                fail_initialize: true,
                fail_stop: true,
                fail_status: true,
                ..Default::default()
            },
        );
        assert!(mock.initialize().is_err());
        assert!(mock.stop().is_err());
        assert!(mock.status().is_err());
    }
}
