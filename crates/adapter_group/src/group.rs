//! ComponentGroup - ordered set of components sharing one role
//!
//! # Locking
//! Membership lives in one `Mutex<Vec<Member>>`. Every operation that calls
//! into components (start, stop, aggregates, status) works on a snapshot
//! cloned under the lock, so a component or listener may call back into the
//! group without deadlocking.
//!
//! # Teardown
//! An outgoing member is detached while the lock is held (an initialization
//! still in flight becomes a no-op), then stopped, unwired from everything
//! but `Disposed`, disposed and finally unwired completely.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use contracts::{
    panic_message, Component, ComponentEvent, ComponentFactory, ComponentId, ComponentRole,
    ContractError, DataSource, Descriptor, EventEmitter, Notification, SignalId,
    DEFAULT_PROCESSING_INTERVAL,
};
use metrics::gauge;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use crate::config::GroupConfig;
use crate::error::{GroupError, Result};
use crate::initializer;
use crate::listeners::Notifier;
use crate::member::{Member, Wiring};
use crate::monitor::{group_thousands, ThroughputMonitor, ThroughputSnapshot};

const STATUS_RULE_WIDTH: usize = 79;

/// State shared between a group handle and its background tasks
pub(crate) struct GroupShared {
    pub config: GroupConfig,
    pub notifier: Notifier,
    pub runtime: Option<Handle>,
    members: Mutex<Vec<Member>>,
    factory: Arc<dyn ComponentFactory>,
    data_source: RwLock<Option<Arc<DataSource>>>,
    data_member: RwLock<String>,
    initialized: AtomicBool,
    enabled: AtomicBool,
    delay_auto_start: AtomicBool,
    disposed: AtomicBool,
    processing_interval: AtomicI32,
    monitor: ThroughputMonitor,
}

impl GroupShared {
    pub fn is_auto_start_delayed(&self) -> bool {
        self.delay_auto_start.load(Ordering::Acquire)
    }

    fn lock_members(&self) -> MutexGuard<'_, Vec<Member>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Member> {
        self.lock_members().clone()
    }

    fn processed_count(&self) -> u64 {
        self.snapshot()
            .iter()
            .fold(0u64, |sum, m| sum.saturating_add(m.component.processed_count()))
    }

    fn record_member_count(&self, count: usize) {
        gauge!("concentrator_group_members", "group" => self.config.name.clone()).set(count as f64);
    }
}

/// Group of components loaded from one descriptor table
///
/// Cheap to clone; clones share the same members.
///
/// # Example
/// ```ignore
/// let group = ComponentGroup::new(GroupConfig::new("inputs", ComponentRole::Source), factory);
/// group.subscribe(|n| println!("{}: {:?}", n.source, n.event));
/// group.load_from(data_source, "InputAdapters")?;
/// group.start();
/// ```
#[derive(Clone)]
pub struct ComponentGroup {
    shared: Arc<GroupShared>,
}

impl ComponentGroup {
    /// Create a group on the current tokio runtime, if any
    ///
    /// Without a runtime, members are added but their initialization is
    /// reported as failed.
    pub fn new(config: GroupConfig, factory: Arc<dyn ComponentFactory>) -> Self {
        Self::build(config, factory, Handle::try_current().ok())
    }

    /// Create a group running its background work on `runtime`
    pub fn with_runtime(
        config: GroupConfig,
        factory: Arc<dyn ComponentFactory>,
        runtime: Handle,
    ) -> Self {
        Self::build(config, factory, Some(runtime))
    }

    fn build(
        config: GroupConfig,
        factory: Arc<dyn ComponentFactory>,
        runtime: Option<Handle>,
    ) -> Self {
        let shared = GroupShared {
            notifier: Notifier::new(config.name.clone()),
            monitor: ThroughputMonitor::new(config.monitor_interval),
            delay_auto_start: AtomicBool::new(config.delay_auto_start),
            data_member: RwLock::new(config.role.default_table().to_string()),
            config,
            runtime,
            members: Mutex::new(Vec::new()),
            factory,
            data_source: RwLock::new(None),
            initialized: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            processing_interval: AtomicI32::new(DEFAULT_PROCESSING_INTERVAL),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn role(&self) -> ComponentRole {
        self.shared.config.role
    }

    pub fn config(&self) -> &GroupConfig {
        &self.shared.config
    }

    /// Register an external listener for group and member notifications
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.shared.notifier.subscribe(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.shared.notifier.listener_count()
    }

    // ========================================================================
    // Data source
    // ========================================================================

    pub fn data_source(&self) -> Option<Arc<DataSource>> {
        self.shared
            .data_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Assign the shared data source and hand it to every member
    pub fn set_data_source(&self, data_source: Arc<DataSource>) {
        *self
            .shared
            .data_source
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(data_source.clone());

        for member in self.shared.snapshot() {
            member.component.set_data_source(data_source.clone());
        }
    }

    /// Table the group loads from
    pub fn data_member(&self) -> String {
        self.shared
            .data_member
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_data_member(&self, member: impl Into<String>) {
        *self
            .shared
            .data_member
            .write()
            .unwrap_or_else(PoisonError::into_inner) = member.into();
    }

    // ========================================================================
    // Loading & construction
    // ========================================================================

    /// Assign data source and table, then [`load`](Self::load)
    pub fn load_from(&self, data_source: Arc<DataSource>, member: &str) -> Result<()> {
        self.set_data_source(data_source);
        self.set_data_member(member);
        self.load()
    }

    /// Rebuild membership from the data source table
    ///
    /// Rows that cannot be constructed are reported as process errors and
    /// skipped.
    ///
    /// # Errors
    /// `NoDataSource` or `NoDataMember` before anything changes;
    /// `TableNotFound` after the group was cleared, leaving it uninitialized.
    #[instrument(name = "group_load", skip(self), fields(group = %self.name()))]
    pub fn load(&self) -> Result<()> {
        let data_source = self.data_source().ok_or_else(|| GroupError::NoDataSource {
            group: self.name().to_string(),
        })?;

        let member = self.data_member();
        if member.trim().is_empty() {
            return Err(GroupError::NoDataMember {
                group: self.name().to_string(),
            });
        }

        self.shared.initialized.store(false, Ordering::Release);
        self.clear();

        let rows = data_source
            .select(&member, self.shared.config.temporal)
            .ok_or_else(|| GroupError::TableNotFound {
                table: member.clone(),
                data_source: data_source.name.clone(),
            })?;

        let total = rows.len();
        for row in rows {
            if let Ok((component, timeout)) = self.construct_member(row) {
                self.add_with_timeout(component, timeout);
            }
        }

        self.shared.initialized.store(true, Ordering::Release);
        info!(table = %member, rows = total, members = self.len(), "group loaded");
        Ok(())
    }

    /// Build an unstarted component from a descriptor
    ///
    /// Failures are also reported as a process error naming the component.
    pub fn try_construct(&self, descriptor: &Descriptor) -> Result<Arc<dyn Component>> {
        self.construct_member(descriptor)
            .map(|(component, _)| component)
            .map_err(GroupError::from)
    }

    fn construct_member(
        &self,
        descriptor: &Descriptor,
    ) -> std::result::Result<(Arc<dyn Component>, Duration), ContractError> {
        let result = self.build_component(descriptor);
        if let Err(e) = &result {
            // ContractError is not Clone; re-create the reported copy
            self.shared.notifier.group_error(ContractError::invalid_configuration(
                component_of(e).unwrap_or(descriptor.display_name()),
                message_of(e),
            ));
        }
        result
    }

    fn build_component(
        &self,
        descriptor: &Descriptor,
    ) -> std::result::Result<(Arc<dyn Component>, Duration), ContractError> {
        let name = descriptor.display_name();
        let with_name = |e: ContractError| match e {
            e @ ContractError::InvalidConfiguration { .. } => e,
            other => ContractError::invalid_configuration(name, other.to_string()),
        };

        descriptor.check()?;
        let settings = descriptor.settings().map_err(with_name)?;
        let component = self.shared.factory.construct(descriptor).map_err(with_name)?;
        component.configure(descriptor).map_err(with_name)?;
        if let Some(data_source) = self.data_source() {
            component.set_data_source(data_source);
        }

        let timeout =
            settings.initialization_timeout_or(self.shared.config.default_initialization_timeout);
        debug!(component = name, kind = %descriptor.component_kind, ?timeout, "component constructed");
        Ok((component, timeout))
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Add a component and schedule its initialization
    ///
    /// A member with the same id is replaced in place. Adding a component
    /// that is already a member is a no-op.
    pub fn add(&self, component: Arc<dyn Component>) {
        self.add_with_timeout(component, self.shared.config.default_initialization_timeout);
    }

    /// Add with an explicit watchdog timeout (`0` disables the watchdog)
    pub fn add_with_timeout(&self, component: Arc<dyn Component>, timeout: Duration) {
        let member = Member::new(component, timeout);
        let slot = member.id();
        self.install(member, slot, true);
    }

    /// Swap the member `id` for `component`
    ///
    /// Returns `false` (and leaves `component` untouched) when `id` is not a
    /// member. Swapping a member for itself keeps it as is.
    pub fn replace(&self, id: ComponentId, component: Arc<dyn Component>) -> bool {
        let member = Member::new(component, self.shared.config.default_initialization_timeout);
        self.install(member, id, false)
    }

    /// Remove and tear down member `id`
    pub fn remove(&self, id: ComponentId) -> bool {
        let outgoing = {
            let mut members = self.shared.lock_members();
            let Some(index) = members.iter().position(|m| m.id() == id) else {
                return false;
            };
            let outgoing = members.remove(index);
            outgoing.state.detach();
            self.shared.record_member_count(members.len());
            outgoing
        };

        self.teardown(outgoing);
        true
    }

    /// Remove and tear down every member
    pub fn clear(&self) {
        let outgoing = {
            let mut members = self.shared.lock_members();
            let outgoing: Vec<Member> = members.drain(..).collect();
            for member in &outgoing {
                member.state.detach();
            }
            self.shared.record_member_count(0);
            outgoing
        };

        for member in outgoing {
            self.teardown(member);
        }
    }

    /// Rebuild member `id` from its descriptor row
    ///
    /// Replaces the existing member in place or appends when absent. Returns
    /// `false` when there is no row for `id` or construction fails.
    #[instrument(name = "group_reinitialize", skip(self), fields(group = %self.name()))]
    pub fn try_reinitialize_by_id(&self, id: ComponentId) -> bool {
        let Some(data_source) = self.data_source() else {
            return false;
        };
        let table = self.data_member();
        let Some(row) = data_source.select_by_id(&table, id, self.shared.config.temporal) else {
            debug!(id, table = %table, "no descriptor row for component");
            return false;
        };

        match self.construct_member(row) {
            Ok((component, timeout)) => self.install(Member::new(component, timeout), id, true),
            Err(_) => false,
        }
    }

    fn install(&self, member: Member, slot: ComponentId, append: bool) -> bool {
        let mut outgoing = Vec::new();
        {
            let mut members = self.shared.lock_members();
            if let Some(existing) = members
                .iter()
                .find(|m| Arc::ptr_eq(&m.component, &member.component))
            {
                debug!(group = %self.name(), component_id = existing.id(), "component is already a member");
                return existing.id() == slot;
            }
            match members.iter().position(|m| m.id() == slot) {
                Some(index) => outgoing.push(std::mem::replace(&mut members[index], member.clone())),
                None if append => members.push(member.clone()),
                None => return false,
            }

            // Ids stay unique even when the incoming id differs from the slot
            let mut index = 0;
            while index < members.len() {
                let current = &members[index];
                if current.id() == member.id() && !Arc::ptr_eq(&current.state, &member.state) {
                    outgoing.push(members.remove(index));
                } else {
                    index += 1;
                }
            }

            for old in &outgoing {
                old.state.detach();
            }
            self.shared.record_member_count(members.len());
        }

        for old in outgoing {
            self.teardown(old);
        }

        member.component.connect_events(self.emitter_for(&member));
        debug!(group = %self.name(), component_id = member.id(), "member added");
        initializer::schedule(&self.shared, member);
        true
    }

    fn emitter_for(&self, member: &Member) -> EventEmitter {
        let group = Arc::downgrade(&self.shared);
        let state = member.state.clone();

        EventEmitter::new(Arc::new(move |event: ComponentEvent| {
            let deliver = match state.wiring() {
                Wiring::Wired => true,
                Wiring::DisposeOnly => matches!(event, ComponentEvent::Disposed),
                Wiring::Unwired => false,
            };
            if !deliver {
                return;
            }
            if let Some(shared) = group.upgrade() {
                shared.notifier.raise(state.source(), event);
            }
        }))
    }

    fn teardown(&self, member: Member) {
        member.state.detach();

        if member.component.is_running() {
            if let Err(e) = member.component.stop() {
                self.shared
                    .notifier
                    .group_error(ContractError::stop(member.state.name.clone(), message_of(&e)));
            }
        }

        member.state.set_wiring(Wiring::DisposeOnly);
        member.component.dispose();
        member.state.set_wiring(Wiring::Unwired);
        debug!(group = %self.name(), component_id = member.id(), "member disposed");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the group; no-op when already enabled
    ///
    /// Clears delayed auto-start, resets statistics and starts every
    /// initialized auto-start member that is not running.
    #[instrument(name = "group_start", skip(self), fields(group = %self.name()))]
    pub fn start(&self) {
        if self.shared.enabled.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shared.delay_auto_start.store(false, Ordering::Release);
        self.reset_statistics();

        for member in self.shared.snapshot() {
            if member.state.is_initialized()
                && member.component.auto_start()
                && !member.component.is_running()
            {
                if let Err(e) = member.component.start() {
                    self.shared
                        .notifier
                        .group_error(ContractError::start(member.state.name.clone(), message_of(&e)));
                }
            }
        }

        if self.shared.config.monitor_enabled {
            self.start_monitor();
        }
        info!(members = self.len(), "group started");
    }

    /// Stop the group; no-op when already stopped
    ///
    /// In-flight initializations are not cancelled, but members finishing
    /// after this call stay initialized-but-not-started until `start()`.
    #[instrument(name = "group_stop", skip(self), fields(group = %self.name()))]
    pub fn stop(&self) {
        if !self.shared.enabled.swap(false, Ordering::AcqRel) {
            return;
        }

        self.shared.delay_auto_start.store(true, Ordering::Release);

        for member in self.shared.snapshot() {
            if member.state.is_initialized() && member.component.is_running() {
                if let Err(e) = member.component.stop() {
                    self.shared
                        .notifier
                        .group_error(ContractError::stop(member.state.name.clone(), message_of(&e)));
                }
            }
        }

        self.shared.monitor.stop();
        info!("group stopped");
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// `start()` or `stop()`
    pub fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Whether the last `load` found its table
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    pub fn delay_auto_start(&self) -> bool {
        self.shared.is_auto_start_delayed()
    }

    /// Hold back auto-start of newly initialized members until `start()`
    pub fn set_delay_auto_start(&self, delay: bool) {
        self.shared.delay_auto_start.store(delay, Ordering::Release);
    }

    fn start_monitor(&self) {
        let Some(runtime) = self.shared.runtime.as_ref() else {
            warn!(group = %self.name(), "no async runtime, throughput monitor not started");
            return;
        };

        let group = Arc::downgrade(&self.shared);
        self.shared.monitor.start(runtime, move || {
            let Some(shared) = group.upgrade() else {
                return false;
            };
            let snapshot = shared.monitor.sample(shared.processed_count());
            shared.notifier.group_status(snapshot.to_string());
            true
        });
    }

    // ========================================================================
    // Cascaded settings
    // ========================================================================

    pub fn processing_interval(&self) -> i32 {
        self.shared.processing_interval.load(Ordering::Acquire)
    }

    /// Set the processing interval of the group and every member
    ///
    /// Values below -1 are treated as -1.
    pub fn set_processing_interval(&self, interval: i32) {
        let interval = interval.max(DEFAULT_PROCESSING_INTERVAL);
        self.shared
            .processing_interval
            .store(interval, Ordering::Release);

        for member in self.shared.snapshot() {
            member.component.set_processing_interval(interval);
        }
    }

    /// Pass a temporal constraint to every member unchanged
    ///
    /// `None` or empty for both bounds cancels the constraint. A member that
    /// rejects it is reported, the others still receive it.
    #[instrument(name = "group_set_temporal_constraint", skip(self), fields(group = %self.name()))]
    pub fn set_temporal_constraint(&self, start: Option<&str>, stop: Option<&str>, parameters: &str) {
        for member in self.shared.snapshot() {
            if let Err(e) = member.component.set_temporal_constraint(start, stop, parameters) {
                self.shared
                    .notifier
                    .raise(member.state.source(), ComponentEvent::error(e));
            }
        }
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    /// Union of every member's input signals
    pub fn input_signals(&self) -> HashSet<SignalId> {
        self.shared
            .snapshot()
            .iter()
            .flat_map(|m| m.component.input_signals())
            .collect()
    }

    /// Union of every member's output signals
    pub fn output_signals(&self) -> HashSet<SignalId> {
        self.shared
            .snapshot()
            .iter()
            .flat_map(|m| m.component.output_signals())
            .collect()
    }

    /// Sum of every member's processed count
    pub fn processed_count(&self) -> u64 {
        self.shared.processed_count()
    }

    // ========================================================================
    // Statistics & status
    // ========================================================================

    /// Restart throughput accounting from the current processed count
    pub fn reset_statistics(&self) {
        self.shared.monitor.reset(self.processed_count());
        self.shared
            .notifier
            .group_status("Statistics reset for this collection.");
    }

    /// Take a throughput sample now (also done by the periodic monitor)
    pub fn sample_throughput(&self) -> ThroughputSnapshot {
        self.shared.monitor.sample(self.processed_count())
    }

    /// Most recent throughput sample
    pub fn last_throughput(&self) -> Option<ThroughputSnapshot> {
        self.shared.monitor.last_snapshot()
    }

    pub fn is_monitor_running(&self) -> bool {
        self.shared.monitor.is_running()
    }

    /// Multi-line descriptive status
    pub fn status(&self) -> String {
        let shared = &self.shared;
        let members = shared.snapshot();
        let data_source = self.data_source();
        let mut status = String::new();

        let _ = writeln!(status, "  Total adapter components: {}", members.len());
        let _ = writeln!(status, "    Collection initialized: {}", self.is_initialized());
        let _ = writeln!(
            status,
            " Current operational state: {}",
            if self.is_enabled() { "Enabled" } else { "Disabled" }
        );
        if shared.config.monitor_enabled {
            let (items, rate) = self
                .last_throughput()
                .map_or((0, 0.0), |s| (s.total_items, s.total_rate));
            let _ = writeln!(status, "        Processed entities: {}", group_thousands(items));
            let _ = writeln!(
                status,
                "   Average processing rate: {} entities / second",
                group_thousands(rate as u64)
            );
        }
        let _ = writeln!(status, "       Data source defined: {}", data_source.is_some());
        if let Some(ds) = &data_source {
            let _ = writeln!(
                status,
                "    Referenced data source: {}, {} tables",
                ds.name,
                ds.table_count()
            );
        }
        let _ = writeln!(status, "    Data source table name: {}", self.data_member());

        if !members.is_empty() {
            let rule = "-".repeat(STATUS_RULE_WIDTH);
            let _ = writeln!(status);
            let _ = writeln!(status, "Status of each {} component:", self.name());
            let _ = writeln!(status, "{rule}");

            for (index, member) in members.iter().enumerate() {
                let _ = writeln!(status);
                let _ = writeln!(
                    status,
                    "Status of {} component {}, {}:",
                    self.role(),
                    index + 1,
                    member.state.name
                );
                match member_status(member) {
                    Ok(text) => status.push_str(&text),
                    Err(message) => {
                        let _ = writeln!(
                            status,
                            "Failed to retrieve status due to exception: {message}"
                        );
                    }
                }
            }

            let _ = writeln!(status);
            let _ = writeln!(status, "{rule}");
        }

        status
    }

    /// One-line status centered to `max_len` characters
    pub fn short_status(&self, max_len: usize) -> String {
        let text = format!("Total components: {}", group_thousands(self.len() as u64));
        let text: String = text.chars().take(max_len).collect();
        format!("{text:^max_len$}")
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn try_get_by_id(&self, id: ComponentId) -> Option<Arc<dyn Component>> {
        self.shared
            .lock_members()
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.component.clone())
    }

    /// Member `id`, or `ComponentNotFound`
    pub fn get(&self, id: ComponentId) -> Result<Arc<dyn Component>> {
        self.try_get_by_id(id).ok_or_else(|| GroupError::ComponentNotFound {
            group: self.name().to_string(),
            id,
        })
    }

    /// Case-insensitive name lookup
    pub fn try_get_by_name(&self, name: &str) -> Option<Arc<dyn Component>> {
        let name = name.to_lowercase();
        self.shared
            .lock_members()
            .iter()
            .find(|m| m.state.name.to_lowercase() == name)
            .map(|m| m.component.clone())
    }

    /// Whether member `id` has finished initializing
    pub fn is_member_initialized(&self, id: ComponentId) -> Option<bool> {
        self.shared
            .lock_members()
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.state.is_initialized())
    }

    /// Member ids in list order
    pub fn ids(&self) -> Vec<ComponentId> {
        self.shared.lock_members().iter().map(Member::id).collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock_members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Disposal
    // ========================================================================

    /// Stop the monitor, tear down every member and raise `Disposed`
    ///
    /// Runs once; later calls are ignored.
    #[instrument(name = "group_dispose", skip(self), fields(group = %self.name()))]
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shared.enabled.store(false, Ordering::Release);
        self.shared.monitor.stop();
        self.clear();
        self.shared
            .notifier
            .raise(self.shared.notifier.group_source(), ComponentEvent::Disposed);
        info!("group disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }
}

fn member_status(member: &Member) -> std::result::Result<String, String> {
    match catch_unwind(AssertUnwindSafe(|| member.component.status())) {
        Ok(Ok(text)) if text.ends_with('\n') => Ok(text),
        Ok(Ok(text)) => Ok(format!("{text}\n")),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn component_of(err: &ContractError) -> Option<&str> {
    match err {
        ContractError::InvalidConfiguration { component, .. } => Some(component),
        _ => None,
    }
}

fn message_of(err: &ContractError) -> String {
    match err {
        ContractError::InvalidConfiguration { message, .. }
        | ContractError::InitializationFailure { message, .. }
        | ContractError::StartFailure { message, .. }
        | ContractError::StopFailure { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
