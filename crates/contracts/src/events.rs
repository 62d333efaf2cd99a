//! Component notifications
//!
//! Components report through an `EventEmitter` handed to them by their owning
//! group. The group decides where (and whether) an event goes: once a
//! component has been removed its emitter is unwired and events are dropped.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ComponentId, ContractError};

/// Measurement signal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub u64);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig:{}", self.0)
    }
}

/// Canonical time-stamped measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Signal the value belongs to
    pub signal: SignalId,

    /// UTC timestamp (seconds since Unix epoch)
    pub timestamp: f64,

    /// Value
    pub value: f64,
}

/// Notification payload
#[derive(Debug, Clone)]
pub enum ComponentEvent {
    /// Informational text
    StatusMessage(String),
    /// Captured failure
    ProcessError(Arc<ContractError>),
    /// Declared input signal set changed
    InputSignalsChanged,
    /// Declared output signal set changed
    OutputSignalsChanged,
    /// Configuration changed
    ConfigurationChanged,
    /// Measurements discarded by the source
    EntitiesDiscarded(Arc<[Measurement]>),
    /// Source was torn down
    Disposed,
}

impl ComponentEvent {
    /// Event name (used in logs and listener failure reports)
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusMessage(_) => "StatusMessage",
            Self::ProcessError(_) => "ProcessError",
            Self::InputSignalsChanged => "InputSignalsChanged",
            Self::OutputSignalsChanged => "OutputSignalsChanged",
            Self::ConfigurationChanged => "ConfigurationChanged",
            Self::EntitiesDiscarded(_) => "EntitiesDiscarded",
            Self::Disposed => "Disposed",
        }
    }

    /// Wrap an error
    pub fn error(error: ContractError) -> Self {
        Self::ProcessError(Arc::new(error))
    }
}

/// Identity of whoever raised a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// The group itself
    Group { name: String },
    /// A member component
    Component { id: ComponentId, name: String },
}

impl EventSource {
    /// Source name
    pub fn name(&self) -> &str {
        match self {
            Self::Group { name } | Self::Component { name, .. } => name,
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group { name } => write!(f, "group '{name}'"),
            Self::Component { id, name } => write!(f, "component '{name}' [{id}]"),
        }
    }
}

/// Notification delivered to external listeners
#[derive(Debug, Clone)]
pub struct Notification {
    pub source: EventSource,
    pub event: ComponentEvent,
}

/// Raw event callback
pub type EventCallback = Arc<dyn Fn(ComponentEvent) + Send + Sync>;

/// Handle a component uses to raise notifications
///
/// Cheap to clone. A detached emitter silently drops everything.
#[derive(Clone, Default)]
pub struct EventEmitter {
    callback: Option<EventCallback>,
}

impl EventEmitter {
    /// Create an emitter forwarding to `callback`
    pub fn new(callback: EventCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Emitter that drops every event
    pub fn detached() -> Self {
        Self::default()
    }

    /// Whether a callback is attached
    pub fn is_connected(&self) -> bool {
        self.callback.is_some()
    }

    /// Raise an event
    pub fn emit(&self, event: ComponentEvent) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(ComponentEvent::StatusMessage(message.into()));
    }

    pub fn process_error(&self, error: ContractError) {
        self.emit(ComponentEvent::error(error));
    }

    pub fn input_signals_changed(&self) {
        self.emit(ComponentEvent::InputSignalsChanged);
    }

    pub fn output_signals_changed(&self) {
        self.emit(ComponentEvent::OutputSignalsChanged);
    }

    pub fn configuration_changed(&self) {
        self.emit(ComponentEvent::ConfigurationChanged);
    }

    pub fn entities_discarded(&self, items: Vec<Measurement>) {
        self.emit(ComponentEvent::EntitiesDiscarded(items.into()));
    }

    pub fn disposed(&self) {
        self.emit(ComponentEvent::Disposed);
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("connected", &self.is_connected())
            .finish()
    }
}
