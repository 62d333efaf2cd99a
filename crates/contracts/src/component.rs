//! Component & ComponentFactory traits
//!
//! A component is a pluggable source, transform or sink managed by a
//! component group. All methods take `&self`: a component is shared between
//! its group and the group's background initialization task, so mutable
//! state lives behind interior mutability.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ComponentId, ContractError, DataSource, Descriptor, EventEmitter, SignalId};

/// Processing interval meaning "use the component's default"
pub const DEFAULT_PROCESSING_INTERVAL: i32 = -1;

/// Role shared by every member of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    /// Turns frames into measurements
    Source,
    /// Computes on measurements
    Transform,
    /// Forwards or archives measurements
    Sink,
}

impl ComponentRole {
    /// Conventional descriptor table for this role
    pub fn default_table(&self) -> &'static str {
        match self {
            Self::Source => "InputAdapters",
            Self::Transform => "ActionAdapters",
            Self::Sink => "OutputAdapters",
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Transform => "transform",
            Self::Sink => "sink",
        })
    }
}

/// Pluggable processing component
pub trait Component: Send + Sync {
    /// Identity key (from the descriptor)
    fn id(&self) -> ComponentId;

    /// Display name (from the descriptor)
    fn name(&self) -> &str;

    /// Apply a descriptor's settings
    fn configure(&self, descriptor: &Descriptor) -> Result<(), ContractError> {
        let _ = descriptor;
        Ok(())
    }

    /// Receive the emitter used to raise notifications
    fn connect_events(&self, events: EventEmitter) {
        let _ = events;
    }

    /// Receive the shared data source
    fn set_data_source(&self, data_source: Arc<DataSource>) {
        let _ = data_source;
    }

    /// One-time initialization; may block
    fn initialize(&self) -> Result<(), ContractError>;

    /// Begin processing
    fn start(&self) -> Result<(), ContractError>;

    /// Stop processing
    fn stop(&self) -> Result<(), ContractError>;

    /// Whether the component is currently processing
    fn is_running(&self) -> bool;

    /// Start automatically once initialized
    fn auto_start(&self) -> bool {
        true
    }

    /// -1 = default, 0 = as fast as possible, >0 = explicit delay
    fn processing_interval(&self) -> i32 {
        DEFAULT_PROCESSING_INTERVAL
    }

    fn set_processing_interval(&self, interval: i32) {
        let _ = interval;
    }

    /// Restrict processing to a time range; `None`/empty for both cancels
    ///
    /// The expressions are passed through verbatim (see [`crate::TemporalConstraint`]).
    fn set_temporal_constraint(
        &self,
        start: Option<&str>,
        stop: Option<&str>,
        parameters: &str,
    ) -> Result<(), ContractError> {
        let _ = (start, stop, parameters);
        Ok(())
    }

    /// Human-readable status text
    fn status(&self) -> Result<String, ContractError>;

    /// Signals this component consumes
    fn input_signals(&self) -> HashSet<SignalId> {
        HashSet::new()
    }

    /// Signals this component produces
    fn output_signals(&self) -> HashSet<SignalId> {
        HashSet::new()
    }

    /// Total items processed since creation
    fn processed_count(&self) -> u64;

    /// Release resources; the component is not used afterwards
    fn dispose(&self) {}
}

/// Turns descriptors into live components
///
/// How a kind is resolved (registry, dynamic loading, scripting) is up to the
/// implementation.
pub trait ComponentFactory: Send + Sync {
    /// Construct an unstarted component
    ///
    /// # Errors
    /// `InvalidConfiguration` when the kind cannot be resolved.
    fn construct(&self, descriptor: &Descriptor) -> Result<Arc<dyn Component>, ContractError>;
}

impl<F> ComponentFactory for F
where
    F: Fn(&Descriptor) -> Result<Arc<dyn Component>, ContractError> + Send + Sync,
{
    fn construct(&self, descriptor: &Descriptor) -> Result<Arc<dyn Component>, ContractError> {
        self(descriptor)
    }
}
