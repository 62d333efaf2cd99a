//! # Adapter Group
//!
//! Ordered, uniquely identified collections of pluggable components.
//!
//! A [`ComponentGroup`] loads its members from one descriptor table, wires
//! their notifications to external listeners, initializes each member in the
//! background under a watchdog, and fans lifecycle commands and queries out
//! to every member. An optional [`ThroughputMonitor`] reports processed
//! entity rates once per interval.

mod command;
mod config;
mod error;
mod factory;
mod group;
mod initializer;
mod listeners;
mod member;
mod mock_component;
mod monitor;

pub use command::AdminCommand;
pub use config::{GroupConfig, DEFAULT_MONITOR_INTERVAL};
pub use error::{GroupError, Result};
pub use factory::{RegistryFactory, MOCK_KIND};
pub use group::ComponentGroup;
pub use initializer::timeout_warning;
pub use mock_component::{MockCalls, MockComponent, MockComponentConfig};
pub use monitor::{
    format_runtime, group_thousands, rate, ThroughputMonitor, ThroughputSnapshot, ThroughputStats,
};
