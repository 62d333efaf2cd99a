//! # Contracts
//!
//! Shared interface contracts for the concentrator, defining the data
//! structures and traits exchanged between crates.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Measurement timestamps are UTC seconds since the Unix epoch (f64)
//! - Temporal constraints are expressed as strings and resolved with chrono

mod component;
mod concentrator;
mod descriptor;
mod error;
mod events;
mod frame;
mod listener;
mod settings;
mod source_channel;
mod temporal;

pub use component::*;
pub use concentrator::*;
pub use descriptor::*;
pub use error::*;
pub use events::*;
pub use frame::*;
pub use listener::*;
pub use settings::*;
pub use source_channel::SourceChannel;
pub use temporal::*;
