//! Descriptor & DataSource - declarative component configuration
//!
//! A `DataSource` is a named set of descriptor tables. Each table holds the
//! rows of one component group (e.g. `InputAdapters`, `ActionAdapters`,
//! `OutputAdapters`); each row describes how to construct one component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ContractError, Settings};

/// Component identity key
pub type ComponentId = u32;

/// Declarative description of one component
///
/// Several descriptors may share the same `id`: they are alternative
/// configurations of the same logical component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Descriptor {
    /// Identity key
    pub id: ComponentId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Factory resolution key
    #[validate(length(min = 1, message = "no component kind was defined"))]
    pub component_kind: String,

    /// Free-form `key=value;...` settings
    #[serde(default)]
    pub connection_string: String,

    /// Row is eligible for temporal (historical replay) groups
    #[serde(default)]
    pub temporal_session: bool,
}

impl Descriptor {
    /// Create a descriptor for a real-time group
    pub fn new(
        id: ComponentId,
        name: impl Into<String>,
        component_kind: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            component_kind: component_kind.into(),
            connection_string: connection_string.into(),
            temporal_session: false,
        }
    }

    /// Mark the row as eligible for temporal groups
    pub fn with_temporal_session(mut self, temporal_session: bool) -> Self {
        self.temporal_session = temporal_session;
        self
    }

    /// Name used in logs and error messages
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "[component]"
        } else {
            &self.name
        }
    }

    /// Parse the connection string
    pub fn settings(&self) -> Result<Settings, ContractError> {
        Settings::parse(&self.connection_string)
    }

    /// Validate declarative rules
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` naming this descriptor.
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(|e| {
            ContractError::invalid_configuration(self.display_name(), e.to_string())
        })
    }
}

/// Named set of descriptor tables
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DataSource {
    /// Data set name
    #[validate(length(min = 1, message = "data source name cannot be empty"))]
    pub name: String,

    /// Table name -> rows
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Descriptor>>,
}

impl DataSource {
    /// Create an empty data source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Add (or replace) a table
    pub fn with_table(mut self, member: impl Into<String>, rows: Vec<Descriptor>) -> Self {
        self.tables.insert(member.into(), rows);
        self
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Whether the table exists
    pub fn contains_table(&self, member: &str) -> bool {
        self.tables.contains_key(member)
    }

    /// Select rows of a table, keeping only temporal rows when `temporal_only`
    ///
    /// Returns `None` when the table does not exist.
    pub fn select(&self, member: &str, temporal_only: bool) -> Option<Vec<&Descriptor>> {
        self.tables.get(member).map(|rows| {
            rows.iter()
                .filter(|row| !temporal_only || row.temporal_session)
                .collect()
        })
    }

    /// First row matching `id`
    pub fn select_by_id(
        &self,
        member: &str,
        id: ComponentId,
        temporal_only: bool,
    ) -> Option<&Descriptor> {
        self.tables.get(member)?.iter().find(|row| {
            row.id == id && (!temporal_only || row.temporal_session)
        })
    }
}
