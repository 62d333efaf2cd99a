//! ConcentratorConfig - top-level declarative configuration
//!
//! One data source holding every descriptor table, the component groups
//! that load from it, and the frame parser settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ComponentRole, DataSource};

fn default_true() -> bool {
    true
}

fn default_monitor_interval_secs() -> u64 {
    60
}

fn default_initialization_timeout_ms() -> u64 {
    15_000
}

fn default_max_frame_length() -> usize {
    65_535
}

/// Complete concentrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConcentratorConfig {
    /// Descriptor tables
    #[validate(nested)]
    pub data_source: DataSource,

    /// Component groups, in pipeline order (sources first)
    #[validate(nested)]
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,

    /// Frame parser settings
    #[serde(default)]
    pub parser: ParserDefinition,
}

/// One component group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GroupDefinition {
    /// Group name
    #[validate(length(min = 1, message = "group name cannot be empty"))]
    pub name: String,

    /// Role shared by every member
    pub role: ComponentRole,

    /// Descriptor table (defaults to the role's conventional table)
    #[serde(default)]
    pub table: Option<String>,

    /// Load only temporal-session rows
    #[serde(default)]
    pub temporal: bool,

    /// Emit periodic throughput statistics
    #[serde(default = "default_true")]
    pub monitor_enabled: bool,

    /// Throughput sampling period
    #[validate(range(min = 1, message = "monitor interval must be at least one second"))]
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    /// Watchdog timeout used when a descriptor does not set one
    #[serde(default = "default_initialization_timeout_ms")]
    pub initialization_timeout_ms: u64,

    /// Hold auto-start until the group is started
    #[serde(default)]
    pub delay_auto_start: bool,
}

impl GroupDefinition {
    /// Definition with default settings
    pub fn new(name: impl Into<String>, role: ComponentRole) -> Self {
        Self {
            name: name.into(),
            role,
            table: None,
            temporal: false,
            monitor_enabled: true,
            monitor_interval_secs: default_monitor_interval_secs(),
            initialization_timeout_ms: default_initialization_timeout_ms(),
            delay_auto_start: false,
        }
    }

    /// Effective descriptor table
    pub fn table(&self) -> &str {
        self.table
            .as_deref()
            .unwrap_or_else(|| self.role.default_table())
    }
}

/// Frame parser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserDefinition {
    /// Frames announcing a larger size are malformed
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,

    /// Verify the CRC trailer of each frame
    #[serde(default = "default_true")]
    pub verify_checksum: bool,

    /// Source channels fed by the demo runner
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Default for ParserDefinition {
    fn default() -> Self {
        Self {
            max_frame_length: default_max_frame_length(),
            verify_checksum: true,
            channels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_defaults_from_json() {
        let group: GroupDefinition =
            serde_json::from_str(r#"{ "name": "outputs", "role": "sink" }"#).unwrap();
        assert_eq!(group.table(), "OutputAdapters");
        assert!(group.monitor_enabled);
        assert_eq!(group.monitor_interval_secs, 60);
        assert_eq!(group.initialization_timeout_ms, 15_000);
    }

    #[test]
    fn test_explicit_table_wins() {
        let mut group = GroupDefinition::new("calc", ComponentRole::Transform);
        group.table = Some("CustomActions".into());
        assert_eq!(group.table(), "CustomActions");
    }

    #[test]
    fn test_nested_validation() {
        let config = ConcentratorConfig {
            data_source: DataSource::new("openPDC"),
            groups: vec![GroupDefinition::new("", ComponentRole::Source)],
            parser: ParserDefinition::default(),
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("group name cannot be empty"), "got: {err}");
    }
}
