//! Administrative commands accepted by a group

use std::fmt;
use std::str::FromStr;

use contracts::ContractError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::group::ComponentGroup;

/// Administrative command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Start every member
    Start,
    /// Stop every member
    Stop,
    /// Restart throughput accounting
    ResetStatistics,
    /// Broadcast a temporal constraint
    SetTemporalConstraint {
        #[serde(default)]
        start: Option<String>,
        #[serde(default)]
        stop: Option<String>,
        #[serde(default)]
        parameters: String,
    },
}

impl AdminCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::ResetStatistics => "reset-statistics",
            Self::SetTemporalConstraint { .. } => "set-temporal-constraint",
        }
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse the text form
///
/// `start`, `stop`, `reset-statistics` and
/// `set-temporal-constraint <start> <stop> [parameters]`, where `-` stands
/// for an absent bound.
impl FromStr for AdminCommand {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_lowercase();

        let command = match verb.as_str() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "reset-statistics" | "resetstatistics" => Self::ResetStatistics,
            "set-temporal-constraint" | "settemporalconstraint" => {
                let bound = |part: Option<&str>| {
                    part.filter(|p| *p != "-").map(str::to_string)
                };
                let start = bound(parts.next());
                let stop = bound(parts.next());
                let parameters = parts.collect::<Vec<_>>().join(" ");
                return Ok(Self::SetTemporalConstraint {
                    start,
                    stop,
                    parameters,
                });
            }
            _ => {
                return Err(ContractError::config_validation(
                    "command",
                    format!("unknown administrative command \"{}\"", s.trim()),
                ))
            }
        };

        if parts.next().is_some() {
            return Err(ContractError::config_validation(
                "command",
                format!("command \"{verb}\" takes no arguments"),
            ));
        }
        Ok(command)
    }
}

impl ComponentGroup {
    /// Run an administrative command
    pub fn execute(&self, command: &AdminCommand) {
        info!(group = %self.name(), command = %command, "executing administrative command");
        match command {
            AdminCommand::Start => self.start(),
            AdminCommand::Stop => self.stop(),
            AdminCommand::ResetStatistics => self.reset_statistics(),
            AdminCommand::SetTemporalConstraint {
                start,
                stop,
                parameters,
            } => self.set_temporal_constraint(start.as_deref(), stop.as_deref(), parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupConfig;
    use crate::factory::RegistryFactory;
    use crate::mock_component::MockComponent;
    use contracts::ComponentRole;
    use std::sync::Arc;

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse::<AdminCommand>().unwrap(), AdminCommand::Start);
        assert_eq!(
            "Reset-Statistics".parse::<AdminCommand>().unwrap(),
            AdminCommand::ResetStatistics
        );
        assert_eq!(
            "set-temporal-constraint *-10m - frames=1"
                .parse::<AdminCommand>()
                .unwrap(),
            AdminCommand::SetTemporalConstraint {
                start: Some("*-10m".to_string()),
                stop: None,
                parameters: "frames=1".to_string(),
            }
        );
        assert!("reboot".parse::<AdminCommand>().is_err());
        assert!("stop now".parse::<AdminCommand>().is_err());
    }

    #[test]
    fn test_serde_form() {
        let command: AdminCommand = serde_json::from_str(
            r#"{ "command": "set_temporal_constraint", "start": "*-1d" }"#,
        )
        .unwrap();
        assert_eq!(
            command,
            AdminCommand::SetTemporalConstraint {
                start: Some("*-1d".to_string()),
                stop: None,
                parameters: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_execute_drives_group() {
        let group = ComponentGroup::new(
            GroupConfig::new("outputs", ComponentRole::Sink),
            Arc::new(RegistryFactory::new()),
        );
        let sink = Arc::new(MockComponent::new(1, "archive"));
        group.add(sink.clone());

        group.execute(&AdminCommand::Start);
        assert!(group.is_enabled());

        group.execute(&"set-temporal-constraint *-1h *".parse().unwrap());
        assert!(sink.temporal_constraint().is_some());

        group.execute(&AdminCommand::Stop);
        assert!(!group.is_enabled());
    }
}
