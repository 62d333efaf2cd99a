//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration loading error
    #[error("Failed to load configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// A group could not load its members
    #[error("Group '{group}' failed to load: {source}")]
    GroupLoad {
        group: String,
        #[source]
        source: adapter_group::GroupError,
    },

    /// Malformed administrative command
    #[error("Invalid administrative command \"{command}\": {message}")]
    AdminCommand { command: String, message: String },

    /// Run loop error
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn group_load(group: impl Into<String>, source: adapter_group::GroupError) -> Self {
        Self::GroupLoad {
            group: group.into(),
            source,
        }
    }

    pub fn admin_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AdminCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
