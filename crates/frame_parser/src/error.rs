//! Frame parser error types

use contracts::ContractError;
use thiserror::Error;

/// Frame parser error
#[derive(Debug, Error)]
pub enum ParserError {
    /// A queue worker needs a Tokio runtime and none is available
    #[error("failed to create notification queue '{queue}': no async runtime available")]
    NoRuntime {
        /// Queue name
        queue: String,
    },

    /// The queue worker has shut down
    #[error("notification queue '{queue}' is closed")]
    QueueClosed {
        /// Queue name
        queue: String,
    },

    /// Shared contract error
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<ParserError> for ContractError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::Contract(inner) => inner,
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Frame parser Result alias
pub type Result<T> = std::result::Result<T, ParserError>;
