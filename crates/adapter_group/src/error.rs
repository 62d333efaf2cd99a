//! Component group error types

use contracts::{ComponentId, ContractError};
use thiserror::Error;

/// Component group specific error
#[derive(Debug, Error)]
pub enum GroupError {
    /// `load` called before a data source was assigned
    #[error("no data source has been defined for group '{group}'")]
    NoDataSource { group: String },

    /// `load` called without a table name
    #[error("data member (table name) is undefined for group '{group}'")]
    NoDataMember { group: String },

    /// Table missing from the data source
    #[error("table '{table}' was not found in data source '{data_source}'")]
    TableNotFound { table: String, data_source: String },

    /// No member with the given id
    #[error("no component with id {id} in group '{group}'")]
    ComponentNotFound { group: String, id: ComponentId },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl GroupError {
    /// Whether this is a configuration problem (as opposed to a lifecycle one)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoDataSource { .. } | Self::NoDataMember { .. } | Self::TableNotFound { .. }
        ) || matches!(self, Self::Contract(ContractError::InvalidConfiguration { .. }))
    }
}

impl From<GroupError> for ContractError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::Contract(inner) => inner,
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, GroupError>;
