// src/infra/errors.rs — Error types for bamot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BamotError {
    // Oracle errors (never retried inside the controller)
    #[error("Oracle '{oracle}' error: {message}")]
    Oracle { oracle: String, message: String },

    #[error("Oracle '{oracle}' unavailable: {message}")]
    OracleUnavailable { oracle: String, message: String },

    // Item errors
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BamotError {
    /// Whether the failure came from the completion service rather than the item or setup.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            BamotError::Oracle { .. } | BamotError::OracleUnavailable { .. }
        )
    }
}
