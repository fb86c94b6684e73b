use thiserror::Error;

/// Errors raised by the simulation core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking operation was interrupted by shutdown.
    #[error("operation cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SimError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SimError::Cancelled)
    }
}

pub type SimResult<T> = Result<T, SimError>;
