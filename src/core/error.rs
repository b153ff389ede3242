use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),
}

impl InventoryError {
    /// Collaborator faults are systemic and may succeed on retry; they are
    /// never a domain rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;

impl From<tokio::task::JoinError> for InventoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl From<reqwest::Error> for InventoryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
