use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    /// Completion API failures, including timeouts.
    #[error("agent error: {0}")]
    Agent(String),

    /// Failures of third-party HTTP collaborators (auth backend, job search, billing).
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Errors caused by the caller rather than by this service or its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized(_) | Error::NotFound(_) | Error::InvalidInput(_)
        )
    }
}
