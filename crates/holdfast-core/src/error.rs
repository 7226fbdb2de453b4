use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoldfastError {
    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("invalid session id '{0}': must not contain path separators")]
    InvalidSessionId(String),

    #[error("no claimed item at {0}")]
    ClaimNotFound(String),

    #[error("not a claimed inbox item: {0}")]
    NotClaimed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HoldfastError>;
