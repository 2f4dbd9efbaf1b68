use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardflowError>;

#[derive(Debug, Error)]
pub enum BoardflowError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("resolution error: {0}")]
    Resolution(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
