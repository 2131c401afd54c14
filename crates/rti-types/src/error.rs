use thiserror::Error;

#[derive(Error, Debug)]
pub enum RtiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Extra source outside the grid: iz={iz}, jr={jr}")]
    SourceOutOfBounds { iz: i64, jr: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RtiResult<T> = Result<T, RtiError>;
