use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache name: {0}")]
    InvalidName(String),

    #[error("Cache I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache index corrupt: {0}")]
    Json(#[from] serde_json::Error),
}
