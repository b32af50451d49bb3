use thiserror::Error;

#[derive(Error, Debug)]
pub enum NextWaveError {
    #[error("config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payment error: {0}")]
    Payment(String),

    #[error("mail error: {0}")]
    Mail(String),
}

pub type Result<T> = std::result::Result<T, NextWaveError>;
