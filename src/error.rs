use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Two-factor code required: {0}")]
    TwoFactorRequired(String),

    #[error("Ring API error: {0}")]
    Api(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
