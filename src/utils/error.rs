use thiserror::Error;

use crate::models::Stage;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Navigation to {url} did not settle within {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("Element not found during {stage}: {selector}")]
    ElementNotFound { stage: Stage, selector: String },

    #[error("Result {selector} did not appear within {timeout_secs}s")]
    ExtractionTimeout { selector: String, timeout_secs: u64 },

    #[error("Unexpected page state: {0}")]
    UnexpectedPageState(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Notifier error: {notifier}: {message}")]
    Notification { notifier: String, message: String },

    #[error("Logging error: {0}")]
    Logging(String),
}

impl AppError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        AppError::Browser(err.to_string())
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
