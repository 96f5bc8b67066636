use serde::Serialize;
use std::fmt;

/// Application error types surfaced to UI collaborators.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Errors writing to the record store
    Storage(String),
    /// Errors related to user supplied data
    Validation(String),
    /// Errors from a native notification backend
    Notification(String),
    /// Errors resolving settings or data directories
    Config(String),
    /// Errors starting or stopping the reminder scheduler
    Scheduler(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Notification(msg) => write!(f, "Notification error: {}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Scheduler(msg) => write!(f, "Scheduler error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversion to String for invoke command return types
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

// Convenience constructors
impl AppError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn notification<S: Into<String>>(msg: S) -> Self {
        AppError::Notification(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        AppError::Config(msg.into())
    }

    pub fn scheduler<S: Into<String>>(msg: S) -> Self {
        AppError::Scheduler(msg.into())
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;
