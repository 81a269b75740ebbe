use thiserror::Error;

/// Application-wide error types for the crawler.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request, navigation, or selector wait timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Headless browser failed to launch, open a page, or run a script.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Markup or in-page payload could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Caller-supplied argument was rejected before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration value missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}
