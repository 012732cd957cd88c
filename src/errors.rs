use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    Database(sqlx::Error),
    /// An API call came back with a non-success, non-throttle status.
    /// Carries the endpoint and raw body so the caller can log exactly
    /// what the server said. Never retried.
    ApiCallFailed {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Transport or decode failure while talking to an external API.
    ExternalApi(String),
    /// Failure while fetching or parsing the ranking site.
    Scrape(String),
    /// Invalid caller-supplied input.
    InvalidInput(String),
    /// Internal error (file I/O, CSV writing).
    Internal(String),
    /// A throttle wait was interrupted by the shutdown signal.
    Cancelled,
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::ApiCallFailed {
                endpoint,
                status,
                body,
            } => write!(f, "'{}' returned status {}: {}", endpoint, status, body),
            AppError::ExternalApi(msg) => write!(f, "External API error: {}", msg),
            AppError::Scrape(msg) => write!(f, "Scrape error: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Cancelled => write!(f, "interrupted while waiting on the request budget"),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Database(e) => Some(e),
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    /// Converts a `sqlx::Error` into an `AppError`.
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Database(e)),
            context: context.into(),
        })
    }
}
