//! Error taxonomy shared by every wxrelay crate.
//!
//! - `DatabaseError` covers anything the SQLite store reports.
//! - `ProviderError` covers the upstream weather service, including a
//!   well-formed response that carries a non-200 status code.
//! - `AppError` is what crosses the request boundary; the HTTP layer maps
//!   each variant onto a status code.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` for text that is safe to show a caller when the
/// underlying error text is not.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("invalid reporting filter: {0}")]
    InvalidFilter(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_filter(filter: impl Into<String>) -> Self {
        Self::InvalidFilter(filter.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns a short message suitable for API clients.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Storage(e) => e.user_message(),
            AppError::Provider(e) => e.user_message(),
            AppError::InvalidFilter(_) => "Unrecognized statistics filter.",
            AppError::NotFound(_) => "No matching record was found.",
            AppError::InvalidRequest(_) => "The request was malformed.",
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed.",
            AppError::Other(_) => "An unexpected error occurred.",
        }
    }
}

/// Database/storage errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => "The weather store is unavailable.",
            DatabaseError::QueryFailed(_) => "A data operation failed. Please try again.",
            DatabaseError::TransactionFailed(_) => "Saving weather data failed. Please try again.",
            DatabaseError::Corruption(_) => "Stored weather data appears to be corrupted.",
            DatabaseError::MigrationFailed(_) => "The weather store schema could not be updated.",
        }
    }
}

/// Upstream weather provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered, but with a non-200 status code in the body.
    #[error("{message}")]
    Unsuccessful { code: i64, message: String },

    #[error("Provider request timed out")]
    Timeout,

    #[error("Provider connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Message used when the provider fails without saying why.
pub const PROVIDER_UNKNOWN_REASON: &str =
    "failed to communicate with the weather provider: unknown reason";

impl ProviderError {
    /// Build the error for a non-200 `cod`, falling back to a generic message.
    pub fn unsuccessful(code: i64, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| PROVIDER_UNKNOWN_REASON.to_string());
        ProviderError::Unsuccessful { code, message }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Unsuccessful { .. } => "The weather provider rejected the request.",
            ProviderError::Timeout => "The weather provider timed out. Please try again.",
            ProviderError::ConnectionFailed(_) => "Unable to reach the weather provider.",
            ProviderError::Http { status, .. } if *status >= 500 => {
                "The weather provider is experiencing issues. Please try again later."
            }
            ProviderError::Http { .. } => "The weather provider request failed.",
            ProviderError::InvalidResponse(_) => "The weather provider sent an unexpected response.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration file not found.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to provider errors.
pub trait ReqwestErrorExt {
    fn into_provider_error(self) -> ProviderError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_provider_error(self) -> ProviderError {
        if self.is_timeout() {
            ProviderError::Timeout
        } else if self.is_connect() {
            ProviderError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            ProviderError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            ProviderError::Http {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            ProviderError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) => {
                DatabaseError::Corruption(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        e.into_database_error()
    }
}
