//! Result and error types for the core library

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::Currency;

/// Core library error type
///
/// Business-rule violations (insufficient funds, unsupported currency, bad
/// amounts) are distinct variants so the HTTP layer can map them to 4xx
/// responses without string matching. Infrastructure failures carry the
/// underlying message.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Insufficient {currency} funds: requested {requested}, available {available}")]
    InsufficientFunds {
        currency: Currency,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("Rate service unavailable: {0}")]
    RateServiceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an unauthenticated error
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// True if the caller may retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
