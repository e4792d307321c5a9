//! Error types for the Outlay client library.

use crate::models::ExpenseId;

/// All errors that can occur when using the Outlay client.
#[derive(Debug, thiserror::Error)]
pub enum OutlayError {
    /// HTTP transport failed before a response was received.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The record store rejected the request.
    #[error("record store rejected the request (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the record store.
        status: u16,
        /// Response body, as close to verbatim as possible.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record store backend failed.
    #[error("record store error: {0}")]
    Store(Box<dyn core::error::Error + Send + Sync>),

    /// No base URL was configured for the record store client.
    #[error("no base url was provided for the record store")]
    MissingBaseUrl,

    /// No API key was configured for the record store client.
    #[error("no api key was provided for the record store")]
    MissingApiKey,

    /// An expense amount failed boundary validation.
    #[error("expense amount must be a finite non-negative number, got {0}")]
    InvalidAmount(f64),

    /// No expense with the given id exists in the store.
    #[error("no expense with id {0}")]
    UnknownExpense(ExpenseId),

    /// An update was submitted with no fields set.
    #[error("expense update contains no fields")]
    EmptyPatch,

    /// A category string did not name one of the fixed categories.
    #[error("unknown category {0:?}, expected Food, Travel, Shopping, or Other")]
    UnknownCategory(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, OutlayError>;
