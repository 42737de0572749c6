use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid generator configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid parameter '{name}': {details}")]
    InvalidParameter { name: String, details: String },

    #[error("No financial data found: {0}")]
    NotFound(String),

    #[error("KPI computation failed: {0}")]
    Computation(String),

    #[error("Invariant violation on {date}: {details}")]
    InvariantViolation { date: NaiveDate, details: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    StorageLock,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    pub fn invalid_parameter(name: &str, details: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
