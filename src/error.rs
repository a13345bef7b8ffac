use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid policy value for {field} ({value}): {reason}")]
    InvalidPolicy {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
