use thiserror::Error;

/// Validation and contract errors exposed by `equitick-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("stock code cannot be empty")]
    EmptyCode,
    #[error("stock code must be exactly six ASCII digits: '{value}'")]
    InvalidStockCode { value: String },

    #[error("invalid trade date '{value}', expected YYYYMMDD or YYYY-MM-DD")]
    InvalidTradeDate { value: String },
    #[error("date range start {start} must not be after end {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("invalid adjust mode '{value}', expected one of qfq, hfq, none")]
    InvalidAdjust { value: String },
}
