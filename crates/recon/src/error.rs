use thiserror::Error;

/// Errors raised by the valuation engine.
///
/// Per-comparable errors (rights, dates, sale conditions) are caught at the
/// pipeline boundary and recorded on that comparable's result. Only
/// `InsufficientComparables` and configuration errors reach the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    /// Rights conveyed cannot be converted to the subject's rights.
    #[error("comparable '{comparable_id}': cannot reconcile rights: {reason}")]
    InvalidRightsConfiguration { comparable_id: String, reason: String },

    /// Sale date or valuation date is unparseable.
    #[error("comparable '{comparable_id}': cannot parse {field} '{value}'")]
    DateParse {
        comparable_id: String,
        field: String,
        value: String,
    },

    /// Motivation discount outside [0, 1).
    #[error("comparable '{comparable_id}': invalid conditions of sale: {reason}")]
    InvalidSaleConditions { comparable_id: String, reason: String },

    /// Market parameters unusable for this comparable (e.g. appreciation rate ≤ -100%).
    #[error("comparable '{comparable_id}': invalid market parameters: {reason}")]
    InvalidMarketParameters { comparable_id: String, reason: String },

    /// Too few ACCEPTABLE/CAUTION comparables remain to reconcile.
    #[error("insufficient comparables: {usable} usable, at least {required} required")]
    InsufficientComparables { usable: usize, required: usize },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (inverted thresholds, bad factor bounds, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// IO error (config file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl ValuationError {
    /// Whether the error only disqualifies one comparable.
    pub fn is_per_comparable(&self) -> bool {
        matches!(
            self,
            Self::InvalidRightsConfiguration { .. }
                | Self::DateParse { .. }
                | Self::InvalidSaleConditions { .. }
                | Self::InvalidMarketParameters { .. }
        )
    }
}
