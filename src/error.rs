//! Error types for the encoding, mining and rule generation stages

use thiserror::Error;

/// Errors raised by the market-basket core.
///
/// Empty itemset or rule collections are valid results and never show up here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BasketError {
    /// A transaction record could not be encoded.
    #[error("malformed transaction record at row {row}: {reason}")]
    MalformedInput { row: usize, reason: String },

    /// Minimum support must lie in (0, 1].
    #[error("min_support must be in (0, 1], got {0}")]
    InvalidSupport(f64),

    /// Minimum confidence must lie in [0, 1].
    #[error("min_confidence must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("max_len must be at least 1")]
    InvalidMaxLen,

    /// Item id with no entry in the item catalog.
    #[error("no catalog entry for item '{0}'")]
    UnknownItem(String),
}

impl BasketError {
    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            row,
            reason: reason.into(),
        }
    }
}
