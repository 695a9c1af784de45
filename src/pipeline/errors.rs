use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::config::ConfigError;
use crate::types::MonetaryError;

/// Why the validator refused a raw row. Rejected rows never reach aggregation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Missing required field [{0}]")]
    MissingField(&'static str),
    #[error("Amount is not numeric: {0}")]
    NonNumericAmount(MonetaryError),
    #[error("Amount must not be negative, got [{0}]")]
    NegativeAmount(String),
    #[error("Unknown transaction type [{0}]")]
    UnknownType(String),
    #[error("Malformed timestamp [{0}]")]
    MalformedTimestamp(String),
    #[error("Malformed transaction id [{0}]")]
    MalformedId(String),
    #[error("Balance field [{field}] is not numeric: {error}")]
    NonNumericBalance {
        field: &'static str,
        error: MonetaryError
    },
    #[error("Duplicate transaction id [{0}]")]
    DuplicateId(u64),
    #[error("Repeats the content of row [{first_row}]")]
    DuplicateRow {
        first_row: usize
    },
    #[error("Row could not be read: {0}")]
    Unreadable(String)
}

/// A rejection diagnostic. `row` is the zero-based position of the row in the batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Row [{row}] rejected: {reason}")]
pub struct RejectedRow {
    pub row: usize,
    pub reason: RejectReason
}

impl RejectedRow {
    pub fn new(row: usize, reason: RejectReason) -> Self {
        Self { row, reason }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    FeatureBuilder,
    RiskScorer
}

impl Display for Stage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FeatureBuilder => "feature builder",
            Stage::RiskScorer => "risk scorer"
        };

        formatter.write_str(name)
    }
}

/// Failures that abort a whole run. Row-level problems are never reported through this type.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No data: the {stage} received an empty batch")]
    EmptyBatch {
        stage: Stage
    },
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(#[from] ConfigError)
}
