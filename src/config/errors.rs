use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::FeatureName;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file [{path}]: {source}")]
    Read {
        path: String,
        source: std::io::Error
    },
    #[error("Config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Weight for feature [{feature}] must be a non-negative number, got [{weight}]")]
    InvalidWeight {
        feature: FeatureName,
        weight: f64
    },
    #[error("At least one scoring weight must be positive")]
    NoPositiveWeight,
    #[error("Scoring weights must sum to a finite number, got [{0}]")]
    WeightTotalNotFinite(f64),
    #[error("Score cutoff must be within [0, 100], got [{0}]")]
    ScoreCutoffOutOfRange(f64),
    #[error("Amount cutoff must not be negative, got [{0}]")]
    NegativeAmountCutoff(Decimal),
    #[error("Balance tolerance must not be negative, got [{0}]")]
    NegativeTolerance(Decimal),
    #[error("[{name}] must be a positive number, got [{value}]")]
    NonPositive {
        name: &'static str,
        value: f64
    }
}
