mod errors;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::models::FeatureName;

pub use errors::ConfigError;

/// How a raw feature is rescaled against the batch population before weighting.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    ZScore,
    Percentile
}

/// Everything a pipeline run is parameterized by. Stages never fall back to constants of their
/// own; a missing key in a config file takes the default below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weights: BTreeMap<FeatureName, f64>,
    pub normalization: Normalization,
    /// Absolute z-score at which a feature saturates to its full weight.
    pub z_saturation: f64,
    /// Composite z-score above which a customer is reported as an anomaly.
    pub anomaly_z_threshold: f64,
    pub balance_tolerance: Decimal,
    pub thresholds: FlagThresholds
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    pub score_cutoff: f64,
    pub amount_cutoff: Option<Decimal>,
    pub flag_inconsistent_balances: bool
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let weights = [
            (FeatureName::TransactionCount, 1.0),
            (FeatureName::Velocity, 1.5),
            (FeatureName::OutflowTotal, 1.5),
            (FeatureName::InflowTotal, 0.5),
            (FeatureName::AverageAmount, 1.0),
            (FeatureName::MaxAmount, 1.5),
            (FeatureName::CounterpartyDiversity, 1.0),
            (FeatureName::InconsistencyRate, 2.0),
            (FeatureName::FullDrainRate, 2.0),
            (FeatureName::PeakDailyCount, 1.0),
            (FeatureName::BalanceRatio, 1.5),
        ];

        Self {
            weights: weights.into_iter().collect(),
            normalization: Normalization::ZScore,
            z_saturation: 3.0,
            anomaly_z_threshold: 2.0,
            balance_tolerance: Decimal::new(1, 2),
            thresholds: FlagThresholds::default()
        }
    }
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            score_cutoff: 50.0,
            amount_cutoff: None,
            flag_inconsistent_balances: true
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            source: error
        })?;

        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;

        debug!("Loaded pipeline config from {}", path.display());

        Ok(config)
    }

    /// Rejects configurations that would make scoring or flagging meaningless.
    ///
    /// # Errors
    /// Returns `ConfigError` if:
    /// - A weight is negative or not finite, every weight is zero, or the weights sum past `f64::MAX`.
    /// - The score cutoff lies outside `[0, 100]`.
    /// - The amount cutoff or balance tolerance is negative.
    /// - The z saturation or anomaly threshold is not a positive finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (feature, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight { feature: *feature, weight: *weight });
            }
        }

        let weight_total = self.weight_total();

        if !weight_total.is_finite() {
            return Err(ConfigError::WeightTotalNotFinite(weight_total));
        }

        if weight_total <= 0.0 {
            return Err(ConfigError::NoPositiveWeight);
        }

        let cutoff = self.thresholds.score_cutoff;
        if !cutoff.is_finite() || !(0.0..=100.0).contains(&cutoff) {
            return Err(ConfigError::ScoreCutoffOutOfRange(cutoff));
        }

        if let Some(amount_cutoff) = self.thresholds.amount_cutoff {
            if amount_cutoff.is_sign_negative() && !amount_cutoff.is_zero() {
                return Err(ConfigError::NegativeAmountCutoff(amount_cutoff));
            }
        }

        if self.balance_tolerance.is_sign_negative() && !self.balance_tolerance.is_zero() {
            return Err(ConfigError::NegativeTolerance(self.balance_tolerance));
        }

        if !self.z_saturation.is_finite() || self.z_saturation <= 0.0 {
            return Err(ConfigError::NonPositive { name: "z_saturation", value: self.z_saturation });
        }

        if !self.anomaly_z_threshold.is_finite() || self.anomaly_z_threshold <= 0.0 {
            return Err(ConfigError::NonPositive { name: "anomaly_z_threshold", value: self.anomaly_z_threshold });
        }

        Ok(())
    }

    pub fn weight_total(&self) -> f64 {
        self.weights.values().sum()
    }
}
