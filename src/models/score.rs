use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::models::FeatureName;
use crate::types::CustomerId;

pub type ScoreTable = BTreeMap<CustomerId, RiskScore>;

/// One customer's risk score for a single run.
///
/// Scores are normalized against the population of the batch they were computed from, so two
/// scores are only comparable when they come from the same run.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskScore {
    pub customer_id: CustomerId,
    /// Always within `[0, 100]`.
    pub score: f64,
    /// Sorted by absolute contribution, largest first, ties broken by feature name.
    pub factors: Vec<Factor>,
    /// Mean absolute z-score over the features that varied across the batch.
    pub composite_z: f64,
    pub band: RiskBand,
    pub is_anomaly: bool
}

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub feature: FeatureName,
    pub weight: f64,
    pub contribution: f64
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical
}

impl RiskBand {
    pub const ALL: [RiskBand; 4] = [RiskBand::Low, RiskBand::Medium, RiskBand::High, RiskBand::Critical];

    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            RiskBand::Low
        } else if score < 50.0 {
            RiskBand::Medium
        } else if score < 75.0 {
            RiskBand::High
        } else {
            RiskBand::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
            RiskBand::Critical => "Critical"
        }
    }
}

impl Display for RiskBand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
