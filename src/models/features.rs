use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{to_f64, CustomerId, Timestamp};

/// Per-customer feature vectors for one batch, ordered by customer id.
pub type FeatureTable = BTreeMap<CustomerId, CustomerFeatureVector>;

/// Aggregates over every clean transaction in which a customer took part.
///
/// Outflow counts only transactions where the customer was the sender and inflow only those where
/// the customer was the receiver. A vector is always rebuilt from the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFeatureVector {
    pub customer_id: CustomerId,
    pub transaction_count: usize,
    pub outflow_total: Decimal,
    pub inflow_total: Decimal,
    pub average_amount: Decimal,
    pub max_amount: Decimal,
    pub distinct_counterparties: usize,
    pub inconsistent_count: usize,
    pub full_drain_count: usize,
    /// Mean share of the sender's opening balance moved per sent transaction. A sent transaction
    /// without a positive opening balance counts as 0.
    pub balance_ratio: Decimal,
    /// Most transactions the customer took part in on a single day.
    pub peak_daily_count: usize,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub time_span: Timestamp
}

impl CustomerFeatureVector {
    /// Raw value of a scoring feature, before population normalization.
    pub fn value(&self, feature: FeatureName) -> f64 {
        let count = self.transaction_count.max(1) as f64;

        match feature {
            FeatureName::TransactionCount => self.transaction_count as f64,
            FeatureName::Velocity => self.transaction_count as f64 / (self.time_span as f64 + 1.0),
            FeatureName::OutflowTotal => to_f64(self.outflow_total),
            FeatureName::InflowTotal => to_f64(self.inflow_total),
            FeatureName::AverageAmount => to_f64(self.average_amount),
            FeatureName::MaxAmount => to_f64(self.max_amount),
            FeatureName::CounterpartyDiversity => self.distinct_counterparties as f64,
            FeatureName::InconsistencyRate => self.inconsistent_count as f64 / count,
            FeatureName::FullDrainRate => self.full_drain_count as f64 / count,
            FeatureName::PeakDailyCount => self.peak_daily_count as f64,
            FeatureName::BalanceRatio => to_f64(self.balance_ratio)
        }
    }
}

/// The scoring features a weight table can refer to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    TransactionCount,
    Velocity,
    OutflowTotal,
    InflowTotal,
    AverageAmount,
    MaxAmount,
    CounterpartyDiversity,
    InconsistencyRate,
    FullDrainRate,
    PeakDailyCount,
    BalanceRatio
}

impl FeatureName {
    pub const ALL: [FeatureName; 11] = [
        FeatureName::TransactionCount,
        FeatureName::Velocity,
        FeatureName::OutflowTotal,
        FeatureName::InflowTotal,
        FeatureName::AverageAmount,
        FeatureName::MaxAmount,
        FeatureName::CounterpartyDiversity,
        FeatureName::InconsistencyRate,
        FeatureName::FullDrainRate,
        FeatureName::PeakDailyCount,
        FeatureName::BalanceRatio
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::TransactionCount => "transaction_count",
            FeatureName::Velocity => "velocity",
            FeatureName::OutflowTotal => "outflow_total",
            FeatureName::InflowTotal => "inflow_total",
            FeatureName::AverageAmount => "average_amount",
            FeatureName::MaxAmount => "max_amount",
            FeatureName::CounterpartyDiversity => "counterparty_diversity",
            FeatureName::InconsistencyRate => "inconsistency_rate",
            FeatureName::FullDrainRate => "full_drain_rate",
            FeatureName::PeakDailyCount => "peak_daily_count",
            FeatureName::BalanceRatio => "balance_ratio"
        }
    }
}

impl Display for FeatureName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
