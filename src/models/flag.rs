use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use crate::types::{CustomerId, TransactionId};

/// Why a transaction was marked suspicious. A flag carries every rule that fired.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ReasonCode {
    HighRiskScore,
    AmountAboveCutoff,
    BalanceInconsistent
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::HighRiskScore => "high_risk_score",
            ReasonCode::AmountAboveCutoff => "amount_above_cutoff",
            ReasonCode::BalanceInconsistent => "balance_inconsistent"
        }
    }
}

impl Display for ReasonCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    pub transaction_id: TransactionId,
    pub is_suspicious: bool,
    pub reason_codes: BTreeSet<ReasonCode>,
    /// The party whose score was consulted, if the transaction named one.
    pub customer_id: Option<CustomerId>,
    /// `None` when the consulted party has no score in this run.
    pub customer_score: Option<f64>
}
