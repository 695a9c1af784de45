use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::models::{Factor, FeatureTable, Flag, ReasonCode, RiskBand, ScoreTable};
use crate::types::{CustomerId, TransactionId};

/// The summary views handed to whatever renders or exports a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Highest score first, unscored customers last.
    pub customers: Vec<CustomerRiskRow>,
    /// Suspicious transactions only, in input order.
    pub flagged: Vec<FlaggedTransactionRow>,
    pub risk_summary: RiskSummary,
    pub flag_summary: FlagSummary
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRiskRow {
    pub customer_id: CustomerId,
    /// `None` is the explicit "unscored" marker.
    pub score: Option<CustomerScore>,
    /// `None` when the customer has a score but no feature vector.
    pub transaction_count: Option<usize>,
    pub flag_status: FlagStatus
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerScore {
    pub score: f64,
    pub band: RiskBand,
    pub composite_z: f64,
    pub is_anomaly: bool,
    pub factors: Vec<Factor>
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlagStatus {
    /// Number of suspicious transactions for which this customer's score was consulted.
    Flagged(usize),
    Unflagged
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedTransactionRow {
    pub transaction_id: TransactionId,
    pub customer_id: Option<CustomerId>,
    pub reasons: Vec<ReasonCode>,
    /// `None` is the explicit "unscored" marker.
    pub score: Option<f64>,
    pub band: Option<RiskBand>
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagSummary {
    pub total_transactions: usize,
    pub flagged_transactions: usize,
    pub flagged_percentage: f64,
    pub score_cutoff: f64,
    pub flagged_by_band: BTreeMap<RiskBand, usize>,
    pub flagged_unscored: usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSummary {
    pub total_customers: usize,
    pub anomalies: usize,
    pub bands: Vec<BandShare>
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandShare {
    pub band: RiskBand,
    pub count: usize,
    pub percent: f64
}

/// Joins features, scores and flags by key. A key missing on one side still yields a row, carrying
/// an explicit marker instead of being dropped.
pub fn assemble(features: &FeatureTable, scores: &ScoreTable, flags: &[Flag], score_cutoff: f64) -> Report {
    let mut flagged_per_customer: BTreeMap<&CustomerId, usize> = BTreeMap::new();

    for flag in flags.iter().filter(|flag| flag.is_suspicious) {
        if let Some(customer_id) = &flag.customer_id {
            *flagged_per_customer.entry(customer_id).or_default() += 1;
        }
    }

    let customer_ids: BTreeSet<&CustomerId> = features.keys()
        .chain(scores.keys())
        .chain(flagged_per_customer.keys().copied())
        .collect();

    let mut customers: Vec<CustomerRiskRow> = customer_ids.into_iter()
        .map(|customer_id| CustomerRiskRow {
            customer_id: customer_id.clone(),
            score: scores.get(customer_id).map(|risk_score| CustomerScore {
                score: risk_score.score,
                band: risk_score.band,
                composite_z: risk_score.composite_z,
                is_anomaly: risk_score.is_anomaly,
                factors: risk_score.factors.clone()
            }),
            transaction_count: features.get(customer_id).map(|vector| vector.transaction_count),
            flag_status: flagged_per_customer.get(customer_id)
                .map_or(FlagStatus::Unflagged, |count| FlagStatus::Flagged(*count))
        })
        .collect();

    customers.sort_by(compare_customers);

    let flagged: Vec<FlaggedTransactionRow> = flags.iter()
        .filter(|flag| flag.is_suspicious)
        .map(|flag| FlaggedTransactionRow {
            transaction_id: flag.transaction_id,
            customer_id: flag.customer_id.clone(),
            reasons: flag.reason_codes.iter().copied().collect(),
            score: flag.customer_score,
            band: flag.customer_score.map(RiskBand::from_score)
        })
        .collect();

    let flag_summary = summarize_flags(flags.len(), &flagged, score_cutoff);
    let risk_summary = summarize_risk(scores);

    info!(
        "Assembled report: {} customer rows, {} flagged transactions",
        customers.len(),
        flagged.len()
    );

    Report { customers, flagged, risk_summary, flag_summary }
}

fn compare_customers(left: &CustomerRiskRow, right: &CustomerRiskRow) -> Ordering {
    let by_score = match (&left.score, &right.score) {
        (Some(left_score), Some(right_score)) => right_score.score.total_cmp(&left_score.score),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal
    };

    by_score.then_with(|| left.customer_id.cmp(&right.customer_id))
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 * 100.0 }
}

fn summarize_flags(total_transactions: usize, flagged: &[FlaggedTransactionRow], score_cutoff: f64) -> FlagSummary {
    let mut flagged_by_band: BTreeMap<RiskBand, usize> = RiskBand::ALL.iter().map(|band| (*band, 0)).collect();
    let mut flagged_unscored = 0;

    for row in flagged {
        match row.band {
            Some(band) => *flagged_by_band.entry(band).or_default() += 1,
            None => flagged_unscored += 1
        }
    }

    FlagSummary {
        total_transactions,
        flagged_transactions: flagged.len(),
        flagged_percentage: percent(flagged.len(), total_transactions),
        score_cutoff,
        flagged_by_band,
        flagged_unscored
    }
}

fn summarize_risk(scores: &ScoreTable) -> RiskSummary {
    let total_customers = scores.len();
    let bands = RiskBand::ALL.iter()
        .map(|band| {
            let count = scores.values().filter(|score| score.band == *band).count();
            BandShare { band: *band, count, percent: percent(count, total_customers) }
        })
        .collect();

    RiskSummary {
        total_customers,
        anomalies: scores.values().filter(|score| score.is_anomaly).count(),
        bands
    }
}
