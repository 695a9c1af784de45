use std::collections::BTreeSet;

use tracing::info;

use crate::config::FlagThresholds;
use crate::models::{CleanTransaction, Flag, ReasonCode, ScoreTable};

/// Produces exactly one flag per transaction, in input order.
///
/// Rules are independent and every rule that fires is recorded. A transaction whose party has no
/// score can still be flagged by amount or by balance inconsistency, never by score.
pub fn flag_transactions(clean: &[CleanTransaction], scores: &ScoreTable, thresholds: &FlagThresholds) -> Vec<Flag> {
    let flags: Vec<Flag> = clean.iter()
        .map(|clean_transaction| {
            let transaction = &clean_transaction.transaction;
            let customer_id = transaction.scored_party().cloned();
            let customer_score = customer_id.as_ref()
                .and_then(|customer_id| scores.get(customer_id))
                .map(|risk_score| risk_score.score);

            let mut reason_codes = BTreeSet::new();

            if customer_score.is_some_and(|score| score >= thresholds.score_cutoff) {
                reason_codes.insert(ReasonCode::HighRiskScore);
            }

            if thresholds.amount_cutoff.is_some_and(|cutoff| transaction.amount > cutoff) {
                reason_codes.insert(ReasonCode::AmountAboveCutoff);
            }

            if thresholds.flag_inconsistent_balances && clean_transaction.is_inconsistent() {
                reason_codes.insert(ReasonCode::BalanceInconsistent);
            }

            Flag {
                transaction_id: transaction.id,
                is_suspicious: !reason_codes.is_empty(),
                reason_codes,
                customer_id,
                customer_score
            }
        })
        .collect();

    let flagged = flags.iter().filter(|flag| flag.is_suspicious).count();
    let percentage = if flags.is_empty() { 0.0 } else { flagged as f64 / flags.len() as f64 * 100.0 };

    info!("Flagged {} of {} transactions ({:.1}%)", flagged, flags.len(), percentage);

    flags
}
