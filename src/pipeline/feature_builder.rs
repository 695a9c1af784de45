use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::models::{CleanTransaction, CustomerFeatureVector, FeatureTable, Transaction};
use crate::pipeline::errors::{PipelineError, Stage};
use crate::types::{CustomerId, Timestamp, STEPS_PER_DAY};

/// Running totals for one customer. Every update is commutative so the finished vector does not
/// depend on the order transactions arrive in.
#[derive(Debug, Default)]
struct Accumulator {
    transaction_count: usize,
    outflow_total: Decimal,
    inflow_total: Decimal,
    amount_total: Decimal,
    max_amount: Decimal,
    counterparties: BTreeSet<CustomerId>,
    inconsistent_count: usize,
    full_drain_count: usize,
    sent_count: usize,
    balance_ratio_total: Decimal,
    daily_counts: BTreeMap<Timestamp, usize>,
    first_seen: Option<Timestamp>,
    last_seen: Option<Timestamp>
}

impl Accumulator {
    fn record(&mut self, customer_id: &CustomerId, clean: &CleanTransaction, counterparty: Option<&CustomerId>) {
        let transaction = &clean.transaction;

        self.transaction_count += 1;
        self.amount_total = add_or_cap(self.amount_total, transaction.amount, customer_id, "amount total");
        self.max_amount = self.max_amount.max(transaction.amount);

        if let Some(counterparty) = counterparty.filter(|counterparty| *counterparty != customer_id) {
            self.counterparties.insert(counterparty.clone());
        }

        if clean.is_inconsistent() {
            self.inconsistent_count += 1;
        }

        *self.daily_counts.entry(transaction.timestamp / STEPS_PER_DAY).or_default() += 1;

        self.first_seen = Some(self.first_seen.map_or(transaction.timestamp, |seen| seen.min(transaction.timestamp)));
        self.last_seen = Some(self.last_seen.map_or(transaction.timestamp, |seen| seen.max(transaction.timestamp)));
    }

    fn record_outflow(&mut self, customer_id: &CustomerId, transaction: &Transaction) {
        self.outflow_total = add_or_cap(self.outflow_total, transaction.amount, customer_id, "outflow total");
        self.sent_count += 1;

        if transaction.drains_sender() {
            self.full_drain_count += 1;
        }

        let ratio = match transaction.sender_balance_before {
            Some(before) if before > Decimal::ZERO => transaction.amount.checked_div(before).unwrap_or_else(|| {
                warn!("Balance ratio of transaction [{}] overflows, capped at {}", transaction.id, Decimal::MAX);
                Decimal::MAX
            }),
            _ => Decimal::ZERO
        };

        self.balance_ratio_total = add_or_cap(self.balance_ratio_total, ratio, customer_id, "balance ratio total");
    }

    fn record_inflow(&mut self, customer_id: &CustomerId, transaction: &Transaction) {
        self.inflow_total = add_or_cap(self.inflow_total, transaction.amount, customer_id, "inflow total");
    }

    fn finish(self, customer_id: CustomerId) -> CustomerFeatureVector {
        let first_seen = self.first_seen.unwrap_or_default();
        let last_seen = self.last_seen.unwrap_or(first_seen);
        let average_amount = if self.transaction_count == 0 {
            Decimal::ZERO
        } else {
            self.amount_total / Decimal::from(self.transaction_count)
        };
        let balance_ratio = if self.sent_count == 0 {
            Decimal::ZERO
        } else {
            self.balance_ratio_total / Decimal::from(self.sent_count)
        };

        CustomerFeatureVector {
            customer_id,
            transaction_count: self.transaction_count,
            outflow_total: self.outflow_total,
            inflow_total: self.inflow_total,
            average_amount,
            max_amount: self.max_amount,
            distinct_counterparties: self.counterparties.len(),
            inconsistent_count: self.inconsistent_count,
            full_drain_count: self.full_drain_count,
            balance_ratio,
            peak_daily_count: self.daily_counts.values().copied().max().unwrap_or_default(),
            first_seen,
            last_seen,
            time_span: last_seen - first_seen
        }
    }
}

/// Totals past `Decimal::MAX` are capped there with a warning rather than failing the batch.
fn add_or_cap(total: Decimal, amount: Decimal, customer_id: &CustomerId, total_name: &str) -> Decimal {
    total.checked_add(amount).unwrap_or_else(|| {
        warn!("Customer [{customer_id}] {total_name} overflows, capped at {}", Decimal::MAX);
        Decimal::MAX
    })
}

/// Aggregates a clean batch into one feature vector per customer that appears as a sender or a
/// receiver.
///
/// A transaction adds outflow to its sender and inflow to its receiver. A self-transfer counts
/// once towards the customer's transaction count.
///
/// # Errors
/// Returns `PipelineError::EmptyBatch` when the batch names no customer at all.
pub fn build_features(clean: &[CleanTransaction]) -> Result<FeatureTable, PipelineError> {
    let mut accumulators: BTreeMap<CustomerId, Accumulator> = BTreeMap::new();

    for clean_transaction in clean {
        let transaction = &clean_transaction.transaction;

        if let Some(sender_id) = &transaction.sender_id {
            let accumulator = accumulators.entry(sender_id.clone()).or_default();
            accumulator.record(sender_id, clean_transaction, transaction.receiver_id.as_ref());
            accumulator.record_outflow(sender_id, transaction);
        }

        if let Some(receiver_id) = &transaction.receiver_id {
            let accumulator = accumulators.entry(receiver_id.clone()).or_default();

            if transaction.sender_id.as_ref() != Some(receiver_id) {
                accumulator.record(receiver_id, clean_transaction, transaction.sender_id.as_ref());
            }

            accumulator.record_inflow(receiver_id, transaction);
        }
    }

    if accumulators.is_empty() {
        return Err(PipelineError::EmptyBatch { stage: Stage::FeatureBuilder });
    }

    let features: FeatureTable = accumulators.into_iter()
        .map(|(customer_id, accumulator)| (customer_id.clone(), accumulator.finish(customer_id)))
        .collect();

    info!("Built features for {} customers from {} transactions", features.len(), clean.len());

    Ok(features)
}
