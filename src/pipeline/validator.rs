use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::{CleanTransaction, Consistency, RawRecord, Transaction, TransactionType};
use crate::pipeline::errors::{RejectReason, RejectedRow};
use crate::types::{parse_monetary, CustomerId, Timestamp, TransactionId};

/// Output of the validator: accepted rows in input order plus one diagnostic per rejected row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub clean: Vec<CleanTransaction>,
    pub rejected: Vec<RejectedRow>
}

/// Everything a transaction carries except its id. Two id-less rows with equal content are the
/// same transaction read twice.
#[derive(Debug, PartialEq, Eq, Hash)]
struct RowContent {
    timestamp: Timestamp,
    transaction_type: TransactionType,
    amount: Decimal,
    sender_id: Option<CustomerId>,
    receiver_id: Option<CustomerId>,
    balances: [Option<Decimal>; 4]
}

impl From<&Transaction> for RowContent {
    fn from(transaction: &Transaction) -> Self {
        Self {
            timestamp: transaction.timestamp,
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            sender_id: transaction.sender_id.clone(),
            receiver_id: transaction.receiver_id.clone(),
            balances: [
                transaction.sender_balance_before,
                transaction.sender_balance_after,
                transaction.receiver_balance_before,
                transaction.receiver_balance_after
            ]
        }
    }
}

/// Turns raw rows into typed transactions.
///
/// A row with a missing or unparsable required field is rejected whole; nothing is defaulted.
/// A row whose balances do not reconcile within `tolerance` is kept and marked
/// [`Consistency::Inconsistent`].
///
/// When the input has no `id` column each row takes its 1-based row number, and a row repeating
/// an earlier row's content is rejected as [`RejectReason::DuplicateRow`]. With an `id` column a
/// blank id is a missing field and a repeated id is [`RejectReason::DuplicateId`].
pub fn validate(records: &[RawRecord], tolerance: Decimal) -> Validation {
    let mut validation = Validation {
        clean: Vec::with_capacity(records.len()),
        rejected: Vec::new()
    };
    let mut seen_ids = HashSet::with_capacity(records.len());
    let mut seen_rows: HashMap<RowContent, usize> = HashMap::new();

    for (row, record) in records.iter().enumerate() {
        let transaction = match parse_record(row, record) {
            Ok(transaction) => transaction,
            Err(reason) => {
                debug!("Row [{row}] rejected: {reason}");
                validation.rejected.push(RejectedRow::new(row, reason));
                continue;
            }
        };

        if record.id.is_none() {
            match seen_rows.entry(RowContent::from(&transaction)) {
                Entry::Occupied(first) => {
                    validation.rejected.push(RejectedRow::new(row, RejectReason::DuplicateRow { first_row: *first.get() }));
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
        }

        if !seen_ids.insert(transaction.id) {
            validation.rejected.push(RejectedRow::new(row, RejectReason::DuplicateId(transaction.id)));
            continue;
        }

        let consistency = reconcile(&transaction, tolerance);

        if consistency == Consistency::Inconsistent {
            debug!("Transaction [{}] balances do not reconcile with amount [{}]", transaction.id, transaction.amount);
        }

        validation.clean.push(CleanTransaction { transaction, consistency });
    }

    info!(
        "Cleaning complete: {} clean, {} rejected, {} inconsistent",
        validation.clean.len(),
        validation.rejected.len(),
        validation.clean.iter().filter(|clean| clean.is_inconsistent()).count()
    );

    validation
}

fn parse_record(row: usize, record: &RawRecord) -> Result<Transaction, RejectReason> {
    if let Some(defect) = &record.defect {
        return Err(RejectReason::Unreadable(defect.clone()));
    }

    let transaction_type = required(&record.transaction_type, "type")?;
    let transaction_type: TransactionType = transaction_type.parse().map_err(RejectReason::UnknownType)?;

    let amount = parse_monetary(required(&record.amount, "amount")?)
        .map_err(RejectReason::NonNumericAmount)?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(RejectReason::NegativeAmount(amount.to_string()));
    }

    let timestamp = required(&record.timestamp, "timestamp")?;
    let timestamp: Timestamp = timestamp.parse()
        .map_err(|_| RejectReason::MalformedTimestamp(timestamp.to_string()))?;

    let id: TransactionId = match &record.id {
        Some(_) => {
            let id = required(&record.id, "id")?;
            id.parse().map_err(|_| RejectReason::MalformedId(id.to_string()))?
        }
        None => row as TransactionId + 1
    };

    let sender_id = present(&record.sender_id).map(str::to_string);
    let receiver_id = present(&record.receiver_id).map(str::to_string);

    if sender_id.is_none() && receiver_id.is_none() {
        return Err(RejectReason::MissingField("sender_id/receiver_id"));
    }

    Ok(Transaction {
        id,
        timestamp,
        sender_id,
        receiver_id,
        amount,
        transaction_type,
        sender_balance_before: balance(&record.sender_balance_before, "sender_balance_before")?,
        sender_balance_after: balance(&record.sender_balance_after, "sender_balance_after")?,
        receiver_balance_before: balance(&record.receiver_balance_before, "receiver_balance_before")?,
        receiver_balance_after: balance(&record.receiver_balance_after, "receiver_balance_after")?
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RejectReason> {
    present(value).ok_or(RejectReason::MissingField(field))
}

fn balance(value: &Option<String>, field: &'static str) -> Result<Option<Decimal>, RejectReason> {
    present(value)
        .map(|value| parse_monetary(value).map_err(|error| RejectReason::NonNumericBalance { field, error }))
        .transpose()
}

/// Checks each side that carries both balances. Senders are debited and receivers credited,
/// except for cash-in where the originating customer is the one credited.
fn reconcile(transaction: &Transaction, tolerance: Decimal) -> Consistency {
    let amount = transaction.amount;
    let (sender_delta, receiver_delta) = match transaction.transaction_type {
        TransactionType::CashIn => (amount, -amount),
        _ => (-amount, amount)
    };

    let sides = [
        (transaction.sender_balance_before, transaction.sender_balance_after, sender_delta),
        (transaction.receiver_balance_before, transaction.receiver_balance_after, receiver_delta)
    ];

    let mut checked = false;

    for (before, after, delta) in sides {
        let (Some(before), Some(after)) = (before, after) else {
            continue;
        };

        checked = true;

        let within_tolerance = before.checked_add(delta)
            .and_then(|expected| expected.checked_sub(after))
            .is_some_and(|difference| difference.abs() <= tolerance);

        if !within_tolerance {
            return Consistency::Inconsistent;
        }
    }

    if checked { Consistency::Consistent } else { Consistency::Unchecked }
}
