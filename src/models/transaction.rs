use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::types::{CustomerId, Timestamp, TransactionId};

/// Represents a single row from the input CSV file, before validation.
///
/// Every column is kept as an optional string so that a malformed value becomes a rejection
/// diagnostic instead of a reader error. The aliases accept the column names used by the
/// mobile-money simulation dataset the pipeline was first run against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    /// `None` when the input has no `id` column. A blank cell in an `id` column is `Some("")`.
    #[serde(default, deserialize_with = "present_cell")]
    pub id: Option<String>,
    #[serde(alias = "step")]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub amount: Option<String>,
    #[serde(alias = "nameOrig")]
    pub sender_id: Option<String>,
    #[serde(alias = "oldbalanceOrg")]
    pub sender_balance_before: Option<String>,
    #[serde(alias = "newbalanceOrig")]
    pub sender_balance_after: Option<String>,
    #[serde(alias = "nameDest")]
    pub receiver_id: Option<String>,
    #[serde(alias = "oldbalanceDest")]
    pub receiver_balance_before: Option<String>,
    #[serde(alias = "newbalanceDest")]
    pub receiver_balance_after: Option<String>,
    /// Set by the loader when the CSV reader could not decode the row at all.
    #[serde(skip)]
    pub defect: Option<String>
}

fn present_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    String::deserialize(deserializer).map(Some)
}

impl RawRecord {
    pub fn unreadable(defect: impl Into<String>) -> Self {
        Self {
            defect: Some(defect.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum TransactionType {
    Transfer,
    CashIn,
    CashOut,
    Payment,
    Debit
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::CashIn => "cash-in",
            TransactionType::CashOut => "cash-out",
            TransactionType::Payment => "payment",
            TransactionType::Debit => "debit"
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', ' '], "_");

        match normalized.as_str() {
            "TRANSFER" => Ok(TransactionType::Transfer),
            "CASH_IN" | "CASHIN" => Ok(TransactionType::CashIn),
            "CASH_OUT" | "CASHOUT" => Ok(TransactionType::CashOut),
            "PAYMENT" => Ok(TransactionType::Payment),
            "DEBIT" => Ok(TransactionType::Debit),
            _ => Err(value.trim().to_string())
        }
    }
}

/// A fully typed transaction. Only the validator constructs these from raw rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub timestamp: Timestamp,
    pub sender_id: Option<CustomerId>,
    pub receiver_id: Option<CustomerId>,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub sender_balance_before: Option<Decimal>,
    pub sender_balance_after: Option<Decimal>,
    pub receiver_balance_before: Option<Decimal>,
    pub receiver_balance_after: Option<Decimal>
}

impl Transaction {
    /// The customer whose score decides the transaction's score-based flag: the sender, or the
    /// receiver when the row has no sender.
    pub fn scored_party(&self) -> Option<&CustomerId> {
        self.sender_id.as_ref().or(self.receiver_id.as_ref())
    }

    /// A sender that went from a positive balance to exactly zero.
    pub fn drains_sender(&self) -> bool {
        matches!(
            (self.sender_balance_before, self.sender_balance_after),
            (Some(before), Some(after)) if before > Decimal::ZERO && after.is_zero()
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Consistency {
    Consistent,
    Inconsistent,
    /// Neither side carried both balances, so nothing could be reconciled.
    Unchecked
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanTransaction {
    pub transaction: Transaction,
    pub consistency: Consistency
}

impl CleanTransaction {
    pub fn id(&self) -> TransactionId {
        self.transaction.id
    }

    pub fn is_inconsistent(&self) -> bool {
        self.consistency == Consistency::Inconsistent
    }
}
