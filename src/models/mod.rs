mod features;
mod flag;
mod score;
mod transaction;

pub use features::{CustomerFeatureVector, FeatureName, FeatureTable};
pub use flag::{Flag, ReasonCode};
pub use score::{Factor, RiskBand, RiskScore, ScoreTable};
pub use transaction::{CleanTransaction, Consistency, RawRecord, Transaction, TransactionType};
