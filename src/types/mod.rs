mod errors;
mod monetary;

pub use errors::MonetaryError;
pub use monetary::{parse_monetary, to_f64};

pub type CustomerId = String;
pub type TransactionId = u64;

/// Dataset time step. One step is one hour of simulated activity.
pub type Timestamp = u64;

pub const STEPS_PER_DAY: Timestamp = 24;
