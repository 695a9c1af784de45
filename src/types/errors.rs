use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonetaryError {
    #[error("Monetary error: Value is an empty string")]
    Empty,
    #[error("Monetary error: Value [{0}] is not numeric")]
    InvalidFormat(String)
}
