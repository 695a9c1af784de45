use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not write [{path}]: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error
    },
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error)
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
