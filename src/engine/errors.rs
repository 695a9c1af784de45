use std::path::PathBuf;

use thiserror::Error;

use crate::engine::WorkflowState;
use crate::pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Error opening CSV at path: {path} | {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error
    },
    #[error("CSV ingestion failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV header is missing required column [{0}]")]
    MissingColumn(&'static str),
    #[error("CSV reader task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError)
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Cannot move to [{requested:?}] while the workflow is [{current:?}]")]
    OutOfOrder {
        requested: WorkflowState,
        current: WorkflowState
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError)
}
