mod errors;
mod feature_builder;
mod flagger;
mod risk_scorer;
mod validator;

use tracing::info;

use crate::config::PipelineConfig;
use crate::models::{FeatureTable, Flag, RawRecord, ScoreTable};
use crate::report::{assemble, Report};

pub use errors::{PipelineError, RejectReason, RejectedRow, Stage};
pub use feature_builder::build_features;
pub use flagger::flag_transactions;
pub use risk_scorer::score_customers;
pub use validator::{validate, Validation};

/// Everything one run produced, built from a single immutable batch.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub validation: Validation,
    pub features: FeatureTable,
    pub scores: ScoreTable,
    pub flags: Vec<Flag>,
    pub report: Report
}

/// Runs all five stages over one batch in order.
///
/// The configuration is validated before any stage executes. Rejected rows are recovered and
/// reported in `RunOutput::validation`; an empty batch or a broken configuration aborts the run
/// with a single error and no partial output.
pub fn run(records: &[RawRecord], config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    config.validate()?;

    let validation = validate(records, config.balance_tolerance);
    let features = build_features(&validation.clean)?;
    let scores = score_customers(&features, config)?;
    let flags = flag_transactions(&validation.clean, &scores, &config.thresholds);
    let report = assemble(&features, &scores, &flags, config.thresholds.score_cutoff);

    info!("Pipeline run complete for {} raw rows", records.len());

    Ok(RunOutput { validation, features, scores, flags, report })
}
