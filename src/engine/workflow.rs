use std::sync::Arc;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::engine::errors::WorkflowError;
use crate::models::{FeatureTable, Flag, RawRecord, ScoreTable};
use crate::pipeline::{
    build_features, flag_transactions, score_customers, validate, PipelineError, Validation
};
use crate::report::{assemble, Report};

/// How far the current batch has travelled through the pipeline.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum WorkflowState {
    Idle,
    Loaded,
    Cleaned,
    FeaturesBuilt,
    Scored,
    Flagged,
    Reported
}

/// Sequences the pipeline stages for one loaded batch.
///
/// Each stage may only run once the stage before it has completed for the current batch. Running
/// a stage again, or loading a new batch, discards every downstream output. Outputs are handed out
/// as `Arc` snapshots: a caller that keeps one holds an immutable view of that run which later runs
/// replace but never modify.
#[derive(Debug)]
pub struct Workflow {
    config: Arc<PipelineConfig>,
    state: WorkflowState,
    records: Option<Arc<Vec<RawRecord>>>,
    validation: Option<Arc<Validation>>,
    features: Option<Arc<FeatureTable>>,
    scores: Option<Arc<ScoreTable>>,
    flags: Option<Arc<Vec<Flag>>>,
    report: Option<Arc<Report>>
}

impl Workflow {
    /// Creates an idle workflow. The configuration is validated here, before any stage can run.
    pub fn new(config: PipelineConfig) -> Result<Self, WorkflowError> {
        config.validate().map_err(PipelineError::from)?;

        Ok(Self {
            config: Arc::new(config),
            state: WorkflowState::Idle,
            records: None,
            validation: None,
            features: None,
            scores: None,
            flags: None,
            report: None
        })
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn validation(&self) -> Option<Arc<Validation>> {
        self.validation.clone()
    }

    pub fn features(&self) -> Option<Arc<FeatureTable>> {
        self.features.clone()
    }

    pub fn scores(&self) -> Option<Arc<ScoreTable>> {
        self.scores.clone()
    }

    pub fn flags(&self) -> Option<Arc<Vec<Flag>>> {
        self.flags.clone()
    }

    pub fn report(&self) -> Option<Arc<Report>> {
        self.report.clone()
    }

    /// Replaces the current batch. Every output derived from a previous batch is discarded.
    pub fn load(&mut self, records: Vec<RawRecord>) {
        self.rewind(WorkflowState::Idle);
        self.records = Some(Arc::new(records));
        self.advance(WorkflowState::Loaded);
    }

    pub fn clean(&mut self) -> Result<Arc<Validation>, WorkflowError> {
        let records = self.require(WorkflowState::Cleaned, WorkflowState::Loaded, self.records.clone())?;
        let validation = Arc::new(validate(&records, self.config.balance_tolerance));

        self.validation = Some(validation.clone());
        self.advance(WorkflowState::Cleaned);

        Ok(validation)
    }

    pub fn build_features(&mut self) -> Result<Arc<FeatureTable>, WorkflowError> {
        let validation = self.require(WorkflowState::FeaturesBuilt, WorkflowState::Cleaned, self.validation.clone())?;
        let features = Arc::new(build_features(&validation.clean)?);

        self.features = Some(features.clone());
        self.advance(WorkflowState::FeaturesBuilt);

        Ok(features)
    }

    pub fn score(&mut self) -> Result<Arc<ScoreTable>, WorkflowError> {
        let features = self.require(WorkflowState::Scored, WorkflowState::FeaturesBuilt, self.features.clone())?;
        let scores = Arc::new(score_customers(&features, &self.config)?);

        self.scores = Some(scores.clone());
        self.advance(WorkflowState::Scored);

        Ok(scores)
    }

    pub fn flag(&mut self) -> Result<Arc<Vec<Flag>>, WorkflowError> {
        let scores = self.require(WorkflowState::Flagged, WorkflowState::Scored, self.scores.clone())?;
        let validation = self.validation.clone().ok_or(self.out_of_order(WorkflowState::Flagged))?;
        let flags = Arc::new(flag_transactions(&validation.clean, &scores, &self.config.thresholds));

        self.flags = Some(flags.clone());
        self.advance(WorkflowState::Flagged);

        Ok(flags)
    }

    pub fn assemble_report(&mut self) -> Result<Arc<Report>, WorkflowError> {
        let flags = self.require(WorkflowState::Reported, WorkflowState::Flagged, self.flags.clone())?;
        let features = self.features.clone().ok_or(self.out_of_order(WorkflowState::Reported))?;
        let scores = self.scores.clone().ok_or(self.out_of_order(WorkflowState::Reported))?;
        let report = Arc::new(assemble(&features, &scores, &flags, self.config.thresholds.score_cutoff));

        self.report = Some(report.clone());
        self.advance(WorkflowState::Reported);

        Ok(report)
    }

    /// Runs every remaining stage for the loaded batch, from cleaning through the report.
    pub fn run_all(&mut self) -> Result<Arc<Report>, WorkflowError> {
        self.clean()?;
        self.build_features()?;
        self.score()?;
        self.flag()?;
        self.assemble_report()
    }

    /// Checks that `prerequisite` has been reached, then drops everything downstream of it so a
    /// failing stage leaves no partial output behind.
    fn require<T>(&mut self, requested: WorkflowState, prerequisite: WorkflowState, input: Option<Arc<T>>) -> Result<Arc<T>, WorkflowError> {
        if self.state < prerequisite {
            return Err(self.out_of_order(requested));
        }

        let input = input.ok_or(self.out_of_order(requested))?;
        self.rewind(prerequisite);

        Ok(input)
    }

    fn out_of_order(&self, requested: WorkflowState) -> WorkflowError {
        WorkflowError::OutOfOrder { requested, current: self.state }
    }

    fn rewind(&mut self, state: WorkflowState) {
        if state < WorkflowState::Reported {
            self.report = None;
        }
        if state < WorkflowState::Flagged {
            self.flags = None;
        }
        if state < WorkflowState::Scored {
            self.scores = None;
        }
        if state < WorkflowState::FeaturesBuilt {
            self.features = None;
        }
        if state < WorkflowState::Cleaned {
            self.validation = None;
        }
        if state < WorkflowState::Loaded {
            self.records = None;
        }

        if self.state > state {
            debug!("Workflow rewound from [{:?}] to [{:?}]", self.state, state);
        }

        self.state = state;
    }

    fn advance(&mut self, state: WorkflowState) {
        info!("Workflow reached [{state:?}]");
        self.state = state;
    }
}
