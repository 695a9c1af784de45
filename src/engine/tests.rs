use super::{load_records, read_records, LoadError, Workflow, WorkflowError, WorkflowState};
use crate::config::PipelineConfig;
use crate::models::RawRecord;
use crate::pipeline::{PipelineError, Stage};

use std::io::Write;

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;

const DATASET_CSV: &str = "\
step,type,amount,nameOrig,oldbalanceOrg,newbalanceOrig,nameDest,oldbalanceDest,newbalanceDest,isFraud,isFlaggedFraud
1,PAYMENT,9839.64,C1231006815,170136.0,160296.36,M1979787155,0.0,0.0,0,0
1,TRANSFER,181.0,C1305486145,181.0,0.0,C553264065,0.0,0.0,1,0
1,CASH_OUT,181.0,C840083671,181.0,0.0,C38997010,21182.0,0.0,1,0
";

fn create_records(rows: &[(&str, &str, &str, &str)]) -> Vec<RawRecord> {
    rows.iter()
        .map(|(sender, receiver, amount, step)| RawRecord {
            timestamp: Some(step.to_string()),
            transaction_type: Some("transfer".to_string()),
            amount: Some(amount.to_string()),
            sender_id: Some(sender.to_string()),
            receiver_id: Some(receiver.to_string()),
            ..RawRecord::default()
        })
        .collect()
}

#[test]
fn test_reader_maps_dataset_column_aliases() -> Result<()> {
    let records = read_records(DATASET_CSV.as_bytes())?;

    assert_eq!(records.len(), 3);

    let first = &records[0];
    assert_eq!(first.timestamp.as_deref(), Some("1"));
    assert_eq!(first.transaction_type.as_deref(), Some("PAYMENT"));
    assert_eq!(first.sender_id.as_deref(), Some("C1231006815"));
    assert_eq!(first.sender_balance_after.as_deref(), Some("160296.36"));
    assert_eq!(first.receiver_id.as_deref(), Some("M1979787155"));
    assert_eq!(first.receiver_balance_before.as_deref(), Some("0.0"));
    assert!(first.id.is_none());
    assert!(first.defect.is_none());

    Ok(())
}

#[test]
fn test_reader_keeps_blank_id_cells_apart_from_a_missing_id_column() -> Result<()> {
    let input = "id,timestamp,type,amount,sender_id,receiver_id\n,1,transfer,10,A,B\n7,1,transfer,10,C,D\n";
    let records = read_records(input.as_bytes())?;

    assert_eq!(records[0].id.as_deref(), Some(""));
    assert_eq!(records[1].id.as_deref(), Some("7"));

    Ok(())
}

#[test]
fn test_reader_keeps_short_rows_and_marks_undecodable_ones() -> Result<()> {
    let input: &[u8] = b"id,timestamp,type,amount,sender_id,receiver_id\n1,1,transfer,10,A,B\n2,1,transfer,\xff,A,B\n3,2,payment\n";
    let records = read_records(input)?;

    assert_eq!(records.len(), 3);
    assert!(records[0].defect.is_none());
    assert!(records[1].defect.is_some());
    assert_eq!(records[2].transaction_type.as_deref(), Some("payment"));
    assert!(records[2].amount.is_none());

    Ok(())
}

#[test]
fn test_reader_rejects_headers_without_required_columns() {
    let result = read_records("timestamp,type,nameOrig,nameDest\n1,TRANSFER,A,B\n".as_bytes());
    assert!(matches!(result, Err(LoadError::MissingColumn("amount"))));

    let result = read_records("step,type,amount\n1,TRANSFER,10\n".as_bytes());
    assert!(matches!(result, Err(LoadError::MissingColumn("sender_id"))));
}

#[tokio::test]
async fn test_loader_reads_file_on_blocking_task() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(DATASET_CSV.as_bytes())?;

    let records = load_records(file.path()).await?;

    assert_eq!(records.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_loader_reports_missing_file() {
    let result = load_records("missing.csv").await;

    assert!(matches!(result, Err(LoadError::Open { .. })));
}

#[test]
fn test_workflow_rejects_invalid_configuration_up_front() {
    let mut config = PipelineConfig::default();
    config.z_saturation = -1.0;

    let result = Workflow::new(config);

    assert!(matches!(result, Err(WorkflowError::Pipeline(PipelineError::ConfigurationInvalid(_)))));
}

#[test]
fn test_workflow_guards_stage_order() -> Result<()> {
    let mut workflow = Workflow::new(PipelineConfig::default())?;

    assert!(matches!(
        workflow.clean(),
        Err(WorkflowError::OutOfOrder { requested: WorkflowState::Cleaned, current: WorkflowState::Idle })
    ));

    workflow.load(create_records(&[("A", "B", "10", "1")]));

    assert!(matches!(
        workflow.score(),
        Err(WorkflowError::OutOfOrder { requested: WorkflowState::Scored, current: WorkflowState::Loaded })
    ));
    assert_eq!(workflow.state(), WorkflowState::Loaded);

    workflow.clean()?;
    workflow.build_features()?;

    assert!(matches!(workflow.assemble_report(), Err(WorkflowError::OutOfOrder { .. })));
    assert_eq!(workflow.state(), WorkflowState::FeaturesBuilt);

    Ok(())
}

#[test]
fn test_workflow_runs_every_stage_in_order() -> Result<()> {
    let mut workflow = Workflow::new(PipelineConfig::default())?;
    workflow.load(create_records(&[("A", "B", "10", "1"), ("B", "C", "25", "2"), ("C", "A", "-3", "3")]));

    let report = workflow.run_all()?;

    assert_eq!(workflow.state(), WorkflowState::Reported);
    assert_eq!(report.customers.len(), 3);
    assert_eq!(workflow.validation().map(|validation| validation.rejected.len()), Some(1));
    assert_eq!(workflow.flags().map(|flags| flags.len()), Some(2));

    Ok(())
}

#[test]
fn test_rerunning_a_stage_discards_downstream_outputs() -> Result<()> {
    let mut workflow = Workflow::new(PipelineConfig::default())?;
    workflow.load(create_records(&[("A", "B", "10", "1"), ("B", "C", "25", "2")]));
    workflow.run_all()?;

    workflow.clean()?;

    assert_eq!(workflow.state(), WorkflowState::Cleaned);
    assert!(workflow.features().is_none());
    assert!(workflow.scores().is_none());
    assert!(workflow.flags().is_none());
    assert!(workflow.report().is_none());
    assert!(workflow.validation().is_some());

    Ok(())
}

#[test]
fn test_new_batch_replaces_previous_snapshot_without_mutating_it() -> Result<()> {
    let mut workflow = Workflow::new(PipelineConfig::default())?;
    workflow.load(create_records(&[("A", "B", "10", "1"), ("B", "C", "25", "2")]));

    let first_report = workflow.run_all()?;
    let first_copy = (*first_report).clone();

    workflow.load(create_records(&[("X", "Y", "99", "1")]));

    assert_eq!(workflow.state(), WorkflowState::Loaded);
    assert!(workflow.report().is_none());

    let second_report = workflow.run_all()?;

    assert_eq!(*first_report, first_copy);
    assert_ne!(*first_report, *second_report);
    assert!(second_report.customers.iter().all(|row| row.customer_id == "X" || row.customer_id == "Y"));

    Ok(())
}

#[test]
fn test_failing_stage_leaves_last_completed_state() -> Result<()> {
    let mut workflow = Workflow::new(PipelineConfig::default())?;
    workflow.load(create_records(&[("A", "B", "not a number", "1")]));

    let validation = workflow.clean()?;

    assert!(validation.clean.is_empty());

    let result = workflow.build_features();

    assert!(matches!(result, Err(WorkflowError::Pipeline(PipelineError::EmptyBatch { stage: Stage::FeatureBuilder }))));
    assert_eq!(workflow.state(), WorkflowState::Cleaned);
    assert!(workflow.features().is_none());

    let rejected = workflow.validation().ok_or_else(|| anyhow!("Validation snapshot missing"))?;
    assert_eq!(rejected.rejected.len(), 1);

    Ok(())
}
