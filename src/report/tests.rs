use super::{
    assemble, render_text_report, write_customer_csv, write_flagged_csv, write_reports, FlagStatus, Report
};
use crate::models::{
    CustomerFeatureVector, Factor, FeatureName, FeatureTable, Flag, ReasonCode, RiskBand, RiskScore, ScoreTable
};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use anyhow::Result;
use rust_decimal::Decimal;
use tempfile::tempdir;

fn create_vector(customer_id: &str, transaction_count: usize) -> CustomerFeatureVector {
    CustomerFeatureVector {
        customer_id: customer_id.to_string(),
        transaction_count,
        outflow_total: Decimal::ZERO,
        inflow_total: Decimal::ZERO,
        average_amount: Decimal::ZERO,
        max_amount: Decimal::ZERO,
        distinct_counterparties: 0,
        inconsistent_count: 0,
        full_drain_count: 0,
        balance_ratio: Decimal::ZERO,
        peak_daily_count: 0,
        first_seen: 0,
        last_seen: 0,
        time_span: 0
    }
}

fn create_score(customer_id: &str, score: f64, is_anomaly: bool) -> RiskScore {
    RiskScore {
        customer_id: customer_id.to_string(),
        score,
        factors: vec![
            Factor { feature: FeatureName::MaxAmount, weight: 1.5, contribution: score * 0.75 },
            Factor { feature: FeatureName::Velocity, weight: 0.5, contribution: score * 0.25 },
        ],
        composite_z: if is_anomaly { 2.5 } else { 0.5 },
        band: RiskBand::from_score(score),
        is_anomaly
    }
}

fn create_flag(transaction_id: u64, customer_id: &str, customer_score: Option<f64>, reasons: &[ReasonCode]) -> Flag {
    Flag {
        transaction_id,
        is_suspicious: !reasons.is_empty(),
        reason_codes: reasons.iter().copied().collect(),
        customer_id: Some(customer_id.to_string()),
        customer_score
    }
}

/// Customer `A` is fully joined, `B` has features but no score, `C` a score but no features.
fn create_report() -> Report {
    let features: FeatureTable = BTreeMap::from([
        ("A".to_string(), create_vector("A", 3)),
        ("B".to_string(), create_vector("B", 1)),
    ]);

    let scores: ScoreTable = BTreeMap::from([
        ("A".to_string(), create_score("A", 80.0, true)),
        ("C".to_string(), create_score("C", 40.0, false)),
    ]);

    let flags = vec![
        create_flag(1, "A", Some(80.0), &[ReasonCode::HighRiskScore, ReasonCode::AmountAboveCutoff]),
        create_flag(2, "A", Some(80.0), &[ReasonCode::HighRiskScore]),
        create_flag(3, "B", None, &[ReasonCode::BalanceInconsistent]),
        create_flag(4, "C", Some(40.0), &[]),
    ];

    assemble(&features, &scores, &flags, 50.0)
}

#[test]
fn test_missing_join_keys_produce_marked_rows() {
    let report = create_report();
    let ids: Vec<&str> = report.customers.iter().map(|row| row.customer_id.as_str()).collect();

    assert_eq!(ids, vec!["A", "C", "B"]);

    let a = &report.customers[0];
    assert_eq!(a.transaction_count, Some(3));
    assert_eq!(a.flag_status, FlagStatus::Flagged(2));
    assert_eq!(a.score.as_ref().map(|score| score.band), Some(RiskBand::Critical));

    let c = &report.customers[1];
    assert_eq!(c.transaction_count, None);
    assert_eq!(c.flag_status, FlagStatus::Unflagged);

    let b = &report.customers[2];
    assert!(b.score.is_none());
    assert_eq!(b.transaction_count, Some(1));
    assert_eq!(b.flag_status, FlagStatus::Flagged(1));
}

#[test]
fn test_flagged_list_keeps_only_suspicious_transactions_in_order() {
    let report = create_report();
    let ids: Vec<u64> = report.flagged.iter().map(|row| row.transaction_id).collect();

    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(report.flagged[0].reasons, vec![ReasonCode::HighRiskScore, ReasonCode::AmountAboveCutoff]);
    assert_eq!(report.flagged[2].score, None);
    assert_eq!(report.flagged[2].band, None);
}

#[test]
fn test_summaries_count_bands_and_anomalies() {
    let report = create_report();
    let flags = &report.flag_summary;
    let risk = &report.risk_summary;

    assert_eq!(flags.total_transactions, 4);
    assert_eq!(flags.flagged_transactions, 3);
    assert_eq!(flags.flagged_percentage, 75.0);
    assert_eq!(flags.flagged_by_band.get(&RiskBand::Critical), Some(&2));
    assert_eq!(flags.flagged_by_band.get(&RiskBand::Low), Some(&0));
    assert_eq!(flags.flagged_unscored, 1);

    assert_eq!(risk.total_customers, 2);
    assert_eq!(risk.anomalies, 1);
    assert_eq!(risk.bands.len(), 4);
    assert_eq!(risk.bands[1].band, RiskBand::Medium);
    assert_eq!(risk.bands[1].count, 1);
    assert_eq!(risk.bands[1].percent, 50.0);
}

#[test]
fn test_empty_inputs_assemble_an_empty_report() {
    let report = assemble(&FeatureTable::new(), &ScoreTable::new(), &[], 50.0);

    assert!(report.customers.is_empty());
    assert!(report.flagged.is_empty());
    assert_eq!(report.flag_summary.flagged_percentage, 0.0);
    assert!(report.risk_summary.bands.iter().all(|share| share.count == 0 && share.percent == 0.0));
}

#[test]
fn test_customer_csv_marks_unscored_and_unflagged_rows() -> Result<()> {
    let mut output = Vec::new();
    write_customer_csv(&create_report(), &mut output)?;

    let content = String::from_utf8(output)?;
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "customer_id,score,band,is_anomaly,composite_z,transaction_count,flagged_transactions,factors");
    assert_eq!(lines[1], "A,80,Critical,true,2.5,3,2,max_amount:1.5:60|velocity:0.5:20");
    assert_eq!(lines[2], "C,40,Medium,false,0.5,unknown,unflagged,max_amount:1.5:30|velocity:0.5:10");
    assert_eq!(lines[3], "B,unscored,,,,1,1,");
    assert_eq!(lines.len(), 4);

    Ok(())
}

#[test]
fn test_flagged_csv_lists_reasons_and_scores() -> Result<()> {
    let mut output = Vec::new();
    write_flagged_csv(&create_report(), &mut output)?;

    let content = String::from_utf8(output)?;
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines, vec![
        "transaction_id,customer_id,reasons,score,band",
        "1,A,high_risk_score|amount_above_cutoff,80,Critical",
        "2,A,high_risk_score,80,Critical",
        "3,B,balance_inconsistent,unscored,",
    ]);

    Ok(())
}

#[test]
fn test_text_report_includes_summaries_and_recommendations() {
    let text = render_text_report(&create_report());

    assert!(text.starts_with(&"=".repeat(60)));
    assert!(text.contains("Total Transactions: 4"));
    assert!(text.contains("Flagged Percentage: 75.00%"));
    assert!(text.contains("  - Critical: 2"));
    assert!(text.contains("  - Unscored: 1"));
    assert!(text.contains("  - Medium: 1 (50.00%)"));
    assert!(text.contains("1. URGENT: Review 2 critical risk transactions immediately"));
    assert!(!text.contains("HIGH PRIORITY"));
    assert!(text.contains("3. Review 1 anomaly customers for unusual patterns"));
    assert!(text.contains("END OF REPORT"));
}

#[test]
fn test_write_reports_creates_all_artifacts() -> Result<()> {
    let directory = tempdir()?;
    let output_dir = directory.path().join("outputs");
    let report = create_report();

    let paths = write_reports(&report, &output_dir)?;

    for path in [&paths.customer_csv, &paths.flagged_csv, &paths.text_report] {
        assert!(path.starts_with(&output_dir));
        assert!(path.exists());
    }

    assert_eq!(fs::read_to_string(&paths.text_report)?, render_text_report(&report));

    let rows: BTreeSet<String> = fs::read_to_string(&paths.flagged_csv)?.lines().skip(1).map(str::to_string).collect();
    assert_eq!(rows.len(), 3);

    Ok(())
}
