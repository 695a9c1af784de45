use std::fmt::Write as _;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::Writer;
use tracing::info;

use crate::models::RiskBand;
use crate::report::assembler::{CustomerRiskRow, FlagStatus, FlaggedTransactionRow, Report};
use crate::report::errors::ExportError;

pub const CUSTOMER_CSV: &str = "customer_risk_summary.csv";
pub const FLAGGED_CSV: &str = "flagged_transactions.csv";
pub const TEXT_REPORT: &str = "report.txt";

const UNSCORED: &str = "unscored";
const UNFLAGGED: &str = "unflagged";
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub customer_csv: PathBuf,
    pub flagged_csv: PathBuf,
    pub text_report: PathBuf
}

/// Writes the three report artifacts into `output_dir`, creating it when needed. Existing files
/// from a previous run are replaced.
pub fn write_reports(report: &Report, output_dir: &Path) -> Result<ReportPaths, ExportError> {
    create_dir_all(output_dir).map_err(|error| ExportError::io(output_dir, error))?;

    let paths = ReportPaths {
        customer_csv: output_dir.join(CUSTOMER_CSV),
        flagged_csv: output_dir.join(FLAGGED_CSV),
        text_report: output_dir.join(TEXT_REPORT)
    };

    write_customer_csv(report, create_file(&paths.customer_csv)?)?;
    write_flagged_csv(report, create_file(&paths.flagged_csv)?)?;

    let mut text_file = create_file(&paths.text_report)?;
    text_file.write_all(render_text_report(report).as_bytes())
        .and_then(|_| text_file.flush())
        .map_err(|error| ExportError::io(&paths.text_report, error))?;

    info!("Reports saved to '{}'", output_dir.display());

    Ok(paths)
}

fn create_file(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|error| ExportError::io(path, error))
}

/// Factor breakdowns are written as `feature:weight:contribution` entries joined by `|`.
pub fn write_customer_csv<W: Write>(report: &Report, output: W) -> Result<(), ExportError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record([
        "customer_id", "score", "band", "is_anomaly", "composite_z", "transaction_count", "flagged_transactions", "factors"
    ])?;

    for row in &report.customers {
        writer.write_record(customer_record(row))?;
    }

    writer.flush().map_err(|error| ExportError::Csv(error.into()))?;

    Ok(())
}

fn customer_record(row: &CustomerRiskRow) -> [String; 8] {
    let transaction_count = row.transaction_count
        .map_or_else(|| UNKNOWN.to_string(), |count| count.to_string());

    let flagged = match row.flag_status {
        FlagStatus::Flagged(count) => count.to_string(),
        FlagStatus::Unflagged => UNFLAGGED.to_string()
    };

    match &row.score {
        Some(score) => {
            let factors = score.factors.iter()
                .map(|factor| format!("{}:{}:{}", factor.feature, factor.weight, factor.contribution))
                .collect::<Vec<_>>()
                .join("|");

            [
                row.customer_id.clone(),
                score.score.to_string(),
                score.band.to_string(),
                score.is_anomaly.to_string(),
                score.composite_z.to_string(),
                transaction_count,
                flagged,
                factors
            ]
        }
        None => [
            row.customer_id.clone(),
            UNSCORED.to_string(),
            String::new(),
            String::new(),
            String::new(),
            transaction_count,
            flagged,
            String::new()
        ]
    }
}

pub fn write_flagged_csv<W: Write>(report: &Report, output: W) -> Result<(), ExportError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record(["transaction_id", "customer_id", "reasons", "score", "band"])?;

    for row in &report.flagged {
        writer.write_record(flagged_record(row))?;
    }

    writer.flush().map_err(|error| ExportError::Csv(error.into()))?;

    Ok(())
}

fn flagged_record(row: &FlaggedTransactionRow) -> [String; 5] {
    let reasons = row.reasons.iter()
        .map(|reason| reason.as_str())
        .collect::<Vec<_>>()
        .join("|");

    [
        row.transaction_id.to_string(),
        row.customer_id.clone().unwrap_or_default(),
        reasons,
        row.score.map_or_else(|| UNSCORED.to_string(), |score| score.to_string()),
        row.band.map(|band| band.to_string()).unwrap_or_default()
    ]
}

/// Renders the plain-text analysis report.
pub fn render_text_report(report: &Report) -> String {
    let flags = &report.flag_summary;
    let risk = &report.risk_summary;
    let heavy_rule = "=".repeat(60);
    let light_rule = "-".repeat(40);
    let mut text = String::new();

    //NOTE: Writing into a String cannot fail, the results of writeln! are discarded on purpose.
    let _ = writeln!(text, "{heavy_rule}");
    let _ = writeln!(text, "BANK TRANSACTION ANALYSIS REPORT");
    let _ = writeln!(text, "{heavy_rule}");
    let _ = writeln!(text);

    let _ = writeln!(text, "{light_rule}");
    let _ = writeln!(text, "TRANSACTION FLAGGING SUMMARY");
    let _ = writeln!(text, "{light_rule}");
    let _ = writeln!(text, "Total Transactions: {}", flags.total_transactions);
    let _ = writeln!(text, "Flagged Transactions: {}", flags.flagged_transactions);
    let _ = writeln!(text, "Flagged Percentage: {:.2}%", flags.flagged_percentage);
    let _ = writeln!(text, "Risk Threshold Used: {}", flags.score_cutoff);
    let _ = writeln!(text);
    let _ = writeln!(text, "Flagged by Risk Band:");

    for band in [RiskBand::Critical, RiskBand::High, RiskBand::Medium, RiskBand::Low] {
        let count = flags.flagged_by_band.get(&band).copied().unwrap_or_default();
        let _ = writeln!(text, "  - {band}: {count}");
    }

    let _ = writeln!(text, "  - Unscored: {}", flags.flagged_unscored);
    let _ = writeln!(text);

    let _ = writeln!(text, "{light_rule}");
    let _ = writeln!(text, "CUSTOMER RISK SUMMARY");
    let _ = writeln!(text, "{light_rule}");
    let _ = writeln!(text, "Total Customers Scored: {}", risk.total_customers);
    let _ = writeln!(text, "Anomalies Detected: {}", risk.anomalies);
    let _ = writeln!(text);
    let _ = writeln!(text, "Risk Band Distribution:");

    for share in &risk.bands {
        let _ = writeln!(text, "  - {}: {} ({:.2}%)", share.band, share.count, share.percent);
    }

    let _ = writeln!(text);
    let _ = writeln!(text, "{light_rule}");
    let _ = writeln!(text, "RECOMMENDATIONS");
    let _ = writeln!(text, "{light_rule}");

    let critical = flags.flagged_by_band.get(&RiskBand::Critical).copied().unwrap_or_default();
    let high = flags.flagged_by_band.get(&RiskBand::High).copied().unwrap_or_default();

    if critical > 0 {
        let _ = writeln!(text, "1. URGENT: Review {critical} critical risk transactions immediately");
    }

    if high > 0 {
        let _ = writeln!(text, "2. HIGH PRIORITY: Investigate {high} high risk transactions");
    }

    if risk.anomalies > 0 {
        let _ = writeln!(text, "3. Review {} anomaly customers for unusual patterns", risk.anomalies);
    }

    let _ = writeln!(text);
    let _ = writeln!(text, "{heavy_rule}");
    let _ = writeln!(text, "END OF REPORT");
    let _ = writeln!(text, "{heavy_rule}");

    text
}
