mod assembler;
mod errors;
mod export;
#[cfg(test)]
mod tests;

pub use assembler::{
    assemble, BandShare, CustomerRiskRow, CustomerScore, FlagStatus, FlagSummary, FlaggedTransactionRow,
    Report, RiskSummary
};
pub use errors::ExportError;
pub use export::{render_text_report, write_customer_csv, write_flagged_csv, write_reports, ReportPaths};
