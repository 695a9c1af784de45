use std::io::{stderr, stdout, BufWriter, Write};
use std::path::Path;
use std::process::exit;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use transaction_risk_pipeline::config::PipelineConfig;
use transaction_risk_pipeline::engine::{load_records, Workflow};
use transaction_risk_pipeline::report::{render_text_report, write_reports};

#[tokio::main]
async fn main() -> Result<()> {
    //NOTE: The argument surface is four positionals, clap would be the next step if it grows.
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: transaction-risk-pipeline [input].csv [output_dir] [config.json|-:optional] [log_level:optional]");
        eprintln!("Available log levels: error, warn, info, debug, trace (default: warn)");
        exit(1);
    }

    let input_path = &args[1];
    let output_dir = Path::new(&args[2]);
    let config_path = args.get(3).filter(|path| path.as_str() != "-");
    let log_level = args.get(4)
        .map(|s| parse_log_level(s)).unwrap_or(LevelFilter::WARN);

    setup_logging(log_level);

    let config = match config_path {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("Invalid configuration in {path}"))?,
        None => PipelineConfig::default()
    };

    let mut workflow = Workflow::new(config)?;

    let timer = Instant::now();
    let records = load_records(input_path).await?;
    workflow.load(records);

    let validation = workflow.clean()?;

    for rejected in &validation.rejected {
        warn!("{rejected}");
    }

    workflow.build_features()?;
    workflow.score()?;
    workflow.flag()?;
    let report = workflow.assemble_report()?;

    info!("Processed batch in: {:?}", timer.elapsed());

    let paths = write_reports(&report, output_dir)?;
    info!("Wrote {}, {} and {}", paths.customer_csv.display(), paths.flagged_csv.display(), paths.text_report.display());

    let mut output = BufWriter::new(stdout().lock());
    output.write_all(render_text_report(&report).as_bytes())?;
    output.flush()?;

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'warn'", level);
            LevelFilter::WARN
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the text report, logging goes to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}
