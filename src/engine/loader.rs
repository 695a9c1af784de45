use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord, Trim};
use tokio::task::spawn_blocking;
use tracing::{error, info};

use crate::engine::errors::LoadError;
use crate::models::RawRecord;

/// Columns every input must carry, each with the dataset alias it may appear under.
const REQUIRED_COLUMNS: [(&str, &str); 3] = [
    ("timestamp", "step"),
    ("type", "type"),
    ("amount", "amount")
];

const PARTY_COLUMNS: [&str; 4] = ["sender_id", "nameOrig", "receiver_id", "nameDest"];

/// Reads a CSV file into raw records on a blocking task so the runtime is never stalled by file
/// I/O. This is the only place the pipeline touches the filesystem on the way in.
pub async fn load_records(path: impl Into<PathBuf>) -> Result<Vec<RawRecord>, LoadError> {
    let path = path.into();

    let records = spawn_blocking(move || {
        let file = File::open(&path).map_err(|source| LoadError::Open { path: path.clone(), source })?;
        let records = read_records(BufReader::new(file))?;

        info!("Loaded {} rows from {}", records.len(), path.display());

        Ok::<_, LoadError>(records)
    })
    .await??;

    Ok(records)
}

/// Deserializes every row of a CSV source.
///
/// A row the reader cannot decode is kept as an unreadable record so the validator reports it
/// with its row index instead of the row vanishing. I/O failures abort the read.
pub fn read_records<R: Read>(input: R) -> Result<Vec<RawRecord>, LoadError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    check_headers(reader.headers()?)?;

    let mut records = Vec::new();

    for result in reader.deserialize::<RawRecord>() {
        match result {
            Ok(record) => records.push(record),
            Err(error) if error.is_io_error() => return Err(error.into()),
            Err(error) => {
                error!("CSV deserialization error: {error}");
                records.push(RawRecord::unreadable(error.to_string()));
            }
        }
    }

    Ok(records)
}

fn check_headers(headers: &StringRecord) -> Result<(), LoadError> {
    let has = |name: &str| headers.iter().any(|header| header == name);

    for (column, alias) in REQUIRED_COLUMNS {
        if !has(column) && !has(alias) {
            return Err(LoadError::MissingColumn(column));
        }
    }

    if !PARTY_COLUMNS.iter().any(|column| has(*column)) {
        return Err(LoadError::MissingColumn("sender_id"));
    }

    Ok(())
}
