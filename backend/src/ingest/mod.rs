//! Upload boundary: CSV decoding into typed records, with the schema checked
//! before anything reaches the session table.

use shared::NewsRecord;

/// Columns the uploaded file must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "Title",
    "Content",
    "Fact",
    "References",
    "Classification",
    "Datasource",
    "Label",
    "Label_id",
];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse an uploaded CSV body into records, rejecting files whose header
/// lacks any required column so schema problems surface at upload time
/// instead of mid-detection.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<NewsRecord>, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == **required))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
