//! CSV persistence for the characterization artifacts.

use std::path::Path;

use tracing::info;

use crate::analyzers::types::DailyFrame;
use crate::error::PipelineError;

/// Writes the categorized daily CSV: every input column carried through
/// unchanged, followed by the derived columns. `extra_rows` is parallel to
/// `frame.rows`. An empty frame produces a header-only file.
pub fn write_categorized_csv(
    path: &Path,
    frame: &DailyFrame,
    extra_headers: &[String],
    extra_rows: &[Vec<String>],
) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;

    let header: Vec<&str> = frame
        .headers
        .iter()
        .chain(extra_headers.iter())
        .map(String::as_str)
        .collect();
    writer.write_record(&header)?;

    for (row, extra) in frame.rows.iter().zip(extra_rows) {
        let record: Vec<&str> = row.iter().chain(extra.iter()).map(String::as_str).collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = frame.rows.len(), "categorized CSV written");
    Ok(())
}

/// Writes the one-row summary CSV from ordered `(column, value)` pairs.
/// With `has_data` false only the header is written.
pub fn write_summary_csv(
    path: &Path,
    fields: &[(String, String)],
    has_data: bool,
) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(fields.iter().map(|(name, _)| name.as_str()))?;
    if has_data {
        writer.write_record(fields.iter().map(|(_, value)| value.as_str()))?;
    }

    writer.flush()?;
    info!(path = %path.display(), "summary CSV written");
    Ok(())
}
