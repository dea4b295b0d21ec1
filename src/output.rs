//! Persistence of daily statistics to CSV.

use std::path::Path;

use tracing::info;

use crate::error::PipelineError;
use crate::parser::HeatIndex;
use crate::stats::DailyStats;

/// Formats an optional value for a CSV cell; `None` becomes an empty cell.
pub fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes the daily statistics CSV: a `date` column followed by
/// `<key>_min,<key>_mean,<key>_max,<key>_count` per detected index, one row
/// per date in the given (ascending) order. An empty `rows` slice produces
/// a header-only file.
pub fn write_daily_csv(
    path: &Path,
    indices: &[HeatIndex],
    rows: &[DailyStats],
) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["date".to_string()];
    for index in indices {
        let key = index.key();
        header.push(format!("{key}_min"));
        header.push(format!("{key}_mean"));
        header.push(format!("{key}_max"));
        header.push(format!("{key}_count"));
    }
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
        for agg in &row.aggregates {
            record.push(fmt_opt(agg.min));
            record.push(fmt_opt(agg.mean));
            record.push(fmt_opt(agg.max));
            record.push(agg.count.to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "daily stats written");
    Ok(())
}
