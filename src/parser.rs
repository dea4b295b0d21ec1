//! CSV parser for sub-daily heat-stress observations.
//!
//! Column detection is heuristic: header names are normalized and matched
//! against the alias lists commonly seen in logger exports. Malformed rows
//! are skipped and counted, never fatal on their own.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::{PipelineError, RowError};

/// A heat-stress index (or supporting measurement) tracked through the
/// pipeline. Detection order matches [`HeatIndex::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatIndex {
    WbgtOut,
    WbgtIn,
    Thi,
    Temperature,
    Humidity,
}

impl HeatIndex {
    pub const ALL: [HeatIndex; 5] = [
        HeatIndex::WbgtOut,
        HeatIndex::WbgtIn,
        HeatIndex::Thi,
        HeatIndex::Temperature,
        HeatIndex::Humidity,
    ];

    /// Canonical column key used in output CSV headers.
    pub fn key(&self) -> &'static str {
        match self {
            HeatIndex::WbgtOut => "wbgtout",
            HeatIndex::WbgtIn => "wbgtin",
            HeatIndex::Thi => "thi",
            HeatIndex::Temperature => "temperature",
            HeatIndex::Humidity => "humidity",
        }
    }

    /// Normalized header names that map to this index.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            HeatIndex::WbgtOut => &["wbgtout", "wbgt_out", "wbgt-out", "wbgt_outdoor"],
            HeatIndex::WbgtIn => &["wbgtin", "wbgt_in", "wbgt-in", "wbgt_indoor"],
            HeatIndex::Thi => &["thi", "temperature_humidity_index", "temp_humidity_index"],
            HeatIndex::Temperature => &["temperature"],
            HeatIndex::Humidity => &["humidity"],
        }
    }
}

/// One sub-daily observation. `values` is parallel to the table's detected
/// index list; a missing or non-numeric cell is `None`.
#[derive(Debug, Clone)]
pub struct RawReading {
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

impl RawReading {
    /// Local calendar date the reading belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Parsed input table: detected indices, readings sorted by timestamp with
/// duplicate timestamps resolved last-wins, and the malformed-row count.
#[derive(Debug)]
pub struct RawTable {
    pub indices: Vec<HeatIndex>,
    pub readings: Vec<RawReading>,
    pub skipped_rows: usize,
}

/// Normalizes a header name: trim, lowercase, spaces to underscores.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Attempts to parse a timestamp in the layouts loggers commonly emit.
/// `dayfirst` flips ambiguous slash/dash dates from M/D/Y to D/M/Y.
pub fn parse_timestamp(raw: &str, dayfirst: bool) -> Option<NaiveDateTime> {
    const ISO: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    const MDY: &[&str] = &[
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m-%d-%Y %H:%M:%S",
        "%m-%d-%Y %H:%M",
    ];
    const DMY: &[&str] = &[
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%d-%m-%Y %H:%M",
    ];

    let raw = raw.trim();
    let slashy = if dayfirst { DMY } else { MDY };

    for fmt in ISO.iter().chain(slashy) {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }

    // Bare date: treat as midnight.
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Locates the timestamp column among normalized headers.
///
/// Preference order: a column containing `datetime`, a column containing
/// both `date` and `time`, a column named exactly `timestamp` or `time`,
/// then any column containing `date`.
fn find_timestamp_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| {
            h.contains("datetime")
                || (h.contains("date") && h.contains("time"))
                || h == "timestamp"
                || h == "time"
        })
        .or_else(|| headers.iter().position(|h| h.contains("date")))
}

/// Maps each known index to its column position, if present.
fn find_index_columns(headers: &[String]) -> Vec<(HeatIndex, usize)> {
    let mut found = Vec::new();
    for index in HeatIndex::ALL {
        let hit = index
            .aliases()
            .iter()
            .find_map(|alias| headers.iter().position(|h| h == alias));
        if let Some(col) = hit {
            found.push((index, col));
        }
    }
    found
}

fn parse_row(
    record: &csv::StringRecord,
    ts_col: usize,
    index_cols: &[(HeatIndex, usize)],
    dayfirst: bool,
) -> Result<RawReading, RowError> {
    let raw_ts = record.get(ts_col).ok_or(RowError::MissingTimestamp)?;
    if raw_ts.trim().is_empty() {
        return Err(RowError::MissingTimestamp);
    }
    let timestamp =
        parse_timestamp(raw_ts, dayfirst).ok_or_else(|| RowError::BadTimestamp(raw_ts.into()))?;

    let values = index_cols
        .iter()
        .map(|&(_, col)| {
            record
                .get(col)
                .and_then(|cell| cell.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        })
        .collect();

    Ok(RawReading { timestamp, values })
}

/// Reads and parses the sub-daily observation CSV at `path`.
///
/// # Errors
///
/// [`PipelineError::Configuration`] if the file does not exist,
/// [`PipelineError::Format`] if no timestamp column can be found or no data
/// row parses.
pub fn read_raw_csv(path: &Path, dayfirst: bool) -> Result<RawTable, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::Configuration(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let ts_col = find_timestamp_column(&headers).ok_or_else(|| {
        PipelineError::Format(format!("no datetime column found; columns: {headers:?}"))
    })?;

    let index_cols = find_index_columns(&headers);
    if index_cols.is_empty() {
        warn!("no WBGT/THI/temperature/humidity columns detected; output will contain only dates");
    }

    let mut readings: Vec<RawReading> = Vec::new();
    let mut skipped_rows = 0usize;
    let mut data_rows = 0usize;

    for result in reader.records() {
        data_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping unreadable row");
                skipped_rows += 1;
                continue;
            }
        };

        match parse_row(&record, ts_col, &index_cols, dayfirst) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                debug!(row = data_rows, error = %e, "skipping malformed row");
                skipped_rows += 1;
            }
        }
    }

    if data_rows > 0 && readings.is_empty() {
        return Err(PipelineError::Format(format!(
            "none of {data_rows} data rows could be parsed"
        )));
    }

    // Stable sort keeps file order within equal timestamps, so keeping the
    // later element implements last-wins for duplicates.
    readings.sort_by_key(|r| r.timestamp);
    readings.dedup_by(|next, prev| {
        if next.timestamp == prev.timestamp {
            prev.values = std::mem::take(&mut next.values);
            true
        } else {
            false
        }
    });

    Ok(RawTable {
        indices: index_cols.into_iter().map(|(i, _)| i).collect(),
        readings,
        skipped_rows,
    })
}
