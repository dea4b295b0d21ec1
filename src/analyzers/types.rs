//! Data types used by the characterization stage.

use std::path::Path;

use tracing::debug;

use crate::error::{PipelineError, RowError};
use crate::parser::normalize_header;

/// Which threshold table applies to a detected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFamily {
    Wbgt,
    Thi,
}

/// A daily-mean column identified in the input frame, with its sibling
/// min/max columns when present.
#[derive(Debug, Clone)]
pub struct IndexSeries {
    pub prefix: &'static str,
    pub family: IndexFamily,
    pub mean_col: usize,
    pub min_col: Option<usize>,
    pub max_col: Option<usize>,
}

/// A generically-loaded daily statistics CSV: normalized headers plus raw
/// string cells. The characterizer works column-wise on top of this so the
/// categorized output can carry every input column through unchanged.
#[derive(Debug)]
pub struct DailyFrame {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped_rows: usize,
}

impl DailyFrame {
    /// Loads the frame from a CSV file at `path`. Rows whose field count
    /// does not match the header are skipped and counted.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::Configuration(format!(
                "input file not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
        if headers.is_empty() {
            return Err(PipelineError::Format("input CSV has no header".into()));
        }

        let mut rows = Vec::new();
        let mut skipped_rows = 0usize;

        for (i, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!(row = i + 1, error = %e, "skipping unreadable row");
                    skipped_rows += 1;
                    continue;
                }
            };
            if record.len() != headers.len() {
                let err = RowError::FieldCount {
                    expected: headers.len(),
                    got: record.len(),
                };
                debug!(row = i + 1, error = %err, "skipping malformed row");
                skipped_rows += 1;
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(DailyFrame {
            headers,
            rows,
            skipped_rows,
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|h| pred(h))
    }

    /// The date column, if any: first header containing `date`.
    pub fn date_column(&self) -> Option<usize> {
        self.find_column(|h| h.contains("date"))
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row][col].as_str()
    }

    pub fn numeric(&self, row: usize, col: usize) -> Option<f64> {
        self.cell(row, col)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// All values of a column parsed as numbers, `None` where unparsable.
    pub fn numeric_column(&self, col: usize) -> Vec<Option<f64>> {
        (0..self.rows.len()).map(|r| self.numeric(r, col)).collect()
    }
}

/// Identifies the tracked daily-mean columns: for each known prefix, a
/// column starting with the prefix and containing `mean`, or a bare column
/// named exactly like the prefix.
pub fn detect_index_series(frame: &DailyFrame) -> Vec<IndexSeries> {
    const PREFIXES: [(&str, IndexFamily); 3] = [
        ("wbgtout", IndexFamily::Wbgt),
        ("wbgtin", IndexFamily::Wbgt),
        ("thi", IndexFamily::Thi),
    ];

    let mut series = Vec::new();
    for (prefix, family) in PREFIXES {
        let mean_col = frame
            .find_column(|h| h.starts_with(prefix) && h.contains("mean"))
            .or_else(|| frame.column(prefix));
        if let Some(mean_col) = mean_col {
            series.push(IndexSeries {
                prefix,
                family,
                mean_col,
                min_col: frame.column(&format!("{prefix}_min")),
                max_col: frame.column(&format!("{prefix}_max")),
            });
        }
    }
    series
}
