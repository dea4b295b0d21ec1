//! Stage-2 orchestration: read the daily statistics CSV, classify each day,
//! write the categorized and summary CSVs, then render plots.
//!
//! CSV artifacts are written before any plotting; a failed plot is logged
//! and never fails the run.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use crate::analyzers::classify::{Category, ThresholdConfig};
use crate::analyzers::summary::summarize;
use crate::analyzers::types::{DailyFrame, IndexSeries, detect_index_series};
use crate::analyzers::write::{write_categorized_csv, write_summary_csv};
use crate::error::PipelineError;
use crate::render::{ChartStyle, SeriesPoint, render_time_series, severity_color};

pub const SUMMARY_FILE: &str = "summary_exposure_statistics.csv";
pub const CATEGORIZED_FILE: &str = "categorized_daily.csv";

/// Outdoor-WBGT exceedance cutoffs for the `wbgtout_above_<t>` indicator
/// columns (strictly greater than, against the daily mean).
const EXCEED_THRESHOLDS: [f64; 5] = [25.0, 27.0, 28.0, 30.0, 32.0];

/// What a characterization run produced.
#[derive(Debug)]
pub struct CharacterizeReport {
    pub days: usize,
    pub skipped_rows: usize,
    pub plots: usize,
}

fn classify_series(
    frame: &DailyFrame,
    series: &[IndexSeries],
    config: &ThresholdConfig,
) -> Vec<Vec<Option<Category>>> {
    series
        .iter()
        .map(|s| {
            (0..frame.rows.len())
                .map(|r| config.table(s.family).classify_cell(frame.cell(r, s.mean_col)))
                .collect()
        })
        .collect()
}

/// Builds the derived columns appended to the categorized CSV: one category
/// column per index, a `_range` column where min and max exist, and the
/// outdoor-WBGT exceedance indicators with their per-day sum.
fn derived_columns(
    frame: &DailyFrame,
    series: &[IndexSeries],
    categories: &[Vec<Option<Category>>],
) -> (Vec<String>, Vec<Vec<String>>, Vec<usize>) {
    let mut headers = Vec::new();

    for s in series {
        headers.push(format!("{}_category", s.prefix));
    }
    let ranged: Vec<&IndexSeries> = series
        .iter()
        .filter(|s| s.min_col.is_some() && s.max_col.is_some())
        .collect();
    for s in &ranged {
        headers.push(format!("{}_range", s.prefix));
    }
    let wbgtout = series.iter().find(|s| s.prefix == "wbgtout");
    if wbgtout.is_some() {
        for t in EXCEED_THRESHOLDS {
            headers.push(format!("wbgtout_above_{t}"));
        }
        headers.push("num_thresholds_exceeded".to_string());
    }

    let mut rows = Vec::with_capacity(frame.rows.len());
    let mut exceed_counts = Vec::with_capacity(frame.rows.len());

    for r in 0..frame.rows.len() {
        let mut cells = Vec::with_capacity(headers.len());

        for cats in categories {
            let label = cats[r]
                .as_ref()
                .map(|c| c.label.clone())
                .unwrap_or_else(|| crate::analyzers::classify::UNKNOWN_CATEGORY.to_string());
            cells.push(label);
        }
        for s in &ranged {
            let range = match (
                frame.numeric(r, s.min_col.unwrap()),
                frame.numeric(r, s.max_col.unwrap()),
            ) {
                (Some(min), Some(max)) => (max - min).to_string(),
                _ => String::new(),
            };
            cells.push(range);
        }
        if let Some(s) = wbgtout {
            let mean = frame.numeric(r, s.mean_col);
            let mut exceeded = 0usize;
            for t in EXCEED_THRESHOLDS {
                let above = matches!(mean, Some(v) if v > t);
                if above {
                    exceeded += 1;
                }
                cells.push((above as u8).to_string());
            }
            cells.push(exceeded.to_string());
            exceed_counts.push(exceeded);
        }

        rows.push(cells);
    }

    (headers, rows, exceed_counts)
}

fn render_plots(
    plots_dir: &Path,
    frame: &DailyFrame,
    series: &[IndexSeries],
    categories: &[Vec<Option<Category>>],
    exceed_counts: &[usize],
) -> usize {
    let style = ChartStyle::default();
    let mut rendered = 0usize;

    for (s, cats) in series.iter().zip(categories) {
        let points: Vec<SeriesPoint> = (0..frame.rows.len())
            .filter_map(|r| {
                frame.numeric(r, s.mean_col).map(|value| SeriesPoint {
                    value,
                    color: severity_color(cats[r].as_ref().map(|c| c.severity)),
                })
            })
            .collect();

        if points.is_empty() {
            warn!(index = s.prefix, "no plottable values, skipping plot");
            continue;
        }

        let path = plots_dir.join(format!("{}.png", frame.headers[s.mean_col]));
        match render_time_series(&path, &points, &style) {
            Ok(()) => {
                info!(path = %path.display(), "plot saved");
                rendered += 1;
            }
            Err(e) => error!(index = s.prefix, error = %e, "plot rendering failed"),
        }
    }

    if !exceed_counts.is_empty() {
        let points: Vec<SeriesPoint> = exceed_counts
            .iter()
            .map(|&n| SeriesPoint {
                value: n as f64,
                color: severity_color(Some(n.min(4))),
            })
            .collect();
        let path = plots_dir.join("wbgtout_threshold_exceedance_count.png");
        match render_time_series(&path, &points, &style) {
            Ok(()) => {
                info!(path = %path.display(), "plot saved");
                rendered += 1;
            }
            Err(e) => error!(error = %e, "exceedance plot rendering failed"),
        }
    }

    rendered
}

/// Runs the full characterization against the daily CSV at `input`,
/// writing all artifacts under `outdir`.
pub fn run(
    input: &Path,
    outdir: &Path,
    config: &ThresholdConfig,
) -> Result<CharacterizeReport, PipelineError> {
    fs::create_dir_all(outdir)?;
    let plots_dir = outdir.join("plots");
    fs::create_dir_all(&plots_dir)?;

    let frame = DailyFrame::load(input)?;
    if frame.skipped_rows > 0 {
        warn!(skipped = frame.skipped_rows, "malformed daily rows skipped");
    }

    if let Some(date_col) = frame.date_column() {
        if let (Some(first), Some(last)) = (frame.rows.first(), frame.rows.last()) {
            info!(
                days = frame.rows.len(),
                from = %first[date_col],
                to = %last[date_col],
                "daily statistics loaded"
            );
        }
    }

    let series = detect_index_series(&frame);
    if series.is_empty() {
        warn!("no WBGT/THI columns detected; output will carry no categories");
    }

    let categories = classify_series(&frame, &series, config);
    let (extra_headers, extra_rows, exceed_counts) = derived_columns(&frame, &series, &categories);

    write_categorized_csv(
        &outdir.join(CATEGORIZED_FILE),
        &frame,
        &extra_headers,
        &extra_rows,
    )?;

    let fields = summarize(&frame, &series, &categories, config);
    write_summary_csv(&outdir.join(SUMMARY_FILE), &fields, !frame.rows.is_empty())?;

    let plots = if frame.rows.is_empty() {
        warn!("no rows to plot");
        0
    } else {
        render_plots(&plots_dir, &frame, &series, &categories, &exceed_counts)
    };

    Ok(CharacterizeReport {
        days: frame.rows.len(),
        skipped_rows: frame.skipped_rows,
        plots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn daily_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_run_writes_all_artifacts() {
        let input = daily_csv(
            "date,wbgtout_min,wbgtout_mean,wbgtout_max,thi_mean\n\
             2025-08-01,22,26,30,70\n\
             2025-08-02,24,32,35,81\n",
        );
        let outdir = tempfile::tempdir().unwrap();

        let report = run(input.path(), outdir.path(), &ThresholdConfig::default()).unwrap();

        assert_eq!(report.days, 2);
        assert_eq!(report.skipped_rows, 0);
        // wbgtout_mean, thi_mean, exceedance count
        assert_eq!(report.plots, 3);

        let categorized =
            std::fs::read_to_string(outdir.path().join(CATEGORIZED_FILE)).unwrap();
        let mut lines = categorized.lines();
        let header = lines.next().unwrap();
        assert!(header.contains("wbgtout_category"));
        assert!(header.contains("thi_category"));
        assert!(header.contains("wbgtout_range"));
        assert!(header.contains("wbgtout_above_25"));
        assert!(header.contains("num_thresholds_exceeded"));

        let first = lines.next().unwrap();
        assert!(first.contains("Caution"));
        let second = lines.next().unwrap();
        assert!(second.contains("Danger"));

        let summary = std::fs::read_to_string(outdir.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.lines().count(), 2);

        assert!(outdir.path().join("plots/wbgtout_mean.png").exists());
        assert!(outdir.path().join("plots/thi_mean.png").exists());
        assert!(
            outdir
                .path()
                .join("plots/wbgtout_threshold_exceedance_count.png")
                .exists()
        );
    }

    #[test]
    fn test_run_header_only_input_produces_header_only_outputs() {
        let input = daily_csv("date,wbgtout_mean\n");
        let outdir = tempfile::tempdir().unwrap();

        let report = run(input.path(), outdir.path(), &ThresholdConfig::default()).unwrap();

        assert_eq!(report.days, 0);
        assert_eq!(report.plots, 0);

        let categorized =
            std::fs::read_to_string(outdir.path().join(CATEGORIZED_FILE)).unwrap();
        assert_eq!(categorized.lines().count(), 1);
        let summary = std::fs::read_to_string(outdir.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.lines().count(), 1);
    }

    #[test]
    fn test_run_missing_input_is_configuration_error() {
        let outdir = tempfile::tempdir().unwrap();
        let err = run(
            Path::new("/nonexistent/daily.csv"),
            outdir.path(),
            &ThresholdConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_exceedance_indicators_are_strictly_greater() {
        let input = daily_csv(
            "date,wbgtout_mean\n\
             2025-08-01,25\n\
             2025-08-02,25.1\n",
        );
        let outdir = tempfile::tempdir().unwrap();
        run(input.path(), outdir.path(), &ThresholdConfig::default()).unwrap();

        let categorized =
            std::fs::read_to_string(outdir.path().join(CATEGORIZED_FILE)).unwrap();
        let rows: Vec<&str> = categorized.lines().collect();
        // 25.0 exceeds nothing; 25.1 exceeds only the 25 cutoff.
        assert!(rows[1].ends_with("0,0,0,0,0,0"));
        assert!(rows[2].ends_with("1,0,0,0,0,1"));
    }

    #[test]
    fn test_unknown_category_for_unparsable_mean() {
        let input = daily_csv("date,thi_mean\n2025-08-01,n/a\n");
        let outdir = tempfile::tempdir().unwrap();
        run(input.path(), outdir.path(), &ThresholdConfig::default()).unwrap();

        let categorized =
            std::fs::read_to_string(outdir.path().join(CATEGORIZED_FILE)).unwrap();
        assert!(categorized.lines().nth(1).unwrap().contains("Unknown"));
    }
}
