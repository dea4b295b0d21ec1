//! Whole-range summary statistics over the categorized daily rows.

use crate::analyzers::classify::{Category, ThresholdConfig};
use crate::analyzers::types::{DailyFrame, IndexSeries};
use crate::analyzers::utility::{mean, stddev};
use crate::parser::normalize_header;

fn fold_min(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}

fn fold_max(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

fn fmt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Computes the single summary row as ordered `(column, value)` pairs.
///
/// Per detected index: overall mean/min/max/stddev of the daily values,
/// day count and percentage per category (plus unclassifiable days), and
/// the count of days at danger-or-worse severity. `categories` is parallel
/// to `series`, each entry parallel to the frame's rows.
pub fn summarize(
    frame: &DailyFrame,
    series: &[IndexSeries],
    categories: &[Vec<Option<Category>>],
    config: &ThresholdConfig,
) -> Vec<(String, String)> {
    let days_total = frame.rows.len();
    let mut fields = vec![("days_total".to_string(), days_total.to_string())];

    for (s, cats) in series.iter().zip(categories) {
        let p = s.prefix;
        let table = config.table(s.family);

        let means: Vec<f64> = frame
            .numeric_column(s.mean_col)
            .into_iter()
            .flatten()
            .collect();
        let overall_mean = (!means.is_empty()).then(|| mean(&means));
        let overall_sd = overall_mean.map(|m| stddev(&means, m));

        // Overall min/max prefer the dedicated columns, like the original;
        // the daily means are the fallback.
        let min_values = s
            .min_col
            .map(|c| frame.numeric_column(c))
            .unwrap_or_else(|| frame.numeric_column(s.mean_col));
        let max_values = s
            .max_col
            .map(|c| frame.numeric_column(c))
            .unwrap_or_else(|| frame.numeric_column(s.mean_col));

        fields.push((format!("{p}_mean_overall"), fmt(overall_mean)));
        fields.push((format!("{p}_min_overall"), fmt(fold_min(&min_values))));
        fields.push((format!("{p}_max_overall"), fmt(fold_max(&max_values))));
        fields.push((format!("{p}_stddev_overall"), fmt(overall_sd)));

        for (severity, label) in table.labels().iter().enumerate() {
            let days = cats
                .iter()
                .flatten()
                .filter(|c| c.severity == severity)
                .count();
            let pct = if days_total == 0 {
                0.0
            } else {
                days as f64 / days_total as f64 * 100.0
            };
            let key = normalize_header(label);
            fields.push((format!("{p}_days_{key}"), days.to_string()));
            fields.push((format!("{p}_pct_{key}"), format!("{pct:.1}")));
        }

        let unknown = cats.iter().filter(|c| c.is_none()).count();
        fields.push((format!("{p}_days_unknown"), unknown.to_string()));

        let danger_days = match table.danger_severity() {
            Some(threshold) => cats
                .iter()
                .flatten()
                .filter(|c| c.severity >= threshold)
                .count(),
            None => 0,
        };
        fields.push((format!("{p}_days_danger_or_worse"), danger_days.to_string()));
    }

    fields
}
