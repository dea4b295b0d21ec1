//! Daily aggregation of sub-daily heat-stress readings.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::analyzers::utility::mean;
use crate::parser::RawTable;

/// Min/mean/max over one day's valid readings for a single index.
/// All fields are `None` when the day had no valid value for the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAggregate {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub count: usize,
}

impl IndexAggregate {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return IndexAggregate {
                min: None,
                max: None,
                mean: None,
                count: 0,
            };
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        IndexAggregate {
            min: Some(min),
            max: Some(max),
            mean: Some(mean(values)),
            count: values.len(),
        }
    }
}

/// One output row: a calendar date plus one aggregate per detected index,
/// parallel to the table's index list.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub aggregates: Vec<IndexAggregate>,
}

/// Groups readings by calendar date and computes per-index min/mean/max.
/// Output is ordered by date ascending, one row per distinct date.
pub fn aggregate_daily(table: &RawTable) -> Vec<DailyStats> {
    let n_indices = table.indices.len();

    let mut by_date: BTreeMap<NaiveDate, Vec<Vec<f64>>> = BTreeMap::new();

    for reading in &table.readings {
        let buckets = by_date
            .entry(reading.date())
            .or_insert_with(|| vec![Vec::new(); n_indices]);
        for (slot, value) in buckets.iter_mut().zip(&reading.values) {
            if let Some(v) = value {
                slot.push(*v);
            }
        }
    }

    by_date
        .into_iter()
        .map(|(date, buckets)| DailyStats {
            date,
            aggregates: buckets
                .iter()
                .map(|values| IndexAggregate::from_values(values))
                .collect(),
        })
        .collect()
}
