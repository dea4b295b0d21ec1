//! Threshold tables and exposure classification.
//!
//! A table is an ordered set of severity bands over a base label. Bands are
//! evaluated from most severe downward; the first band whose lower bound is
//! at or below the value wins, so every value maps to exactly one category.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzers::types::IndexFamily;
use crate::error::PipelineError;

/// Label reported for a cell that is empty or not numeric.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One severity band: values at or above `min` (and below the next band's
/// `min`) fall into `label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    pub min: f64,
}

/// An exposure threshold table.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "base": "Safe",
///   "bands": [
///     { "label": "Caution", "min": 25.0 },
///     { "label": "Danger", "min": 31.0 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub base: String,
    pub bands: Vec<Band>,
}

/// The category a value was assigned. Severity 0 is the base label; higher
/// is worse, in band order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    pub severity: usize,
}

impl ThresholdTable {
    pub fn new(base: &str, bands: Vec<(&str, f64)>) -> Self {
        let mut table = ThresholdTable {
            base: base.to_string(),
            bands: bands
                .into_iter()
                .map(|(label, min)| Band {
                    label: label.to_string(),
                    min,
                })
                .collect(),
        };
        table.normalize();
        table
    }

    /// WBGT table: Safe <25, Caution <28, Extreme Caution <31, Danger <33,
    /// Extreme Danger >=33.
    pub fn wbgt_default() -> Self {
        ThresholdTable::new(
            "Safe",
            vec![
                ("Caution", 25.0),
                ("Extreme Caution", 28.0),
                ("Danger", 31.0),
                ("Extreme Danger", 33.0),
            ],
        )
    }

    /// THI table: Comfort <72, Alert <79, Danger <89, Emergency >=89.
    pub fn thi_default() -> Self {
        ThresholdTable::new(
            "Comfort",
            vec![("Alert", 72.0), ("Danger", 79.0), ("Emergency", 89.0)],
        )
    }

    /// Sorts bands ascending by lower bound; classification relies on it.
    fn normalize(&mut self) {
        self.bands
            .sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Assigns exactly one category: most severe band first, base otherwise.
    pub fn classify(&self, value: f64) -> Category {
        for (i, band) in self.bands.iter().enumerate().rev() {
            if value >= band.min {
                return Category {
                    label: band.label.clone(),
                    severity: i + 1,
                };
            }
        }
        Category {
            label: self.base.clone(),
            severity: 0,
        }
    }

    /// Classifies a raw CSV cell; empty or non-numeric yields `None`
    /// (reported as [`UNKNOWN_CATEGORY`]).
    pub fn classify_cell(&self, cell: &str) -> Option<Category> {
        cell.trim().parse::<f64>().ok().map(|v| self.classify(v))
    }

    /// All labels in ascending severity order, base first.
    pub fn labels(&self) -> Vec<&str> {
        std::iter::once(self.base.as_str())
            .chain(self.bands.iter().map(|b| b.label.as_str()))
            .collect()
    }

    /// Severity at or above which a day counts as "danger or worse": the
    /// band labeled `Danger` when present, else the most severe band.
    pub fn danger_severity(&self) -> Option<usize> {
        if self.bands.is_empty() {
            return None;
        }
        self.bands
            .iter()
            .position(|b| b.label == "Danger")
            .map(|i| i + 1)
            .or(Some(self.bands.len()))
    }
}

/// Threshold tables for both index families, loadable from a JSON file via
/// `--thresholds`. Absent fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "ThresholdTable::wbgt_default")]
    pub wbgt: ThresholdTable,
    #[serde(default = "ThresholdTable::thi_default")]
    pub thi: ThresholdTable,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            wbgt: ThresholdTable::wbgt_default(),
            thi: ThresholdTable::thi_default(),
        }
    }
}

impl ThresholdConfig {
    /// The table that applies to a detected index family.
    pub fn table(&self, family: IndexFamily) -> &ThresholdTable {
        match family {
            IndexFamily::Wbgt => &self.wbgt,
            IndexFamily::Thi => &self.thi,
        }
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read thresholds file {}: {e}",
                path.display()
            ))
        })?;
        let mut config: ThresholdConfig = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!(
                "invalid thresholds file {}: {e}",
                path.display()
            ))
        })?;
        config.wbgt.normalize();
        config.thi.normalize();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_wbgt_default_boundaries() {
        let table = ThresholdTable::wbgt_default();
        assert_eq!(table.classify(24.9).label, "Safe");
        assert_eq!(table.classify(25.0).label, "Caution");
        assert_eq!(table.classify(27.9).label, "Caution");
        assert_eq!(table.classify(28.0).label, "Extreme Caution");
        assert_eq!(table.classify(31.0).label, "Danger");
        assert_eq!(table.classify(32.9).label, "Danger");
        assert_eq!(table.classify(33.0).label, "Extreme Danger");
    }

    #[test]
    fn test_thi_default_boundaries() {
        let table = ThresholdTable::thi_default();
        assert_eq!(table.classify(71.9).label, "Comfort");
        assert_eq!(table.classify(72.0).label, "Alert");
        assert_eq!(table.classify(88.9).label, "Danger");
        assert_eq!(table.classify(89.0).label, "Emergency");
    }

    #[test]
    fn test_custom_table_danger_at_32() {
        let table = ThresholdTable::new(
            "Safe",
            vec![("Caution", 29.0), ("Danger", 31.0), ("Extreme", 33.0)],
        );
        let category = table.classify(32.0);
        assert_eq!(category.label, "Danger");
        assert_eq!(category.severity, 2);
    }

    #[test]
    fn test_severity_is_band_rank() {
        let table = ThresholdTable::wbgt_default();
        assert_eq!(table.classify(10.0).severity, 0);
        assert_eq!(table.classify(26.0).severity, 1);
        assert_eq!(table.classify(40.0).severity, 4);
    }

    #[test]
    fn test_classify_is_total_over_sampled_range() {
        let table = ThresholdTable::wbgt_default();
        let labels = table.labels();
        let mut v = -50.0;
        while v <= 60.0 {
            let category = table.classify(v);
            assert!(labels.contains(&category.label.as_str()));
            v += 0.25;
        }
    }

    #[test]
    fn test_classify_cell_non_numeric_is_unknown() {
        let table = ThresholdTable::wbgt_default();
        assert!(table.classify_cell("").is_none());
        assert!(table.classify_cell("n/a").is_none());
        assert_eq!(table.classify_cell("30.5").unwrap().label, "Extreme Caution");
    }

    #[test]
    fn test_danger_severity() {
        assert_eq!(ThresholdTable::wbgt_default().danger_severity(), Some(3));
        assert_eq!(ThresholdTable::thi_default().danger_severity(), Some(3));

        // No "Danger" band: fall back to the most severe band.
        let table = ThresholdTable::new("Ok", vec![("Bad", 10.0), ("Worse", 20.0)]);
        assert_eq!(table.danger_severity(), Some(2));

        let empty = ThresholdTable::new("Only", vec![]);
        assert_eq!(empty.danger_severity(), None);
    }

    #[test]
    fn test_config_load_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"wbgt": {"base": "Safe", "bands": [{"label": "Hot", "min": 30.0}]}}"#,
        )
        .unwrap();

        let config = ThresholdConfig::load(file.path()).unwrap();
        assert_eq!(config.wbgt.classify(31.0).label, "Hot");
        assert_eq!(config.thi.classify(90.0).label, "Emergency");
    }

    #[test]
    fn test_config_load_missing_file_is_configuration_error() {
        let err = ThresholdConfig::load(Path::new("/nonexistent/thresholds.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
