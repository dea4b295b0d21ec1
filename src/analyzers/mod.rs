//! Exposure characterization of daily heat-stress statistics.
//!
//! This module loads the daily CSV produced by the aggregation stage,
//! assigns an exposure category to each day, computes whole-range summary
//! statistics, and renders time-series plots.

pub mod characterize;
pub mod classify;
pub mod summary;
pub mod types;
pub mod utility;
pub mod write;
