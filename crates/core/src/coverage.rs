//! Per-district coverage aggregates and quota progress.
//!
//! Aggregates are recomputed by the backend; the flows only read them.

use serde::{Deserialize, Serialize};

use crate::district::District;
use crate::types::EntityId;

/// Approved images wanted per district.
pub const COVERAGE_TARGET: u32 = 1000;

/// A row from the `coverage_stats` view with its district embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAggregate {
    pub id: EntityId,
    pub district_id: EntityId,
    pub total_submissions: u32,
    pub pending_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
    #[serde(rename = "districts", default)]
    pub district: Option<District>,
}

impl CoverageAggregate {
    /// `total = pending + approved + rejected`.
    pub fn is_consistent(&self) -> bool {
        let decided = u64::from(self.approved_count) + u64::from(self.rejected_count);
        u64::from(self.pending_count) + decided == u64::from(self.total_submissions)
    }

    pub fn progress(&self) -> f64 {
        progress_ratio(self.approved_count)
    }

    /// `"250/1000"`.
    pub fn progress_label(&self) -> String {
        format!("{}/{COVERAGE_TARGET}", self.approved_count)
    }
}

/// Fraction of the quota reached, capped at 1.0.
pub fn progress_ratio(approved: u32) -> f64 {
    (f64::from(approved) / f64::from(COVERAGE_TARGET)).min(1.0)
}

/// [`progress_ratio`] as a percentage.
pub fn progress_percent(approved: u32) -> f64 {
    progress_ratio(approved) * 100.0
}
