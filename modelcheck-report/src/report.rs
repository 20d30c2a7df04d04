//! Report Data Structures

use chrono::{DateTime, Utc};
use modelcheck_logic::{OutputComparison, Tolerance};
use serde::{Deserialize, Serialize};

/// Complete record of one modelcheck run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub meta: ReportMeta,
    pub results: Vec<RecipeReportResult>,
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Target backend the run compared against the host
    pub target: String,
    pub tolerance: Tolerance,
    pub iteration: u32,
    pub seed: Option<u64>,
    pub git_commit: Option<String>,
}

/// Outcome of one recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeReportResult {
    pub name: String,
    pub model: String,
    pub status: RecipeStatus,
    /// Comparison rounds that passed before the recipe finished or failed
    pub iterations: u32,
    pub duration_ms: f64,
    /// Per-output results from the last passing round
    pub outputs: Vec<OutputComparison>,
    pub failure: Option<FailureInfo>,
}

/// Recipe execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    Passed,
    Failed,
}

/// Failure information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Failure class (`configuration`, `tolerance`, `topk-mismatch`, ...)
    pub kind: String,
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Recipes selected for the run
    pub total_recipes: usize,
    pub passed: usize,
    pub failed: usize,
    /// Selected but never started because an earlier recipe failed
    pub not_run: usize,
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Tally results against the number of recipes that were selected
    pub fn from_results(selected: usize, results: &[RecipeReportResult]) -> Self {
        let passed = results
            .iter()
            .filter(|r| r.status == RecipeStatus::Passed)
            .count();
        let failed = results.len() - passed;
        Self {
            total_recipes: selected,
            passed,
            failed,
            not_run: selected.saturating_sub(results.len()),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.not_run == 0
    }
}
