//! Report Assembly
//!
//! Turns harness outcomes into `modelcheck-report` records and collects run
//! metadata (tool version, target, comparison defaults, git commit).

use super::{HarnessError, HarnessSettings, RecipeOutcome};
use crate::target::TargetSelector;
use chrono::Utc;
use modelcheck_report::{FailureInfo, RecipeReportResult, RecipeStatus, ReportMeta};
use std::path::Path;
use std::time::Duration;

/// Build report metadata for a run
pub fn build_report_meta(
    target: TargetSelector,
    settings: &HarnessSettings,
    seed: Option<u64>,
) -> ReportMeta {
    ReportMeta {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        target: target.name().to_string(),
        tolerance: settings.tolerance,
        iteration: settings.iteration,
        seed,
        git_commit: git_commit(),
    }
}

/// Current commit hash, if run inside a git checkout
fn git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
}

/// Report entry for a recipe that passed
pub fn passed_result(outcome: &RecipeOutcome) -> RecipeReportResult {
    RecipeReportResult {
        name: outcome.name.clone(),
        model: outcome.model_path.display().to_string(),
        status: RecipeStatus::Passed,
        iterations: outcome.iterations,
        duration_ms: outcome.duration.as_secs_f64() * 1e3,
        outputs: outcome.summary.outputs.clone(),
        failure: None,
    }
}

/// Report entry for a recipe that stopped the run
pub fn failed_result(
    name: &str,
    model: &Path,
    error: &HarnessError,
    elapsed: Duration,
) -> RecipeReportResult {
    RecipeReportResult {
        name: name.to_string(),
        model: model.display().to_string(),
        status: RecipeStatus::Failed,
        iterations: error.completed_iterations(),
        duration_ms: elapsed.as_secs_f64() * 1e3,
        outputs: Vec::new(),
        failure: Some(FailureInfo {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }),
    }
}
