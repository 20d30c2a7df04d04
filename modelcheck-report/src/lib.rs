//! modelcheck Report
//!
//! Serializable record of a run: metadata, one result per attempted recipe,
//! and a summary. Rendered as JSON for machines; the CLI owns human output.

mod json;
mod report;

pub use json::generate_json_report;
pub use report::{
    FailureInfo, RecipeReportResult, RecipeStatus, ReportMeta, ReportSummary, RunReport,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Human,
    /// JSON run report
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use modelcheck_logic::{EffectivePolicy, OutputComparison, Tolerance};

    fn result(name: &str, status: RecipeStatus) -> RecipeReportResult {
        RecipeReportResult {
            name: name.to_string(),
            model: format!("{name}.tflite"),
            status,
            iterations: 1,
            duration_ms: 2.5,
            outputs: vec![OutputComparison {
                output: 0,
                shape: vec![2, 2],
                policy: EffectivePolicy::Strict(Tolerance::default()),
                max_abs_diff: Some(0.0),
            }],
            failure: (status == RecipeStatus::Failed).then(|| FailureInfo {
                kind: "tolerance".to_string(),
                message: "Not equal to tolerance".to_string(),
            }),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_summary_counts_not_run() {
        let results = vec![result("add", RecipeStatus::Passed), result("mul", RecipeStatus::Failed)];
        let summary = ReportSummary::from_results(5, &results);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_run, 3);
        assert_eq!(summary.total_duration_ms, 5.0);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_json_report_shape() {
        let results = vec![result("add", RecipeStatus::Passed)];
        let report = RunReport {
            meta: ReportMeta {
                version: "0.1.0".to_string(),
                timestamp: Utc::now(),
                target: "reference-accelerator".to_string(),
                tolerance: Tolerance::default(),
                iteration: 1,
                seed: Some(7),
                git_commit: None,
            },
            summary: ReportSummary::from_results(1, &results),
            results,
        };
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][0]["status"], "passed");
        assert_eq!(value["results"][0]["outputs"][0]["shape"][1], 2);
        assert_eq!(value["meta"]["target"], "reference-accelerator");
        assert_eq!(value["summary"]["passed"], 1);
        assert!(value["results"][0]["failure"].is_null());
    }
}
