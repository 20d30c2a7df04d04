//! Output Formatting
//!
//! Human-readable lines for the terminal: one pass marker per recipe, the
//! failure that stopped the run, the recipe catalog, and a closing summary.

use super::{HarnessError, RecipeOutcome};
use modelcheck_core::{Recipe, RecipeDef, RecipeRegistry};
use modelcheck_report::ReportSummary;
use std::error::Error;

/// `✓ <name> passed (...)`
pub fn format_pass_line(outcome: &RecipeOutcome) -> String {
    let outputs = outcome.summary.outputs.len();
    let max_diff = outcome
        .summary
        .outputs
        .iter()
        .filter_map(|o| o.max_abs_diff)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
    let policies: Vec<String> = outcome
        .summary
        .outputs
        .iter()
        .map(|o| o.policy.to_string())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut detail = format!(
        "{} iteration{}, {} output{}, {}",
        outcome.iterations,
        if outcome.iterations == 1 { "" } else { "s" },
        outputs,
        if outputs == 1 { "" } else { "s" },
        policies.join(" + ")
    );
    if let Some(d) = max_diff {
        detail.push_str(&format!(", max |diff| {:.3e}", d));
    }
    detail.push_str(&format!(", {:.1} ms", outcome.duration.as_secs_f64() * 1e3));

    format!("✓ {} passed ({})", outcome.name, detail)
}

/// `✗ <name> failed [kind]` followed by the indented error chain
pub fn format_failure(recipe: &str, error: &HarnessError) -> String {
    let mut output = format!("✗ {} failed [{}]\n", recipe, error.kind());
    output.push_str(&format!("    {}\n", error));
    let mut source = error.source();
    while let Some(cause) = source {
        output.push_str(&format!("    caused by: {}\n", cause));
        source = cause.source();
    }
    output
}

/// Catalog listing for `modelcheck list`
pub fn format_recipe_list(registry: &RecipeRegistry) -> String {
    let mut output = String::from("modelcheck recipes:\n");
    for def in registry.iter() {
        output.push_str(&format!("├── {} ({})\n", def.name, def.model_file));
        for (i, input) in def.inputs.iter().enumerate() {
            output.push_str(&format!("│   ├── input {}: {}\n", i, input));
        }
        output.push_str(&format!("│   └── compare: {}\n", describe_overrides(def)));
    }
    output.push_str(&format!("{} recipes found.\n", registry.len()));
    output
}

fn describe_overrides(def: &RecipeDef) -> String {
    let overrides = def.overrides();
    match (overrides.metric, overrides.k) {
        (None, _) => "defaults".to_string(),
        (Some(metric), Some(k)) => format!("{} (k={})", metric, k),
        (Some(metric), None) => metric.to_string(),
    }
}

/// Closing summary line
pub fn format_summary(summary: &ReportSummary) -> String {
    let mut line = format!("{} passed, {} failed", summary.passed, summary.failed);
    if summary.not_run > 0 {
        line.push_str(&format!(", {} not run", summary.not_run));
    }
    line.push_str(&format!(" ({:.1} ms)", summary.total_duration_ms));
    line
}
