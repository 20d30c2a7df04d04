//! Plan Execution
//!
//! Runs an execution plan recipe by recipe. The first failing recipe stops the
//! run: later recipes are never started and the report counts them as not run.

use super::formatting::format_pass_line;
use super::metadata::{failed_result, passed_result};
use super::{Harness, HarnessError};
use crate::planner::ExecutionPlan;
use indicatif::ProgressBar;
use modelcheck_report::{ReportMeta, ReportSummary, RunReport};
use rand::RngCore;
use std::time::Instant;

/// Report of a plan run plus the failure that stopped it, if any
#[derive(Debug)]
pub struct PlanRun {
    pub report: RunReport,
    pub failure: Option<(&'static str, HarnessError)>,
}

impl PlanRun {
    /// `Err` naming the recipe that stopped the run
    pub fn status(&self) -> anyhow::Result<()> {
        match &self.failure {
            Some((name, error)) => Err(anyhow::anyhow!(
                "Run stopped: recipe '{}' failed [{}]",
                name,
                error.kind()
            )),
            None => Ok(()),
        }
    }
}

impl Harness {
    /// Run every recipe of `plan` in order until one fails.
    ///
    /// With `echo_passes`, a `✓` line is printed for each passing recipe.
    pub fn run_plan(
        &mut self,
        plan: &ExecutionPlan,
        meta: ReportMeta,
        rng: &mut dyn RngCore,
        progress: &ProgressBar,
        echo_passes: bool,
    ) -> PlanRun {
        let mut results = Vec::with_capacity(plan.recipes.len());
        let mut failure = None;

        for def in &plan.recipes {
            progress.set_message(def.name);
            let start = Instant::now();
            match self.execute(*def, rng) {
                Ok(outcome) => {
                    if echo_passes {
                        progress.suspend(|| println!("{}", format_pass_line(&outcome)));
                    }
                    results.push(passed_result(&outcome));
                }
                Err(e) => {
                    let model = self.settings().models_dir.join(def.model_file);
                    results.push(failed_result(def.name, &model, &e, start.elapsed()));
                    failure = Some((def.name, e));
                    break;
                }
            }
            progress.inc(1);
        }

        let summary = ReportSummary::from_results(plan.recipes.len(), &results);
        PlanRun {
            report: RunReport {
                meta,
                results,
                summary,
            },
            failure,
        }
    }
}
