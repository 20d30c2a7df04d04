//! Recipe Harness
//!
//! Runs recipes against the selected target and reports the outcome.
//!
//! ## Modules
//!
//! - [`execution`] - target dispatch and `execute_recipe`
//! - [`batch`] - running a whole plan, stopping at the first failure
//! - [`formatting`] - human-readable output
//! - [`metadata`] - report records and run metadata

mod batch;
mod execution;
mod formatting;
mod metadata;

pub use batch::PlanRun;
pub use execution::{Harness, HarnessError, HarnessSettings, RecipeOutcome, execute_recipe};
pub use formatting::{format_failure, format_pass_line, format_recipe_list, format_summary};
pub use metadata::{build_report_meta, failed_result, passed_result};
