//! # modelcheck
//!
//! Cross-target correctness checker for compiled inference graphs.
//!
//! modelcheck runs the same compiled model with the same random inputs on a
//! trusted host reference (an in-process interpreter) and on a target backend, then compares the outputs:
//! - **Strict**: element-wise `|target - host| <= atol + rtol * |host|`
//! - **TopK**: equal sets of the `k` largest indices (per row for rank-2 outputs)
//! - **Targets**: a local accelerator build, or a mobile device over the device bridge
//! - **Fail fast**: the first failing recipe stops the run
//!
//! ## Quick Start
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     modelcheck::run()
//! }
//! ```
//!
//! ## Comparing outputs directly
//!
//! ```ignore
//! use modelcheck::{ComparisonRequest, Tensor, Tolerance, compare_outputs};
//!
//! let host = vec![Tensor::new(vec![2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?];
//! let target = vec![Tensor::new(vec![2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?];
//! compare_outputs(&host, &target, &ComparisonRequest::strict(Tolerance::default()))?;
//! ```

mod recipes;

pub use recipes::catalog;

// Re-export core types
pub use modelcheck_core::{
    DType, InputSet, InputSpec, ModelError, ModelSignature, OutputSet, PolicyOverrides,
    PreparedRecipe, Recipe, RecipeDef, RecipeRegistry, RunnerError, TargetRunner, Tensor,
    TensorData, TensorError, TensorSpec,
};

// Re-export the comparator
pub use modelcheck_logic::{
    CompareError, ComparisonRequest, ComparisonSummary, EffectivePolicy, Metric,
    OutputComparison, ShapeMismatch, Tolerance, ToleranceFailure, TopKFailure, compare_outputs,
    top_k_indices,
};

// Re-export wire formats
pub use modelcheck_wire::{BenchmarkInvocation, InputBinding, WireError};

// Re-export reporting
pub use modelcheck_report::{OutputFormat, RecipeStatus, RunReport, generate_json_report};

// Re-export the harness
pub use modelcheck_cli::{
    Harness, HarnessError, HarnessSettings, InterpreterRunner, ModelCheckConfig, PlanRun,
    RecipeOutcome, TargetSelector, execute_recipe,
};

/// Run the modelcheck CLI over the built-in recipe catalog
pub fn run() -> anyhow::Result<()> {
    modelcheck_cli::run_with_registry(catalog())
}
