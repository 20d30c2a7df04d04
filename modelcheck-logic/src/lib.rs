//! modelcheck Logic - Output Comparison
//!
//! Decides whether a target's outputs agree with the host reference.
//! Provides policy resolution (Strict / TopK with rank fallback), the comparator
//! itself, and structured failure diagnostics.

mod compare;
mod error;
mod policy;

pub use compare::{
    ComparisonSummary, OutputComparison, check_comparable, compare_outputs, top_k_indices,
};
pub use error::{CompareError, ShapeMismatch, ToleranceFailure, TopKFailure};
pub use policy::{
    ComparisonRequest, EffectivePolicy, MAX_TOP_K_RANK, Metric, PolicyOverrides, Tolerance,
};
