//! Comparison Failures

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a host/target comparison failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    /// Output sets are not comparable; always fatal, never coerced
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(ShapeMismatch),

    /// Values disagree under the Strict policy
    #[error("{0}")]
    Tolerance(Box<ToleranceFailure>),

    /// Top-k index sets disagree
    #[error("{0}")]
    TopKMismatch(TopKFailure),

    /// Invalid policy parameter
    #[error("Invalid comparison policy for output {output}: {message}")]
    Policy {
        /// Output slot the policy was resolved for
        output: usize,
        /// What was wrong
        message: String,
    },
}

impl CompareError {
    /// Stable short name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            CompareError::ShapeMismatch(_) => "shape-mismatch",
            CompareError::Tolerance(_) => "tolerance",
            CompareError::TopKMismatch(_) => "topk-mismatch",
            CompareError::Policy { .. } => "policy",
        }
    }
}

/// Structural disagreement between host and target output sets
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ShapeMismatch {
    /// Different number of outputs
    #[error("host produced {host} output(s), target produced {target}")]
    OutputCount {
        /// Host output count
        host: usize,
        /// Target output count
        target: usize,
    },
    /// Same slot, different shapes
    #[error("output {output}: host shape {host:?} vs target shape {target:?}")]
    Shape {
        /// Output slot
        output: usize,
        /// Host shape
        host: Vec<usize>,
        /// Target shape
        target: Vec<usize>,
    },
}

/// Diagnostics for a Strict failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceFailure {
    /// Output slot
    pub output: usize,
    /// Multi-dimensional index of the worst violating element
    pub index: Vec<usize>,
    /// Host (desired) value at `index`
    pub host: f64,
    /// Target (actual) value at `index`
    pub target: f64,
    /// `|target - host|` at `index` (infinite when NaN/inf placement differs)
    pub deviation: f64,
    /// Largest absolute deviation over the whole tensor
    pub max_abs_diff: f64,
    /// Number of elements outside the band
    pub mismatched: usize,
    /// Total element count
    pub total: usize,
    /// Relative tolerance applied
    pub rtol: f64,
    /// Absolute tolerance applied
    pub atol: f64,
}

impl fmt::Display for ToleranceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Not equal to tolerance rtol={:e}, atol={:e} in output {}: {}/{} elements mismatch, \
             max abs deviation {}; worst at {:?}: host={} target={} (|diff|={})",
            self.rtol,
            self.atol,
            self.output,
            self.mismatched,
            self.total,
            self.max_abs_diff,
            self.index,
            self.host,
            self.target,
            self.deviation
        )
    }
}

/// Diagnostics for a TopK failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKFailure {
    /// Output slot
    pub output: usize,
    /// Row for rank-2 tensors
    pub row: Option<usize>,
    /// Indices compared
    pub k: usize,
    /// Sorted host top-k indices
    pub host: Vec<usize>,
    /// Sorted target top-k indices
    pub target: Vec<usize>,
}

impl fmt::Display for TopKFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Top-{} indices differ in output {}", self.k, self.output)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        write!(f, ": host {:?} vs target {:?}", self.host, self.target)
    }
}
