//! Comparison Policy Resolution
//!
//! A caller asks for a metric once per comparison call; the effective policy is then
//! resolved independently for every output pair. An absent metric, or any tensor of
//! rank greater than 2, always resolves to `Strict` even when `TopK` was requested.
//! This fallback is intended: top-k index sets are only defined over vectors and rows.

use crate::CompareError;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export the canonical metric and overrides from modelcheck-core
pub use modelcheck_core::{Metric, PolicyOverrides};

/// Highest rank TopK is defined for
pub const MAX_TOP_K_RANK: usize = 2;

/// Element-wise tolerance band: `|target - host| <= atol + rtol * |host|`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Relative tolerance, scaled by the host magnitude
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-5,
        }
    }
}

impl Tolerance {
    /// Create a tolerance band
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    fn validate(&self, output: usize) -> Result<(), CompareError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if valid(self.rtol) && valid(self.atol) {
            Ok(())
        } else {
            Err(CompareError::Policy {
                output,
                message: format!(
                    "tolerances must be finite and non-negative (rtol={}, atol={})",
                    self.rtol, self.atol
                ),
            })
        }
    }
}

/// What the caller asked for: an optional metric, its `k`, and the tolerance band
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// Requested metric; `None` means Strict
    pub metric: Option<Metric>,
    /// Number of indices compared by TopK
    pub k: Option<usize>,
    /// Tolerance used whenever Strict applies
    pub tolerance: Tolerance,
}

impl ComparisonRequest {
    /// Strict comparison with the given tolerance
    pub fn strict(tolerance: Tolerance) -> Self {
        Self {
            metric: Some(Metric::Strict),
            k: None,
            tolerance,
        }
    }

    /// TopK comparison; Strict with the default tolerance covers the rank fallback
    pub fn top_k(k: usize) -> Self {
        Self {
            metric: Some(Metric::TopK),
            k: Some(k),
            tolerance: Tolerance::default(),
        }
    }

    /// Layer recipe keyword overrides on top of process defaults
    pub fn with_overrides(tolerance: Tolerance, overrides: PolicyOverrides) -> Self {
        Self {
            metric: overrides.metric,
            k: overrides.k,
            tolerance,
        }
    }

    /// Resolve the policy for one output pair of the given rank and element count
    pub fn resolve(
        &self,
        output: usize,
        rank: usize,
        num_elements: usize,
    ) -> Result<EffectivePolicy, CompareError> {
        match self.metric {
            Some(Metric::TopK) if rank <= MAX_TOP_K_RANK => {
                let k = self.k.ok_or_else(|| CompareError::Policy {
                    output,
                    message: "TopK requires k".to_string(),
                })?;
                if k == 0 || k > num_elements {
                    return Err(CompareError::Policy {
                        output,
                        message: format!(
                            "k={} must be between 1 and the element count {}",
                            k, num_elements
                        ),
                    });
                }
                Ok(EffectivePolicy::TopK { k })
            }
            _ => {
                self.tolerance.validate(output)?;
                Ok(EffectivePolicy::Strict(self.tolerance))
            }
        }
    }
}

/// Policy actually applied to one output pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectivePolicy {
    /// Element-wise tolerance band
    Strict(Tolerance),
    /// Sorted top-k index sets must match (per row for rank 2)
    TopK {
        /// Indices compared per row
        k: usize,
    },
}

impl fmt::Display for EffectivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectivePolicy::Strict(t) => write!(f, "Strict(rtol={:e}, atol={:e})", t.rtol, t.atol),
            EffectivePolicy::TopK { k } => write!(f, "TopK(k={})", k),
        }
    }
}
