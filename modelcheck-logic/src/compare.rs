//! Output Comparison
//!
//! Decides whether a target's output set agrees with the host reference.
//! Host and target are not interchangeable: the host is the desired value and its
//! magnitude scales the relative tolerance.
//!
//! Structural checks (output count, shapes) run over the whole set before any
//! numeric comparison, so a shape mismatch is never reported as a value mismatch.

use crate::error::{ShapeMismatch, ToleranceFailure, TopKFailure};
use crate::policy::{ComparisonRequest, EffectivePolicy, Tolerance};
use crate::CompareError;
use modelcheck_core::Tensor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome for one output pair that passed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputComparison {
    /// Output slot
    pub output: usize,
    /// Shape shared by host and target
    pub shape: Vec<usize>,
    /// Policy that was applied
    pub policy: EffectivePolicy,
    /// Largest absolute deviation (Strict only)
    pub max_abs_diff: Option<f64>,
}

/// Per-output results of a passing comparison
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// One entry per output slot, in order
    pub outputs: Vec<OutputComparison>,
}

/// Compare host and target output sets under the requested policy
pub fn compare_outputs(
    host: &[Tensor],
    target: &[Tensor],
    request: &ComparisonRequest,
) -> Result<ComparisonSummary, CompareError> {
    check_comparable(host, target)?;

    let mut summary = ComparisonSummary::default();
    for (output, (h, t)) in host.iter().zip(target).enumerate() {
        let policy = request.resolve(output, h.rank(), h.num_elements())?;
        let max_abs_diff = match policy {
            EffectivePolicy::Strict(tolerance) => Some(check_strict(output, h, t, tolerance)?),
            EffectivePolicy::TopK { k } => {
                check_top_k(output, h, t, k)?;
                None
            }
        };
        summary.outputs.push(OutputComparison {
            output,
            shape: h.shape().to_vec(),
            policy,
            max_abs_diff,
        });
    }
    Ok(summary)
}

/// Output counts and per-slot shapes must match exactly
pub fn check_comparable(host: &[Tensor], target: &[Tensor]) -> Result<(), CompareError> {
    if host.len() != target.len() {
        return Err(CompareError::ShapeMismatch(ShapeMismatch::OutputCount {
            host: host.len(),
            target: target.len(),
        }));
    }
    for (output, (h, t)) in host.iter().zip(target).enumerate() {
        if h.shape() != t.shape() {
            return Err(CompareError::ShapeMismatch(ShapeMismatch::Shape {
                output,
                host: h.shape().to_vec(),
                target: t.shape().to_vec(),
            }));
        }
    }
    Ok(())
}

/// Deviation of one element and whether it lies within the band.
///
/// NaN matches NaN and an infinity matches the same infinity; any other placement
/// of non-finite values is a violation with infinite deviation.
fn element_deviation(desired: f64, actual: f64, tolerance: Tolerance) -> (bool, f64) {
    if desired.is_nan() || actual.is_nan() {
        let both = desired.is_nan() && actual.is_nan();
        return (both, if both { 0.0 } else { f64::INFINITY });
    }
    if desired.is_infinite() || actual.is_infinite() {
        let same = desired == actual;
        return (same, if same { 0.0 } else { f64::INFINITY });
    }
    let deviation = (actual - desired).abs();
    (deviation <= tolerance.atol + tolerance.rtol * desired.abs(), deviation)
}

/// Strict check; returns the largest absolute deviation on success
fn check_strict(
    output: usize,
    host: &Tensor,
    target: &Tensor,
    tolerance: Tolerance,
) -> Result<f64, CompareError> {
    let total = host.num_elements();
    let mut max_abs_diff = 0.0f64;
    let mut mismatched = 0usize;
    // (flat index, deviation) of the worst violating element
    let mut worst: Option<(usize, f64)> = None;

    for i in 0..total {
        let (within, deviation) =
            element_deviation(host.get_f64(i), target.get_f64(i), tolerance);
        max_abs_diff = max_abs_diff.max(deviation);
        if !within {
            mismatched += 1;
            if worst.is_none_or(|(_, d)| deviation > d) {
                worst = Some((i, deviation));
            }
        }
    }

    match worst {
        None => Ok(max_abs_diff),
        Some((flat, deviation)) => Err(CompareError::Tolerance(Box::new(ToleranceFailure {
            output,
            index: host.unravel_index(flat),
            host: host.get_f64(flat),
            target: target.get_f64(flat),
            deviation,
            max_abs_diff,
            mismatched,
            total,
            rtol: tolerance.rtol,
            atol: tolerance.atol,
        }))),
    }
}

/// Descending order with NaN ranked below every number
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Indices of the `k` largest values, sorted ascending.
///
/// Ties keep their original order (stable sort); callers only compare the set,
/// so the result is canonicalized by sorting before it is returned.
pub fn top_k_indices(values: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| descending(values[a], values[b]));
    order.truncate(k);
    order.sort_unstable();
    order
}

fn check_top_k(output: usize, host: &Tensor, target: &Tensor, k: usize) -> Result<(), CompareError> {
    let host_values = host.to_f64_vec();
    let target_values = target.to_f64_vec();

    // Rank 2 compares row by row; anything lower is a single row
    let (rows, row_len) = match host.shape() {
        [rows, cols] => (*rows, *cols),
        _ => (1, host_values.len()),
    };
    let per_row = k.min(row_len);

    for row in 0..rows {
        let span = row * row_len..(row + 1) * row_len;
        let h = top_k_indices(&host_values[span.clone()], per_row);
        let t = top_k_indices(&target_values[span], per_row);
        if h != t {
            return Err(CompareError::TopKMismatch(TopKFailure {
                output,
                row: (host.rank() == 2).then_some(row),
                k: per_row,
                host: h,
                target: t,
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Metric;
    use proptest::prelude::*;

    fn f32_tensor(shape: &[usize], values: &[f32]) -> Tensor {
        Tensor::new(shape.to_vec(), values.to_vec()).unwrap()
    }

    fn strict_default() -> ComparisonRequest {
        ComparisonRequest::strict(Tolerance::new(1e-5, 1e-5))
    }

    #[test]
    fn test_identical_2x2_passes() {
        let host = vec![f32_tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.0])];
        let target = host.clone();
        let summary = compare_outputs(&host, &target, &strict_default()).unwrap();
        assert_eq!(summary.outputs.len(), 1);
        assert_eq!(summary.outputs[0].max_abs_diff, Some(0.0));
    }

    #[test]
    fn test_perturbed_element_reports_location() {
        let host = vec![f32_tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.0])];
        let target = vec![f32_tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.1])];
        let err = compare_outputs(&host, &target, &strict_default()).unwrap_err();
        let CompareError::Tolerance(failure) = err else {
            panic!("expected tolerance failure, got {err:?}");
        };
        assert_eq!(failure.output, 0);
        assert_eq!(failure.index, vec![1, 1]);
        assert_eq!(failure.mismatched, 1);
        assert!((failure.deviation - 0.1).abs() < 1e-5);
        assert!((failure.max_abs_diff - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_host_magnitude_scales_tolerance() {
        // |100 - 101| = 1 <= 0 + 0.01 * 100, but with the roles swapped
        // the band is 0.01 * 1 = 0.01.
        let request = ComparisonRequest::strict(Tolerance::new(0.01, 0.0));
        let big = vec![f32_tensor(&[1], &[100.0])];
        let off = vec![f32_tensor(&[1], &[101.0])];
        let small = vec![f32_tensor(&[1], &[1.0])];
        let near = vec![f32_tensor(&[1], &[1.5])];
        assert!(compare_outputs(&big, &off, &request).is_ok());
        assert!(compare_outputs(&small, &near, &request).is_err());
        assert!(compare_outputs(&near, &small, &request).is_err());
    }

    #[test]
    fn test_nan_and_infinity_placement() {
        let request = strict_default();
        let a = vec![f32_tensor(&[3], &[f32::NAN, f32::INFINITY, 1.0])];
        assert!(compare_outputs(&a, &a.clone(), &request).is_ok());

        let b = vec![f32_tensor(&[3], &[0.0, f32::INFINITY, 1.0])];
        let err = compare_outputs(&a, &b, &request).unwrap_err();
        assert!(matches!(err, CompareError::Tolerance(ref f) if f.index == vec![0]));

        let c = vec![f32_tensor(&[3], &[f32::NAN, f32::NEG_INFINITY, 1.0])];
        assert!(compare_outputs(&a, &c, &request).is_err());
    }

    #[test]
    fn test_output_count_mismatch() {
        let host = vec![f32_tensor(&[1], &[1.0]), f32_tensor(&[1], &[2.0])];
        let target = vec![f32_tensor(&[1], &[1.0])];
        let err = compare_outputs(&host, &target, &strict_default()).unwrap_err();
        assert_eq!(
            err,
            CompareError::ShapeMismatch(ShapeMismatch::OutputCount { host: 2, target: 1 })
        );
        assert_eq!(err.kind(), "shape-mismatch");
    }

    #[test]
    fn test_shape_checked_before_values() {
        // Output 0 differs in value, output 1 in shape: the shape error wins
        let host = vec![f32_tensor(&[2], &[1.0, 2.0]), f32_tensor(&[2, 2], &[0.0; 4])];
        let target = vec![f32_tensor(&[2], &[9.0, 9.0]), f32_tensor(&[4], &[0.0; 4])];
        let err = compare_outputs(&host, &target, &strict_default()).unwrap_err();
        assert!(matches!(
            err,
            CompareError::ShapeMismatch(ShapeMismatch::Shape { output: 1, .. })
        ));
    }

    #[test]
    fn test_top_k_scenario() {
        let host = vec![f32_tensor(&[3], &[0.1, 0.9, 0.5])];
        let request = ComparisonRequest::top_k(1);

        let close = vec![f32_tensor(&[3], &[0.2, 0.85, 0.4])];
        let summary = compare_outputs(&host, &close, &request).unwrap();
        assert_eq!(summary.outputs[0].policy, EffectivePolicy::TopK { k: 1 });
        assert_eq!(summary.outputs[0].max_abs_diff, None);

        let flipped = vec![f32_tensor(&[3], &[0.95, 0.2, 0.4])];
        let err = compare_outputs(&host, &flipped, &request).unwrap_err();
        assert_eq!(
            err,
            CompareError::TopKMismatch(TopKFailure {
                output: 0,
                row: None,
                k: 1,
                host: vec![1],
                target: vec![0],
            })
        );
    }

    #[test]
    fn test_top_k_ignores_order_within_set() {
        let host = vec![f32_tensor(&[4], &[0.9, 0.8, 0.1, 0.0])];
        let target = vec![f32_tensor(&[4], &[0.8, 0.9, 0.0, 0.1])];
        assert!(compare_outputs(&host, &target, &ComparisonRequest::top_k(2)).is_ok());
    }

    #[test]
    fn test_top_k_per_row() {
        let host = vec![f32_tensor(&[2, 3], &[0.0, 1.0, 2.0, 5.0, 4.0, 3.0])];
        let good = vec![f32_tensor(&[2, 3], &[0.0, 1.5, 2.5, 6.0, 1.0, 0.0])];
        assert!(compare_outputs(&host, &good, &ComparisonRequest::top_k(1)).is_ok());

        let bad = vec![f32_tensor(&[2, 3], &[0.0, 1.5, 2.5, 0.0, 6.0, 0.0])];
        let err = compare_outputs(&host, &bad, &ComparisonRequest::top_k(1)).unwrap_err();
        assert!(matches!(
            err,
            CompareError::TopKMismatch(TopKFailure { row: Some(1), .. })
        ));
    }

    #[test]
    fn test_top_k_k_exceeds_elements() {
        let host = vec![f32_tensor(&[3], &[0.1, 0.2, 0.3])];
        let err = compare_outputs(&host, &host.clone(), &ComparisonRequest::top_k(4)).unwrap_err();
        assert_eq!(err.kind(), "policy");
    }

    #[test]
    fn test_top_k_nan_ranks_last() {
        assert_eq!(top_k_indices(&[f64::NAN, 1.0, 2.0], 2), vec![1, 2]);
    }

    #[test]
    fn test_rank_three_top_k_matches_strict() {
        let host = vec![f32_tensor(&[1, 2, 2], &[0.1, 0.9, 0.5, 0.3])];
        let same_rank_order = vec![f32_tensor(&[1, 2, 2], &[0.2, 0.8, 0.4, 0.3])];
        let top_k = ComparisonRequest {
            metric: Some(Metric::TopK),
            k: Some(1),
            tolerance: Tolerance::new(1e-5, 1e-5),
        };
        let strict = ComparisonRequest::strict(Tolerance::new(1e-5, 1e-5));
        assert_eq!(
            compare_outputs(&host, &same_rank_order, &top_k),
            compare_outputs(&host, &same_rank_order, &strict)
        );
        assert!(compare_outputs(&host, &same_rank_order, &top_k).is_err());
    }

    #[test]
    fn test_fallback_is_per_output() {
        // Output 0 is rank 3 and falls back; output 1 is rank 1 and still uses TopK
        let host = vec![
            f32_tensor(&[1, 1, 2], &[1.0, 2.0]),
            f32_tensor(&[3], &[0.1, 0.9, 0.5]),
        ];
        let target = vec![
            f32_tensor(&[1, 1, 2], &[1.0, 2.0]),
            f32_tensor(&[3], &[0.2, 0.85, 0.4]),
        ];
        let summary = compare_outputs(&host, &target, &ComparisonRequest::top_k(1)).unwrap();
        assert!(matches!(summary.outputs[0].policy, EffectivePolicy::Strict(_)));
        assert_eq!(summary.outputs[1].policy, EffectivePolicy::TopK { k: 1 });
    }

    #[test]
    fn test_integer_outputs_compare_exactly_within_atol() {
        let host = vec![Tensor::new(vec![3], vec![1i8, -2, 3]).unwrap()];
        let target = vec![Tensor::new(vec![3], vec![1i8, -2, 4]).unwrap()];
        let err = compare_outputs(&host, &target, &strict_default()).unwrap_err();
        assert!(matches!(err, CompareError::Tolerance(ref f) if f.index == vec![2]));
    }

    fn shape_and_values() -> impl Strategy<Value = (Vec<usize>, Vec<f32>)> {
        prop::collection::vec(1usize..4, 0..4).prop_flat_map(|shape| {
            let n = shape.iter().product::<usize>();
            (Just(shape), prop::collection::vec(-1e3f32..1e3, n))
        })
    }

    /// Distinct values, shuffled, with a valid k
    fn distinct_with_k() -> impl Strategy<Value = (Vec<i32>, usize)> {
        prop::collection::btree_set(-1000i32..1000, 2..40)
            .prop_flat_map(|set| {
                let values: Vec<i32> = set.into_iter().collect();
                let len = values.len();
                (Just(values).prop_shuffle(), 1..=len)
            })
    }

    proptest! {
        #[test]
        fn prop_strict_self_comparison_passes(
            (shape, values) in shape_and_values(),
            rtol in 0.0f64..1.0,
            atol in 0.0f64..1.0,
        ) {
            let t = vec![Tensor::new(shape, values).unwrap()];
            let request = ComparisonRequest::strict(Tolerance::new(rtol, atol));
            prop_assert!(compare_outputs(&t, &t.clone(), &request).is_ok());
        }

        #[test]
        fn prop_strict_reports_violating_element(
            (shape, values) in shape_and_values(),
            pick in any::<prop::sample::Index>(),
            bump in 1.0f32..100.0,
        ) {
            let flat = pick.index(values.len());
            let mut perturbed = values.clone();
            perturbed[flat] += values[flat].abs() + bump;
            let host = vec![Tensor::new(shape.clone(), values).unwrap()];
            let target = vec![Tensor::new(shape, perturbed).unwrap()];
            let err = compare_outputs(&host, &target, &strict_default()).unwrap_err();
            match err {
                CompareError::Tolerance(f) => {
                    prop_assert_eq!(f.mismatched, 1);
                    prop_assert_eq!(f.index, host[0].unravel_index(flat));
                }
                other => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        #[test]
        fn prop_top_k_invariant_to_non_top_k_permutation(
            (values, k) in distinct_with_k(),
            seed in any::<u64>(),
        ) {
            let as_f32: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            let top = top_k_indices(&as_f64, k);

            // Permute everything outside the top-k set among its own positions
            let rest: Vec<usize> = (0..values.len()).filter(|i| !top.contains(i)).collect();
            let mut rotated = rest.clone();
            if !rotated.is_empty() {
                let shift = (seed as usize) % rotated.len();
                rotated.rotate_left(shift);
            }
            let mut permuted = as_f32.clone();
            for (&dst, &src) in rest.iter().zip(&rotated) {
                permuted[dst] = as_f32[src];
            }

            let n = values.len();
            let host = vec![Tensor::new(vec![n], as_f32).unwrap()];
            let target = vec![Tensor::new(vec![n], permuted).unwrap()];
            prop_assert!(compare_outputs(&host, &target, &ComparisonRequest::top_k(k)).is_ok());
        }

        #[test]
        fn prop_top_k_full_k_always_passes_on_equal_tensors(
            values in prop::collection::vec(prop_oneof![Just(0.5f32), Just(1.0f32), -1.0f32..1.0], 1..30),
        ) {
            let n = values.len();
            let t = vec![Tensor::new(vec![n], values).unwrap()];
            prop_assert!(compare_outputs(&t, &t.clone(), &ComparisonRequest::top_k(n)).is_ok());
        }
    }
}
