//! Integration tests for modelcheck
//!
//! These tests drive the harness end to end: recipe preparation, a host run,
//! per-iteration target runs and the comparator, with in-memory runners standing
//! in for the benchmark tool. The `interpreter` tests use the real in-process host.

use modelcheck::{
    CompareError, Harness, HarnessSettings, Metric, OutputSet, PolicyOverrides, PreparedRecipe,
    Recipe, RecipeStatus, RunReport, RunnerError, TargetRunner, TargetSelector, Tensor,
    TensorError, Tolerance, catalog, execute_recipe, generate_json_report,
};
use indicatif::ProgressBar;
use modelcheck_cli::{ExecutionPlan, build_report_meta};
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Replays canned output sets; the last one repeats once the list runs out
struct Scripted {
    name: &'static str,
    responses: Vec<OutputSet>,
    calls: Arc<Mutex<usize>>,
}

impl Scripted {
    fn new(name: &'static str, responses: Vec<OutputSet>) -> Self {
        Self {
            name,
            responses,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    fn counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }
}

impl TargetRunner for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&mut self, _model: &Path, _inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        let mut calls = self.calls.lock().unwrap();
        let response = self.responses[(*calls).min(self.responses.len() - 1)].clone();
        *calls += 1;
        Ok(response)
    }
}

/// Returns its inputs as outputs
struct Identity;

impl TargetRunner for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn run(&mut self, _model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        Ok(inputs.to_vec())
    }
}

/// Always fails the way an unplugged device does
struct Unreachable;

impl TargetRunner for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn run(&mut self, _model: &Path, _inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        Err(RunnerError::Transfer {
            command: "adb push model.tflite /data/local/tmp/model.tflite".to_string(),
            message: "error: no devices/emulators found".to_string(),
        })
    }
}

struct FixedRecipe {
    name: &'static str,
    overrides: PolicyOverrides,
}

impl Recipe for FixedRecipe {
    fn name(&self) -> &str {
        self.name
    }

    fn prepare(
        &self,
        models_dir: &Path,
        _rng: &mut dyn RngCore,
    ) -> Result<PreparedRecipe, TensorError> {
        Ok(PreparedRecipe {
            model_path: models_dir.join(format!("{}.tflite", self.name)),
            inputs: Tensor::new(vec![1], vec![0.0f32])?.into(),
        })
    }

    fn overrides(&self) -> PolicyOverrides {
        self.overrides
    }
}

fn strict(name: &'static str) -> FixedRecipe {
    FixedRecipe {
        name,
        overrides: PolicyOverrides::NONE,
    }
}

fn tensor(shape: &[usize], values: &[f32]) -> Tensor {
    Tensor::new(shape.to_vec(), values.to_vec()).unwrap()
}

fn host_2x2() -> OutputSet {
    vec![tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.0])]
}

fn logits(values: &[f32]) -> OutputSet {
    vec![tensor(&[1, values.len()], values)]
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[test]
fn test_matching_outputs_pass() {
    let mut host = Scripted::new("host", vec![host_2x2()]);
    let mut target = Scripted::new("target", vec![vec![tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.000001])]]);

    let outcome = execute_recipe(
        &strict("add"),
        &mut host,
        &mut target,
        &HarnessSettings::default(),
        &mut rng(),
    )
    .unwrap();

    assert_eq!(outcome.name, "add");
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.summary.outputs.len(), 1);
    assert!(outcome.summary.outputs[0].max_abs_diff.unwrap() < 1e-5);
}

#[test]
fn test_out_of_tolerance_element_is_located() {
    let mut host = Scripted::new("host", vec![host_2x2()]);
    let mut target = Scripted::new("target", vec![vec![tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.1])]]);

    let err = execute_recipe(
        &strict("add"),
        &mut host,
        &mut target,
        &HarnessSettings::default(),
        &mut rng(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), "tolerance");
    assert_eq!(err.completed_iterations(), 0);
    let modelcheck::HarnessError::Compare {
        source: CompareError::Tolerance(failure),
        iteration,
        ..
    } = err
    else {
        panic!("expected a tolerance failure");
    };
    assert_eq!(iteration, 1);
    assert_eq!(failure.index, vec![1, 1]);
    assert_eq!(failure.host, 4.0);
}

#[test]
fn test_looser_tolerance_accepts_drift() {
    let mut host = Scripted::new("host", vec![host_2x2()]);
    let mut target = Scripted::new("target", vec![vec![tensor(&[2, 2], &[1.0, 2.0, 3.0, 4.1])]]);
    let settings = HarnessSettings {
        tolerance: Tolerance::new(0.0, 0.2),
        ..HarnessSettings::default()
    };

    assert!(execute_recipe(&strict("add"), &mut host, &mut target, &settings, &mut rng()).is_ok());
}

#[test]
fn test_top_k_ignores_order_and_tail() {
    let classifier = FixedRecipe {
        name: "mobilenet",
        overrides: PolicyOverrides::top_k(5),
    };
    let mut host = Scripted::new(
        "host",
        vec![logits(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])],
    );
    let mut target = Scripted::new(
        "target",
        vec![logits(&[4.0, 3.0, 2.0, 1.0, 0.0, 9.0, 8.0, 7.0, 6.0, 5.0])],
    );

    let outcome = execute_recipe(
        &classifier,
        &mut host,
        &mut target,
        &HarnessSettings::default(),
        &mut rng(),
    )
    .unwrap();
    assert_eq!(outcome.summary.outputs[0].max_abs_diff, None);
}

#[test]
fn test_top_k_set_change_fails() {
    let classifier = FixedRecipe {
        name: "mobilenet",
        overrides: PolicyOverrides::top_k(5),
    };
    let mut host = Scripted::new(
        "host",
        vec![logits(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])],
    );
    let mut target = Scripted::new(
        "target",
        vec![logits(&[9.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 0.0])],
    );

    let err = execute_recipe(
        &classifier,
        &mut host,
        &mut target,
        &HarnessSettings::default(),
        &mut rng(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "topk-mismatch");
    let modelcheck::HarnessError::Compare {
        source: CompareError::TopKMismatch(failure),
        ..
    } = err
    else {
        panic!("expected a top-k failure");
    };
    assert_eq!(failure.row, Some(0));
    assert_eq!(failure.host, vec![5, 6, 7, 8, 9]);
    assert_eq!(failure.target, vec![0, 5, 6, 7, 8]);
}

#[test]
fn test_shape_checked_before_values() {
    let mut host = Scripted::new("host", vec![host_2x2()]);
    // Same values, flattened
    let mut target = Scripted::new("target", vec![vec![tensor(&[4], &[1.0, 2.0, 3.0, 4.0])]]);

    let err = execute_recipe(
        &strict("reshape"),
        &mut host,
        &mut target,
        &HarnessSettings::default(),
        &mut rng(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "shape-mismatch");
}

#[test]
fn test_missing_output_is_shape_mismatch() {
    let mut host = Scripted::new("host", vec![vec![tensor(&[2], &[1.0, 2.0]), tensor(&[2], &[3.0, 4.0])]]);
    let mut target = Scripted::new("target", vec![vec![tensor(&[2], &[1.0, 2.0])]]);

    let err = execute_recipe(
        &strict("split"),
        &mut host,
        &mut target,
        &HarnessSettings::default(),
        &mut rng(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "shape-mismatch");
    assert!(err.to_string().contains("host produced 2 output(s), target produced 1"));
}

#[test]
fn test_run_stops_at_failing_iteration() {
    let good = host_2x2();
    let bad = vec![tensor(&[2, 2], &[1.0, 2.0, 3.5, 4.0])];
    let host = Scripted::new("host", vec![good.clone()]);
    let target = Scripted::new("target", vec![good.clone(), good, bad]);
    let host_calls = host.counter();
    let target_calls = target.counter();

    let settings = HarnessSettings {
        iteration: 5,
        ..HarnessSettings::default()
    };
    let mut harness = Harness::with_runners(
        TargetSelector::ReferenceAccelerator,
        settings,
        Box::new(host),
        Box::new(target),
    );

    let err = harness.execute(&strict("pad"), &mut rng()).unwrap_err();
    assert_eq!(err.kind(), "tolerance");
    assert_eq!(err.completed_iterations(), 2);
    assert_eq!(*host_calls.lock().unwrap(), 1);
    assert_eq!(*target_calls.lock().unwrap(), 3);
}

#[test]
fn test_target_failure_is_not_retried() {
    let mut harness = Harness::with_runners(
        TargetSelector::MobileDevice,
        HarnessSettings {
            iteration: 3,
            ..HarnessSettings::default()
        },
        Box::new(Identity),
        Box::new(Unreachable),
    );

    let err = harness.execute(&strict("relu"), &mut rng()).unwrap_err();
    assert_eq!(err.kind(), "transfer");
    assert_eq!(err.completed_iterations(), 0);
    assert!(err.to_string().contains("iteration 1"));
}

#[test]
fn test_catalog_recipes_run_through_harness() {
    let registry = catalog();
    let mut harness = Harness::with_runners(
        TargetSelector::ReferenceAccelerator,
        HarnessSettings {
            models_dir: PathBuf::from("/opt/models"),
            iteration: 2,
            ..HarnessSettings::default()
        },
        Box::new(Identity),
        Box::new(Identity),
    );

    for name in ["add", "mul", "transpose", "unpack_int8"] {
        let def = registry.get(name).unwrap();
        let outcome = harness.execute(def, &mut rng()).unwrap();
        assert_eq!(outcome.model_path, Path::new("/opt/models").join(def.model_file));
        assert_eq!(outcome.summary.outputs.len(), def.inputs.len());
        assert_eq!(outcome.summary.outputs[0].max_abs_diff, Some(0.0));
    }
}

#[test]
fn test_catalog_classifier_policy_reaches_comparator() {
    let def = catalog().get("mobilebert").unwrap();
    assert_eq!(def.overrides().metric, Some(Metric::TopK));

    // Rank 2 (1x384) inputs echoed back: TopK applies per output
    let mut harness = Harness::with_runners(
        TargetSelector::ReferenceAccelerator,
        HarnessSettings::default(),
        Box::new(Identity),
        Box::new(Identity),
    );
    let outcome = harness.execute(def, &mut rng()).unwrap();
    assert_eq!(outcome.summary.outputs.len(), 3);
    assert!(
        outcome
            .summary
            .outputs
            .iter()
            .all(|o| o.policy.to_string().starts_with("TopK"))
    );
}

/// Echoes inputs until asked to run one particular model file
struct FailsOn {
    model_file: &'static str,
    seen: Arc<Mutex<Vec<PathBuf>>>,
}

impl TargetRunner for FailsOn {
    fn name(&self) -> &str {
        "fails-on"
    }

    fn run(&mut self, model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        self.seen.lock().unwrap().push(model.to_path_buf());
        if model.ends_with(self.model_file) {
            return Unreachable.run(model, inputs);
        }
        Ok(inputs.to_vec())
    }
}

#[test]
fn test_report_for_stopped_run() {
    let registry = catalog();
    let plan = ExecutionPlan {
        recipes: ["add", "cast", "mul", "relu"]
            .iter()
            .map(|name| registry.get(name).unwrap())
            .collect(),
    };
    let seen = Arc::new(Mutex::new(Vec::new()));
    let settings = HarnessSettings::default();
    let mut harness = Harness::with_runners(
        TargetSelector::ReferenceAccelerator,
        settings.clone(),
        Box::new(Identity),
        Box::new(FailsOn {
            model_file: "cast_int8_quant.tflite",
            seen: Arc::clone(&seen),
        }),
    );

    let meta = build_report_meta(TargetSelector::ReferenceAccelerator, &settings, Some(42));
    let run = harness.run_plan(&plan, meta, &mut rng(), &ProgressBar::hidden(), false);
    let report = &run.report;

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[1].status, RecipeStatus::Failed);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.not_run, 2);
    assert!(!report.summary.all_passed());
    assert!(run.status().unwrap_err().to_string().contains("'cast'"));

    let json = generate_json_report(report).unwrap();
    assert!(json.contains("\"status\": \"failed\""));
    assert!(json.contains("\"kind\": \"transfer\""));
    assert!(json.contains("\"target\": \"reference-accelerator\""));
}

mod interpreter {
    use super::*;
    use modelcheck::{DType, InterpreterRunner};
    use modelcheck_cli::HostConfig;
    use modelcheck_core::testing::tflite_add_model;

    /// Feeds `[1, 2, 3, 4]` and `[0.5; 4]` to the model
    struct AddRecipe;

    impl Recipe for AddRecipe {
        fn name(&self) -> &str {
            "add"
        }

        fn prepare(
            &self,
            models_dir: &Path,
            _rng: &mut dyn RngCore,
        ) -> Result<PreparedRecipe, TensorError> {
            Ok(PreparedRecipe {
                model_path: models_dir.join("add.tflite"),
                inputs: vec![
                    Tensor::new(vec![1, 4], vec![1.0f32, 2.0, 3.0, 4.0])?,
                    Tensor::new(vec![1, 4], vec![0.5f32; 4])?,
                ]
                .into(),
            })
        }
    }

    fn harness(dir: &Path, target: Scripted) -> Harness {
        std::fs::write(dir.join("add.tflite"), tflite_add_model(&[1, 4], DType::F32)).unwrap();
        let settings = HarnessSettings {
            models_dir: dir.to_path_buf(),
            ..HarnessSettings::default()
        };
        Harness::with_runners(
            TargetSelector::ReferenceAccelerator,
            settings,
            Box::new(InterpreterRunner::new(&HostConfig::default())),
            Box::new(target),
        )
    }

    #[test]
    fn test_host_reference_runs_in_process() {
        let dir = tempfile::tempdir().unwrap();
        let target = Scripted::new("target", vec![vec![tensor(&[1, 4], &[1.5, 2.5, 3.5, 4.5])]]);
        let mut harness = harness(dir.path(), target);

        let outcome = harness.execute(&AddRecipe, &mut rng()).unwrap();
        assert_eq!(outcome.summary.outputs.len(), 1);
        assert_eq!(outcome.summary.outputs[0].shape, vec![1, 4]);
    }

    #[test]
    fn test_target_disagreeing_with_interpreter_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = Scripted::new("target", vec![vec![tensor(&[1, 4], &[0.0; 4])]]);
        let mut harness = harness(dir.path(), target);

        let err = harness.execute(&AddRecipe, &mut rng()).unwrap_err();
        assert_eq!(err.kind(), "tolerance");
    }
}

#[cfg(unix)]
mod benchmark_tool {
    use super::*;
    use modelcheck::DType;
    use modelcheck_cli::LocalBenchmarkRunner;
    use modelcheck_core::testing::{TensorFixture, tflite_model};

    /// Copies every input value file to the output dump, in order
    const CONCAT_TOOL: &str = r#"
out=""; vals=""
for arg in "$@"; do
  case "$arg" in
    --save_outputs_in_file=*) out="${arg#*=}" ;;
    --input_layer_value_files=*) vals="${arg#*=}" ;;
  esac
done
: > "$out"
IFS=','
for pair in $vals; do
  cat "${pair#*:}" >> "$out"
done
"#;

    struct PairRecipe;

    impl Recipe for PairRecipe {
        fn name(&self) -> &str {
            "concat"
        }

        fn prepare(
            &self,
            models_dir: &Path,
            _rng: &mut dyn RngCore,
        ) -> Result<PreparedRecipe, TensorError> {
            Ok(PreparedRecipe {
                model_path: models_dir.join("concat.tflite"),
                inputs: vec![
                    Tensor::new(vec![2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?,
                    Tensor::new(vec![3], vec![7i8, -8, 9])?,
                ]
                .into(),
            })
        }
    }

    fn tool(dir: &Path, name: &str, flags: Vec<String>) -> LocalBenchmarkRunner {
        let script = dir.join("benchmark_model.sh");
        std::fs::write(&script, CONCAT_TOOL).unwrap();
        LocalBenchmarkRunner::new(
            name,
            vec!["sh".to_string(), script.display().to_string()],
            flags,
        )
        .unwrap()
    }

    #[test]
    fn test_local_tool_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let model = tflite_model(
            &[
                TensorFixture::new("serving_default_a:0", &[2, 2], DType::F32),
                TensorFixture::new("serving_default_b:0", &[3], DType::I8),
            ],
            &[
                TensorFixture::new("a_out", &[2, 2], DType::F32),
                TensorFixture::new("b_out", &[3], DType::I8),
            ],
        );
        std::fs::write(dir.path().join("concat.tflite"), model).unwrap();

        let settings = HarnessSettings {
            models_dir: dir.path().to_path_buf(),
            iteration: 2,
            ..HarnessSettings::default()
        };
        let host = tool(dir.path(), "host", vec![]);
        let target = tool(
            dir.path(),
            "reference-accelerator",
            vec!["--use_npu=true".to_string()],
        );
        let mut harness = Harness::with_runners(
            TargetSelector::ReferenceAccelerator,
            settings,
            Box::new(host),
            Box::new(target),
        );

        let outcome = harness.execute(&PairRecipe, &mut rng()).unwrap();
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.summary.outputs.len(), 2);
        assert_eq!(outcome.summary.outputs[1].shape, vec![3]);
    }
}
