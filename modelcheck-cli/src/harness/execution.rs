//! Recipe Execution
//!
//! The harness turns a recipe into a pass/fail verdict:
//!
//! ```text
//! Recipe ──prepare──▶ (model, inputs)
//!                          │
//!            ┌─────────────┴─────────────┐
//!            ▼                           ▼
//!      host runner (once)     target runner (per iteration)
//!            │                           │
//!            └──────────▶ compare ◀──────┘
//! ```
//!
//! Inputs are generated once and held fixed across iterations. The first failure
//! of any kind stops the recipe; the caller stops the run.

use crate::config::ModelCheckConfig;
use crate::runner::{Adb, DeviceBridgeRunner, InterpreterRunner, LocalBenchmarkRunner, probe_device};
use crate::target::TargetSelector;
use modelcheck_core::{Recipe, RunnerError, TargetRunner, TensorError};
use modelcheck_logic::{CompareError, ComparisonRequest, ComparisonSummary, Tolerance};
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure of a harness operation, tagged with the phase it happened in
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Harness could not be built for the selected target
    #[error("Cannot set up target '{target}': {source}")]
    Setup {
        target: TargetSelector,
        #[source]
        source: RunnerError,
    },

    #[error("Unknown recipe '{name}'. Available: {available}")]
    UnknownRecipe { name: String, available: String },

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Recipe '{recipe}' could not generate inputs: {source}")]
    Inputs {
        recipe: String,
        #[source]
        source: TensorError,
    },

    #[error("Host run failed for '{recipe}': {source}")]
    Host {
        recipe: String,
        #[source]
        source: RunnerError,
    },

    #[error("Target run failed for '{recipe}' (iteration {iteration}): {source}")]
    Target {
        recipe: String,
        iteration: u32,
        #[source]
        source: RunnerError,
    },

    #[error("Comparison failed for '{recipe}' (iteration {iteration}): {source}")]
    Compare {
        recipe: String,
        iteration: u32,
        #[source]
        source: CompareError,
    },
}

impl HarnessError {
    /// Failure class reported to the user and in the run report
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Setup { source, .. }
            | HarnessError::Host { source, .. }
            | HarnessError::Target { source, .. } => runner_error_kind(source),
            HarnessError::UnknownRecipe { .. }
            | HarnessError::Settings(_)
            | HarnessError::Inputs { .. } => "configuration",
            HarnessError::Compare { source, .. } => source.kind(),
        }
    }

    /// Comparison rounds that passed before this failure
    pub fn completed_iterations(&self) -> u32 {
        match self {
            HarnessError::Target { iteration, .. } | HarnessError::Compare { iteration, .. } => {
                iteration.saturating_sub(1)
            }
            _ => 0,
        }
    }
}

fn runner_error_kind(error: &RunnerError) -> &'static str {
    match error {
        RunnerError::Configuration(_) | RunnerError::InputArity { .. } => "configuration",
        RunnerError::Transfer { .. } => "transfer",
        RunnerError::Execution { .. } | RunnerError::Decode(_) => "execution",
        RunnerError::Model(_) => "model",
        RunnerError::Io { .. } => "io",
    }
}

/// Process-wide defaults a recipe runs under
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessSettings {
    pub models_dir: PathBuf,
    pub tolerance: Tolerance,
    /// Target run + compare rounds per recipe
    pub iteration: u32,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            tolerance: Tolerance::default(),
            iteration: 1,
        }
    }
}

impl HarnessSettings {
    pub fn from_config(config: &ModelCheckConfig) -> Self {
        Self {
            models_dir: config.paths.models_dir.clone(),
            tolerance: Tolerance::new(config.compare.rtol, config.compare.atol),
            iteration: config.compare.iteration,
        }
    }

    fn validate(&self) -> Result<(), HarnessError> {
        if self.iteration == 0 {
            return Err(HarnessError::Settings(
                "iteration must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A recipe that passed every iteration
#[derive(Debug, Clone)]
pub struct RecipeOutcome {
    pub name: String,
    pub model_path: PathBuf,
    pub iterations: u32,
    pub duration: Duration,
    /// Per-output results of the last iteration
    pub summary: ComparisonSummary,
}

/// Run one recipe on the host once and on the target `settings.iteration` times.
///
/// Recipe overrides (`metric`, `k`) are layered on top of the settings' tolerance.
pub fn execute_recipe(
    recipe: &dyn Recipe,
    host: &mut dyn TargetRunner,
    target: &mut dyn TargetRunner,
    settings: &HarnessSettings,
    rng: &mut dyn RngCore,
) -> Result<RecipeOutcome, HarnessError> {
    settings.validate()?;
    let name = recipe.name().to_string();
    let start = Instant::now();

    let prepared = recipe
        .prepare(&settings.models_dir, rng)
        .map_err(|source| HarnessError::Inputs {
            recipe: name.clone(),
            source,
        })?;
    if prepared.inputs.is_empty() {
        return Err(HarnessError::Inputs {
            recipe: name,
            source: TensorError::EmptyInputSet,
        });
    }
    let request = ComparisonRequest::with_overrides(settings.tolerance, recipe.overrides());
    let model: &Path = &prepared.model_path;
    let inputs = prepared.inputs.as_slice();

    tracing::info!(
        "{}: {} input(s), host={}, target={}",
        name,
        inputs.len(),
        host.name(),
        target.name()
    );

    let expected = host.run(model, inputs).map_err(|source| HarnessError::Host {
        recipe: name.clone(),
        source,
    })?;

    let mut summary = ComparisonSummary::default();
    for iteration in 1..=settings.iteration {
        let actual = target
            .run(model, inputs)
            .map_err(|source| HarnessError::Target {
                recipe: name.clone(),
                iteration,
                source,
            })?;
        summary = modelcheck_logic::compare_outputs(&expected, &actual, &request).map_err(
            |source| HarnessError::Compare {
                recipe: name.clone(),
                iteration,
                source,
            },
        )?;
        tracing::debug!("{}: iteration {}/{} passed", name, iteration, settings.iteration);
    }

    Ok(RecipeOutcome {
        name,
        model_path: prepared.model_path,
        iterations: settings.iteration,
        duration: start.elapsed(),
        summary,
    })
}

/// Host and target runners for one selected target
pub struct Harness {
    target: TargetSelector,
    settings: HarnessSettings,
    host: Box<dyn TargetRunner>,
    runner: Box<dyn TargetRunner>,
}

impl Harness {
    /// Build the harness for a target. The host reference is always the
    /// in-process interpreter.
    ///
    /// For `mobile-device` this probes for exactly one authorized device before
    /// returning; the chosen serial is used for every later bridge call.
    pub fn new(
        target: TargetSelector,
        config: &ModelCheckConfig,
        settings: HarnessSettings,
        serial_override: Option<&str>,
    ) -> Result<Self, HarnessError> {
        settings.validate()?;
        let setup = |source| HarnessError::Setup { target, source };

        let host = InterpreterRunner::new(&config.host);
        let runner: Box<dyn TargetRunner> = match target {
            TargetSelector::ReferenceAccelerator => {
                Box::new(LocalBenchmarkRunner::accelerator(&config.accelerator).map_err(setup)?)
            }
            TargetSelector::MobileDevice => {
                let adb = Adb::new(config.device.adb.clone()).map_err(setup)?;
                let serial = probe_device(&adb, serial_override).map_err(setup)?;
                Box::new(DeviceBridgeRunner::new(adb.with_serial(serial), &config.device))
            }
            TargetSelector::EmbeddedIos | TargetSelector::EmbeddedPi => {
                return Err(setup(RunnerError::Configuration(format!(
                    "target '{}' is not yet supported",
                    target
                ))));
            }
        };

        Ok(Self::with_runners(target, settings, Box::new(host), runner))
    }

    /// Assemble a harness from already-built runners
    pub fn with_runners(
        target: TargetSelector,
        settings: HarnessSettings,
        host: Box<dyn TargetRunner>,
        runner: Box<dyn TargetRunner>,
    ) -> Self {
        Self {
            target,
            settings,
            host,
            runner,
        }
    }

    pub fn target(&self) -> TargetSelector {
        self.target
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Run one recipe against the selected target
    pub fn execute(
        &mut self,
        recipe: &dyn Recipe,
        rng: &mut dyn RngCore,
    ) -> Result<RecipeOutcome, HarnessError> {
        execute_recipe(
            recipe,
            self.host.as_mut(),
            self.runner.as_mut(),
            &self.settings,
            rng,
        )
    }
}
