//! Local Benchmark Runner
//!
//! Runs the benchmark tool on this machine with accelerator flags: the
//! `reference-accelerator` target.

use super::{FailureClass, command_from, invoke, read_output_dump, stage_inputs};
use crate::config::AcceleratorConfig;
use modelcheck_core::{ModelSignature, OutputSet, RunnerError, TargetRunner, Tensor};
use modelcheck_wire::{BenchmarkInvocation, InputBinding, OUTPUT_DUMP_NAME};
use std::path::Path;

/// Benchmark tool invoked directly, with files staged in a scratch directory
#[derive(Debug, Clone)]
pub struct LocalBenchmarkRunner {
    name: String,
    command: Vec<String>,
    flags: Vec<String>,
}

impl LocalBenchmarkRunner {
    pub fn new(
        name: impl Into<String>,
        command: Vec<String>,
        flags: Vec<String>,
    ) -> Result<Self, RunnerError> {
        let name = name.into();
        if command.is_empty() {
            return Err(RunnerError::Configuration(format!(
                "{} command is empty",
                name
            )));
        }
        Ok(Self {
            name,
            command,
            flags,
        })
    }

    /// Accelerator target runner
    pub fn accelerator(config: &AcceleratorConfig) -> Result<Self, RunnerError> {
        Self::new(
            "reference-accelerator",
            config.command.clone(),
            config.flags.clone(),
        )
    }
}

impl TargetRunner for LocalBenchmarkRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        let signature = ModelSignature::load(model)?;
        let scratch = tempfile::Builder::new()
            .prefix("modelcheck-")
            .tempdir()
            .map_err(|e| RunnerError::io("create scratch directory", e))?;

        let files = stage_inputs(scratch.path(), &signature, inputs)?;
        let bindings = signature
            .inputs
            .iter()
            .zip(inputs)
            .zip(&files)
            .map(|((spec, tensor), file)| {
                InputBinding::new(&spec.name, tensor, file.display().to_string())
            })
            .collect();

        let dump = scratch.path().join(OUTPUT_DUMP_NAME);
        let invocation =
            BenchmarkInvocation::new(model.display().to_string(), dump.display().to_string())
                .with_flags(self.flags.iter().cloned())
                .with_inputs(bindings);

        let mut command = command_from(&self.command, &self.name)?;
        command.args(invocation.to_args());
        invoke(command, FailureClass::Execution)?;

        let outputs = read_output_dump(&dump, &signature)?;
        tracing::debug!("{}: {} output(s) from {}", self.name, outputs.len(), model.display());
        Ok(outputs)
    }
}
