//! Device-Bridge Runner
//!
//! Stages the model and input value files on an attached device, runs the
//! on-device benchmark tool through `adb shell`, and pulls back the output dump.
//!
//! ```text
//! host                         device (remote_root)
//! model.tflite   --push-->     model.tflite
//! .invals{i}     --push-->     .invals{i}
//!                  shell       benchmark_model --graph=... --save_outputs_in_file=.outvals
//! .outvals       <--pull--     .outvals
//! ```
//!
//! The previous run's `.outvals` is deleted before the benchmark starts, so a tool
//! that exits cleanly without writing outputs fails the pull instead of returning
//! stale data. Push and pull failures are transfer errors; `adb root` and the
//! benchmark invocation are execution errors.

use super::{FailureClass, command_from, invoke, read_output_dump, stage_inputs};
use crate::config::DeviceConfig;
use modelcheck_core::{ModelSignature, OutputSet, RunnerError, TargetRunner, Tensor};
use modelcheck_wire::{BenchmarkInvocation, InputBinding, OUTPUT_DUMP_NAME, input_file_name};
use std::path::Path;
use std::process::Command;

/// Thin wrapper over the debug-bridge client
#[derive(Debug, Clone)]
pub struct Adb {
    command: Vec<String>,
    serial: Option<String>,
}

impl Adb {
    pub fn new(command: Vec<String>) -> Result<Self, RunnerError> {
        if command.is_empty() {
            return Err(RunnerError::Configuration(
                "device bridge command is empty".to_string(),
            ));
        }
        Ok(Self {
            command,
            serial: None,
        })
    }

    /// Address every later call to one device
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn command(&self, subcommand: &str) -> Result<Command, RunnerError> {
        let mut command = command_from(&self.command, "device bridge")?;
        if let Some(serial) = &self.serial {
            command.arg("-s").arg(serial);
        }
        command.arg(subcommand);
        Ok(command)
    }

    /// Raw `adb devices` listing
    pub fn devices(&self) -> Result<String, RunnerError> {
        let output = invoke(self.command("devices")?, FailureClass::Configuration)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn push(&self, local: &Path, remote: &str) -> Result<(), RunnerError> {
        let mut command = self.command("push")?;
        command.arg(local).arg(remote);
        invoke(command, FailureClass::Transfer).map(drop)
    }

    pub fn pull(&self, remote: &str, local: &Path) -> Result<(), RunnerError> {
        let mut command = self.command("pull")?;
        command.arg(remote).arg(local);
        invoke(command, FailureClass::Transfer).map(drop)
    }

    /// Restart the device daemon with root permissions
    pub fn root(&self) -> Result<(), RunnerError> {
        invoke(self.command("root")?, FailureClass::Execution).map(drop)
    }

    /// Block until the device is reachable again (after `root`)
    pub fn wait_for_device(&self) -> Result<(), RunnerError> {
        invoke(self.command("wait-for-device")?, FailureClass::Transfer).map(drop)
    }

    /// Delete a file on the device; a missing file is not an error
    pub fn remove(&self, remote: &str) -> Result<(), RunnerError> {
        self.shell(&["rm".to_string(), "-f".to_string(), remote.to_string()])
            .map(drop)
    }

    /// Run a command on the device, returning its stdout
    pub fn shell(&self, args: &[String]) -> Result<String, RunnerError> {
        let mut command = self.command("shell")?;
        command.args(args);
        let output = invoke(command, FailureClass::Execution)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs the on-device benchmark tool over the debug bridge
#[derive(Debug, Clone)]
pub struct DeviceBridgeRunner {
    adb: Adb,
    remote_root: String,
    benchmark: String,
    flags: Vec<String>,
    root_pending: bool,
}

impl DeviceBridgeRunner {
    /// `adb` should already carry the serial chosen by the device probe
    pub fn new(adb: Adb, config: &DeviceConfig) -> Self {
        Self {
            adb,
            remote_root: config.remote_root.trim_end_matches('/').to_string(),
            benchmark: config.benchmark.clone(),
            flags: config.flags.clone(),
            root_pending: config.adb_root,
        }
    }

    fn remote(&self, name: &str) -> String {
        format!("{}/{}", self.remote_root, name)
    }

    fn benchmark_path(&self) -> String {
        if self.benchmark.starts_with('/') {
            self.benchmark.clone()
        } else {
            self.remote(&self.benchmark)
        }
    }
}

impl TargetRunner for DeviceBridgeRunner {
    fn name(&self) -> &str {
        "mobile-device"
    }

    fn run(&mut self, model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        let signature = ModelSignature::load(model)?;
        let model_name = model
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RunnerError::Configuration(format!("model path {} has no file name", model.display()))
            })?;

        let scratch = tempfile::Builder::new()
            .prefix("modelcheck-")
            .tempdir()
            .map_err(|e| RunnerError::io("create scratch directory", e))?;
        let files = stage_inputs(scratch.path(), &signature, inputs)?;

        if self.root_pending {
            self.adb.root()?;
            self.adb.wait_for_device()?;
            self.root_pending = false;
        }

        let remote_model = self.remote(model_name);
        self.adb.push(model, &remote_model)?;

        let mut bindings = Vec::with_capacity(files.len());
        for (index, ((spec, tensor), file)) in
            signature.inputs.iter().zip(inputs).zip(&files).enumerate()
        {
            let remote_file = self.remote(&input_file_name(index));
            self.adb.push(file, &remote_file)?;
            bindings.push(InputBinding::new(&spec.name, tensor, remote_file));
        }

        let remote_dump = self.remote(OUTPUT_DUMP_NAME);
        self.adb.remove(&remote_dump)?;
        let invocation = BenchmarkInvocation::new(remote_model, remote_dump.clone())
            .with_flags(self.flags.iter().cloned())
            .with_inputs(bindings);

        let mut args = vec![self.benchmark_path()];
        args.extend(invocation.to_args());
        self.adb.shell(&args)?;

        let local_dump = scratch.path().join(OUTPUT_DUMP_NAME);
        self.adb.pull(&remote_dump, &local_dump)?;
        read_output_dump(&local_dump, &signature)
    }
}
