//! Target Runners
//!
//! Concrete [`TargetRunner`](modelcheck_core::TargetRunner) backends. The host
//! reference runs in-process; the targets drive the benchmark tool and differ only
//! in how files and the invocation reach it.
//!
//! - [`interpreter`] - in-process host reference
//! - [`local`] - accelerator, run on this machine
//! - [`bridge`] - attached device, reached over the debug bridge
//! - [`probe`] - device discovery for the bridge

mod bridge;
mod interpreter;
mod local;
mod probe;

pub use bridge::{Adb, DeviceBridgeRunner};
pub use interpreter::InterpreterRunner;
pub use local::LocalBenchmarkRunner;
pub use probe::{DeviceEntry, parse_device_list, probe_device, select_device};

use modelcheck_core::{ModelSignature, RunnerError, Tensor};
use modelcheck_wire::{encode_input_file, input_file_name};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Which error a failed command is reported as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureClass {
    Configuration,
    Transfer,
    Execution,
}

impl FailureClass {
    fn error(self, command: &str, message: String) -> RunnerError {
        match self {
            FailureClass::Configuration => {
                RunnerError::Configuration(format!("`{}`: {}", command, message))
            }
            FailureClass::Transfer => RunnerError::Transfer {
                command: command.to_string(),
                message,
            },
            FailureClass::Execution => RunnerError::Execution {
                command: command.to_string(),
                message,
            },
        }
    }
}

/// Build a `Command` from a configured program-and-arguments vector
pub(crate) fn command_from(parts: &[String], what: &str) -> Result<Command, RunnerError> {
    let (program, args) = parts
        .split_first()
        .ok_or_else(|| RunnerError::Configuration(format!("{} command is empty", what)))?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

/// Render a command line for logs and error messages
pub(crate) fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion, capturing its output.
///
/// Spawn failures and non-zero exits become errors of the given class carrying
/// the command line and whatever the process wrote to stderr (or stdout).
pub(crate) fn invoke(mut command: Command, class: FailureClass) -> Result<Output, RunnerError> {
    let line = describe(&command);
    tracing::debug!("$ {}", line);

    let output = command
        .output()
        .map_err(|e| class.error(&line, format!("failed to start: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(class.error(&line, format!("{}: {}", output.status, detail)));
    }

    Ok(output)
}

/// Check input arity against the signature and write one value file per input.
///
/// Returns the local paths in input order.
pub(crate) fn stage_inputs(
    dir: &Path,
    signature: &ModelSignature,
    inputs: &[Tensor],
) -> Result<Vec<PathBuf>, RunnerError> {
    if inputs.len() != signature.inputs.len() {
        return Err(RunnerError::InputArity {
            expected: signature.inputs.len(),
            actual: inputs.len(),
        });
    }

    let mut paths = Vec::with_capacity(inputs.len());
    for (index, (spec, tensor)) in signature.inputs.iter().zip(inputs).enumerate() {
        if spec.dtype != tensor.dtype() || spec.shape != tensor.shape() {
            tracing::warn!(
                "Input '{}' declared as {:?} {} but recipe produced {:?} {}",
                spec.name,
                spec.shape,
                spec.dtype,
                tensor.shape(),
                tensor.dtype()
            );
        }
        let path = dir.join(input_file_name(index));
        std::fs::write(&path, encode_input_file(tensor))
            .map_err(|e| RunnerError::io(format!("write {}", path.display()), e))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Read and slice an output dump written by the benchmark tool
pub(crate) fn read_output_dump(
    path: &Path,
    signature: &ModelSignature,
) -> Result<Vec<Tensor>, RunnerError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RunnerError::io(format!("read output dump {}", path.display()), e))?;
    modelcheck_wire::decode_output_dump(&bytes, &signature.outputs)
        .map_err(|e| RunnerError::Decode(Box::new(e)))
}
