//! Target Runner Interface
//!
//! Every execution backend (host reference, accelerator, device bridge) sits behind
//! [`TargetRunner`]. The comparator and harness never look past this trait.

use crate::{ModelError, OutputSet, Tensor};
use std::path::Path;
use thiserror::Error;

/// Failures raised by a runner
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Bad or missing device, unsupported target, ambiguous device selection
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Staging or retrieving files failed
    #[error("Transfer failed: `{command}`: {message}")]
    Transfer { command: String, message: String },

    /// The inference invocation itself failed
    #[error("Execution failed: `{command}`: {message}")]
    Execution { command: String, message: String },

    #[error("Model expects {expected} input(s), recipe produced {actual}")]
    InputArity { expected: usize, actual: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The runner's raw output could not be turned into tensors
    #[error("Failed to decode runner output: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RunnerError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Executes a compiled model on one backend
pub trait TargetRunner {
    /// Short backend name used in logs and reports
    fn name(&self) -> &str;

    /// Run inference; outputs are aligned by position with the model's output slots
    fn run(&mut self, model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError>;
}

impl<R: TargetRunner + ?Sized> TargetRunner for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&mut self, model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        (**self).run(model, inputs)
    }
}
