//! Benchmark Command Lines
//!
//! Every runner drives the same benchmark tool; only the transport differs. This
//! module composes its flags so the local and device-bridge runners agree exactly.

use modelcheck_core::Tensor;
use std::fmt;

/// One input layer bound to a value file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    /// Layer name as the tool expects it (see [`sanitize_layer_name`])
    pub layer: String,
    pub shape: Vec<usize>,
    /// Path of the value file as seen by the tool
    pub value_file: String,
}

impl InputBinding {
    /// Bind an input tensor of the named layer to a value file path
    pub fn new(layer: &str, tensor: &Tensor, value_file: impl Into<String>) -> Self {
        Self {
            layer: sanitize_layer_name(layer),
            shape: tensor.shape().to_vec(),
            value_file: value_file.into(),
        }
    }
}

/// A single-shot benchmark invocation that saves its outputs to a file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BenchmarkInvocation {
    pub graph: String,
    pub inputs: Vec<InputBinding>,
    pub output_file: String,
    /// Backend-specific flags, inserted after the fixed run-count flags
    pub extra_flags: Vec<String>,
}

impl BenchmarkInvocation {
    pub fn new(graph: impl Into<String>, output_file: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            output_file: output_file.into(),
            ..Default::default()
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<InputBinding>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Arguments to pass after the benchmark executable
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--graph={}", self.graph),
            "--num_runs=1".to_string(),
            "--min_secs=0".to_string(),
            "--max_secs=0".to_string(),
        ];
        args.extend(self.extra_flags.iter().cloned());

        if !self.inputs.is_empty() {
            let layers: Vec<&str> = self.inputs.iter().map(|b| b.layer.as_str()).collect();
            let shapes: Vec<String> = self.inputs.iter().map(|b| join_shape(&b.shape)).collect();
            let files: Vec<String> = self
                .inputs
                .iter()
                .map(|b| format!("{}:{}", b.layer, b.value_file))
                .collect();
            args.push(format!("--input_layer={}", layers.join(",")));
            args.push(format!("--input_layer_shape={}", shapes.join(":")));
            args.push(format!("--input_layer_value_files={}", files.join(",")));
        }

        args.push(format!("--save_outputs_in_file={}", self.output_file));
        args
    }
}

impl fmt::Display for BenchmarkInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}

/// The value-file flag uses `:` as a separator, so layer names cannot contain it
pub fn sanitize_layer_name(name: &str) -> String {
    name.replace(':', "_")
}

fn join_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
