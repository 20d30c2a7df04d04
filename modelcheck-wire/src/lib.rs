//! modelcheck Wire Formats
//!
//! File formats and command lines shared by every runner that drives the
//! benchmark tool: raw input value files, raw output dumps, and the flag set
//! that ties input layers to their files.

mod command;
mod dump;

pub use command::{BenchmarkInvocation, InputBinding, sanitize_layer_name};
pub use dump::{decode_output_dump, encode_input_file, expected_dump_len};

use modelcheck_core::TensorError;
use thiserror::Error;

/// Remote file the benchmark tool writes its outputs to
pub const OUTPUT_DUMP_NAME: &str = ".outvals";

/// Name of the value file for input slot `index`
pub fn input_file_name(index: usize) -> String {
    format!(".invals{}", index)
}

/// Errors that can occur while decoding raw tensor files
#[derive(Debug, Error)]
pub enum WireError {
    #[error(
        "Output dump truncated at output {output} ('{name}'): needed {needed} bytes, got {actual}"
    )]
    Truncated {
        output: usize,
        name: String,
        needed: usize,
        actual: usize,
    },

    #[error("Output {output}: {source}")]
    Tensor {
        output: usize,
        #[source]
        source: TensorError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_file_names() {
        assert_eq!(input_file_name(0), ".invals0");
        assert_eq!(input_file_name(12), ".invals12");
    }
}
