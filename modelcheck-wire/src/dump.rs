//! Raw Tensor Files
//!
//! Input value files and output dumps carry elements as raw little-endian bytes,
//! row-major, with no header. An output dump is the concatenation of every output
//! in declared order:
//!
//! ```text
//! +------------------+------------------+-----+
//! | output 0 bytes   | output 1 bytes   | ... |
//! +------------------+------------------+-----+
//! ```
//!
//! Each slice is `product(shape) * byte_width` bytes long.

use crate::WireError;
use modelcheck_core::{OutputSet, Tensor, TensorSpec};

/// Encode one input tensor as the contents of a value file
pub fn encode_input_file(tensor: &Tensor) -> Vec<u8> {
    tensor.to_le_bytes()
}

/// Total dump size implied by a list of output slots
pub fn expected_dump_len(outputs: &[TensorSpec]) -> usize {
    outputs.iter().map(TensorSpec::byte_len).sum()
}

/// Slice a raw output dump into tensors using the declared output slots
pub fn decode_output_dump(bytes: &[u8], outputs: &[TensorSpec]) -> Result<OutputSet, WireError> {
    let mut offset = 0usize;
    let mut tensors = Vec::with_capacity(outputs.len());

    for (slot, spec) in outputs.iter().enumerate() {
        let len = spec.byte_len();
        let end = offset + len;
        if end > bytes.len() {
            return Err(WireError::Truncated {
                output: slot,
                name: spec.name.clone(),
                needed: end,
                actual: bytes.len(),
            });
        }
        let tensor = Tensor::from_le_bytes(spec.dtype, spec.shape.clone(), &bytes[offset..end])
            .map_err(|source| WireError::Tensor {
                output: slot,
                source,
            })?;
        tensors.push(tensor);
        offset = end;
    }

    if offset < bytes.len() {
        tracing::warn!(
            "Output dump has {} trailing byte(s) after {} declared output(s); ignoring",
            bytes.len() - offset,
            outputs.len()
        );
    }

    Ok(tensors)
}
