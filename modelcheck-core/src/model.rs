//! Model Signatures
//!
//! Reads the input and output slots of a compiled TFLite model through
//! `tract-tflite`'s flatbuffer bindings. Runners use the signature to name input
//! layers on the benchmark command line and to slice the raw output dump into tensors.

use crate::DType;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tract_core::prelude::Framework;
use tract_tflite::tflite;

/// TFLite flatbuffer file identifier
pub const TFLITE_IDENTIFIER: &[u8; 4] = b"TFL3";

/// Errors raised while reading a model file
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a TFLite model: expected file identifier {expected:?}, found {found:?}")]
    BadIdentifier { expected: String, found: String },

    #[error("Malformed model flatbuffer: {0}")]
    Malformed(String),

    #[error("Model has no subgraph")]
    NoSubgraph,

    #[error("Subgraph references tensor {index} but only {count} tensors exist")]
    TensorIndex { index: i32, count: usize },

    #[error("Tensor '{tensor}' has unsupported element type code {code}")]
    UnsupportedType { tensor: String, code: u8 },

    #[error("Tensor '{tensor}' has non-concrete shape {shape:?}")]
    DynamicShape { tensor: String, shape: Vec<i32> },
}

/// Name, shape and element type of one model input or output slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl TensorSpec {
    /// Number of elements described by the shape
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Size in bytes of the raw tensor
    pub fn byte_len(&self) -> usize {
        self.num_elements() * self.dtype.byte_width()
    }
}

/// Declared input and output slots of a model's primary subgraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSignature {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ModelSignature {
    /// Read the signature from a model file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse the signature from an in-memory TFLite flatbuffer
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ModelError> {
        if buf.len() < 8 {
            return Err(ModelError::Malformed(format!(
                "{} byte(s) is too short for a model header",
                buf.len()
            )));
        }
        if !tflite::model_buffer_has_identifier(buf) {
            return Err(ModelError::BadIdentifier {
                expected: String::from_utf8_lossy(TFLITE_IDENTIFIER).into_owned(),
                found: String::from_utf8_lossy(&buf[4..8]).into_owned(),
            });
        }

        let proto = tract_tflite::tflite()
            .proto_model_for_read(&mut &buf[..])
            .map_err(|e| ModelError::Malformed(format!("{:#}", e)))?;
        Self::from_model(proto.root())
    }

    fn from_model(model: tflite::Model<'_>) -> Result<Self, ModelError> {
        let subgraph = model
            .subgraphs()
            .filter(|s| s.len() > 0)
            .ok_or(ModelError::NoSubgraph)?
            .get(0);

        let tensors = subgraph.tensors();
        let count = tensors.as_ref().map(|t| t.len()).unwrap_or(0);
        let lookup = |index: i32| -> Result<TensorSpec, ModelError> {
            let tensor = usize::try_from(index)
                .ok()
                .filter(|&i| i < count)
                .and_then(|i| tensors.as_ref().map(|t| t.get(i)))
                .ok_or(ModelError::TensorIndex { index, count })?;
            read_tensor_spec(&tensor)
        };

        let inputs = subgraph
            .inputs()
            .map(|ids| ids.iter().map(&lookup).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();
        let outputs = subgraph
            .outputs()
            .map(|ids| ids.iter().map(&lookup).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self { inputs, outputs })
    }
}

fn read_tensor_spec(tensor: &tflite::Tensor<'_>) -> Result<TensorSpec, ModelError> {
    let name = tensor.name().unwrap_or_default().to_string();
    let code = tensor.type_().0 as u8;
    let dtype = DType::from_tflite_code(code).ok_or_else(|| ModelError::UnsupportedType {
        tensor: name.clone(),
        code,
    })?;
    let raw_shape: Vec<i32> = tensor
        .shape()
        .map(|s| s.iter().collect())
        .unwrap_or_default();
    if raw_shape.iter().any(|&d| d <= 0) {
        return Err(ModelError::DynamicShape {
            tensor: name,
            shape: raw_shape,
        });
    }
    let shape = raw_shape.into_iter().map(|d| d as usize).collect();
    Ok(TensorSpec { name, shape, dtype })
}
