//! Tensor Element Types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// IEEE 754 half precision
    F16,
    /// IEEE 754 single precision
    F32,
    /// IEEE 754 double precision
    F64,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 8-bit integer (quantized models)
    U8,
}

impl DType {
    /// Size of one element in bytes
    pub const fn byte_width(self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::F16 | DType::I16 => 2,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    /// Whether the type is a floating point type
    pub const fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    /// Map a TFLite `TensorType` code onto an element type.
    ///
    /// Returns `None` for types that carry no numeric payload we can compare
    /// (string, bool, complex, resource handles, packed int4, ...).
    pub const fn from_tflite_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DType::F32),
            1 => Some(DType::F16),
            2 => Some(DType::I32),
            3 => Some(DType::U8),
            4 => Some(DType::I64),
            7 => Some(DType::I16),
            9 => Some(DType::I8),
            10 => Some(DType::F64),
            _ => None,
        }
    }

    /// TFLite `TensorType` code for this element type
    pub const fn tflite_code(self) -> u8 {
        match self {
            DType::F32 => 0,
            DType::F16 => 1,
            DType::I32 => 2,
            DType::U8 => 3,
            DType::I64 => 4,
            DType::I16 => 7,
            DType::I8 => 9,
            DType::F64 => 10,
        }
    }

    /// Short lowercase name (`f32`, `i8`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
