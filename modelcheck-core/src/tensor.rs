//! Tensors
//!
//! Immutable n-dimensional arrays produced by input generators and runners.
//! Element storage is typed; comparison code reads values back as `f64`.

use crate::DType;
use half::f16;
use thiserror::Error;

/// Errors raised while constructing or decoding a tensor
#[derive(Debug, Error, PartialEq)]
pub enum TensorError {
    #[error("Invalid shape {shape:?}: every dimension must be positive")]
    InvalidShape { shape: Vec<usize> },

    #[error("Shape {shape:?} holds {expected} elements but {actual} were given")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {expected} bytes for a {dtype} tensor of shape {shape:?}, got {actual}")]
    ByteLength {
        dtype: DType,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("A model needs at least one input tensor")]
    EmptyInputSet,
}

/// Typed element storage, row-major
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for TensorData {
                fn from(values: Vec<$ty>) -> Self {
                    TensorData::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec!(
    f16 => F16,
    f32 => F32,
    f64 => F64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
);

impl TensorData {
    /// Element type of the storage
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::F16(_) => DType::F16,
            TensorData::F32(_) => DType::F32,
            TensorData::F64(_) => DType::F64,
            TensorData::I8(_) => DType::I8,
            TensorData::I16(_) => DType::I16,
            TensorData::I32(_) => DType::I32,
            TensorData::I64(_) => DType::I64,
            TensorData::U8(_) => DType::U8,
        }
    }

    fn len(&self) -> usize {
        match self {
            TensorData::F16(v) => v.len(),
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I8(v) => v.len(),
            TensorData::I16(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::U8(v) => v.len(),
        }
    }

    fn get_f64(&self, index: usize) -> f64 {
        match self {
            TensorData::F16(v) => v[index].to_f64(),
            TensorData::F32(v) => v[index] as f64,
            TensorData::F64(v) => v[index],
            TensorData::I8(v) => v[index] as f64,
            TensorData::I16(v) => v[index] as f64,
            TensorData::I32(v) => v[index] as f64,
            TensorData::I64(v) => v[index] as f64,
            TensorData::U8(v) => v[index] as f64,
        }
    }
}

/// An immutable n-dimensional tensor
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

/// Ordered runner outputs, aligned by position with the model's output slots
pub type OutputSet = Vec<Tensor>;

impl Tensor {
    /// Build a tensor, validating the shape against the element count.
    ///
    /// A rank-0 tensor has shape `[]` and exactly one element.
    pub fn new(shape: Vec<usize>, data: impl Into<TensorData>) -> Result<Self, TensorError> {
        let data = data.into();
        if shape.contains(&0) {
            return Err(TensorError::InvalidShape { shape });
        }
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Decode a tensor from raw little-endian bytes
    pub fn from_le_bytes(dtype: DType, shape: Vec<usize>, bytes: &[u8]) -> Result<Self, TensorError> {
        if shape.contains(&0) {
            return Err(TensorError::InvalidShape { shape });
        }
        let count = shape.iter().product::<usize>();
        let expected = count * dtype.byte_width();
        if bytes.len() != expected {
            return Err(TensorError::ByteLength {
                dtype,
                shape,
                expected,
                actual: bytes.len(),
            });
        }

        macro_rules! decode {
            ($ty:ty, $width:expr) => {
                bytes
                    .chunks_exact($width)
                    .map(|c| {
                        let mut raw = [0u8; $width];
                        raw.copy_from_slice(c);
                        <$ty>::from_le_bytes(raw)
                    })
                    .collect::<Vec<$ty>>()
            };
        }

        let data = match dtype {
            DType::F16 => TensorData::F16(decode!(f16, 2)),
            DType::F32 => TensorData::F32(decode!(f32, 4)),
            DType::F64 => TensorData::F64(decode!(f64, 8)),
            DType::I8 => TensorData::I8(decode!(i8, 1)),
            DType::I16 => TensorData::I16(decode!(i16, 2)),
            DType::I32 => TensorData::I32(decode!(i32, 4)),
            DType::I64 => TensorData::I64(decode!(i64, 8)),
            DType::U8 => TensorData::U8(bytes.to_vec()),
        };
        Ok(Self { shape, data })
    }

    /// Encode the elements as raw little-endian bytes, row-major
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.num_elements() * self.dtype().byte_width());
        match &self.data {
            TensorData::F16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::F32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::F64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::I8(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::I16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::I32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::I64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::U8(v) => out.extend_from_slice(v),
        }
        out
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Total number of elements (1 for a scalar)
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Element at a flat row-major index, widened to `f64`
    pub fn get_f64(&self, index: usize) -> f64 {
        self.data.get_f64(index)
    }

    /// All elements widened to `f64`
    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.num_elements()).map(|i| self.data.get_f64(i)).collect()
    }

    /// Convert a flat row-major index into a multi-dimensional index
    pub fn unravel_index(&self, mut flat: usize) -> Vec<usize> {
        let mut index = vec![0; self.shape.len()];
        for (axis, &dim) in self.shape.iter().enumerate().rev() {
            index[axis] = flat % dim;
            flat /= dim;
        }
        index
    }
}
