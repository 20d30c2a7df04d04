//! In-Process Interpreter
//!
//! The trusted host reference. The model is loaded with `tract-tflite` and run
//! inside this process, so no external tool takes part in producing the baseline.
//!
//! Input tensors are cast to each input's declared datum type; for quantized
//! inputs that keeps the raw integer values and attaches the model's zero point
//! and scale, which is how the benchmark tool reads its value files too.

use crate::config::HostConfig;
use half::f16;
use modelcheck_core::{ModelSignature, OutputSet, RunnerError, TargetRunner, Tensor, TensorData};
use std::path::Path;
use tract_core::prelude::{
    Datum, DatumType, Framework, TValue, TVec, Tensor as TractTensor, TractError,
};

/// Runs models with the tract TFLite interpreter
#[derive(Debug, Clone)]
pub struct InterpreterRunner {
    optimize: bool,
}

impl InterpreterRunner {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            optimize: config.optimize,
        }
    }
}

impl TargetRunner for InterpreterRunner {
    fn name(&self) -> &str {
        "host"
    }

    fn run(&mut self, model: &Path, inputs: &[Tensor]) -> Result<OutputSet, RunnerError> {
        let signature = ModelSignature::load(model)?;
        if inputs.len() != signature.inputs.len() {
            return Err(RunnerError::InputArity {
                expected: signature.inputs.len(),
                actual: inputs.len(),
            });
        }

        let typed = tract_tflite::tflite()
            .model_for_path(model)
            .map_err(|e| interpreter_error(model, e))?;

        let mut values: TVec<TValue> = TVec::new();
        for (index, tensor) in inputs.iter().enumerate() {
            let declared = typed
                .input_fact(index)
                .map_err(|e| interpreter_error(model, e))?
                .datum_type;
            let value = to_tract(tensor, declared).map_err(|e| interpreter_error(model, e))?;
            values.push(value.into());
        }

        let typed = if self.optimize {
            typed
                .into_optimized()
                .map_err(|e| interpreter_error(model, e))?
        } else {
            typed
        };
        let plan = typed
            .into_runnable()
            .map_err(|e| interpreter_error(model, e))?;
        let results = plan.run(values).map_err(|e| interpreter_error(model, e))?;

        let outputs = results
            .iter()
            .map(|value| from_tract(value))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("host: {} output(s) from {}", outputs.len(), model.display());
        Ok(outputs)
    }
}

fn interpreter_error(model: &Path, error: TractError) -> RunnerError {
    RunnerError::Execution {
        command: format!("interpret {}", model.display()),
        message: format!("{:#}", error),
    }
}

fn to_tract(tensor: &Tensor, declared: DatumType) -> Result<TractTensor, TractError> {
    let shape = tensor.shape();
    let plain = match tensor.data() {
        // widened here, narrowed back by the cast below
        TensorData::F16(v) => {
            let wide: Vec<f32> = v.iter().map(|x| x.to_f32()).collect();
            TractTensor::from_shape(shape, wide.as_slice())?
        }
        TensorData::F32(v) => TractTensor::from_shape(shape, v.as_slice())?,
        TensorData::F64(v) => TractTensor::from_shape(shape, v.as_slice())?,
        TensorData::I8(v) => TractTensor::from_shape(shape, v.as_slice())?,
        TensorData::I16(v) => TractTensor::from_shape(shape, v.as_slice())?,
        TensorData::I32(v) => TractTensor::from_shape(shape, v.as_slice())?,
        TensorData::I64(v) => TractTensor::from_shape(shape, v.as_slice())?,
        TensorData::U8(v) => TractTensor::from_shape(shape, v.as_slice())?,
    };
    if plain.datum_type() == declared {
        Ok(plain)
    } else {
        Ok(plain.cast_to_dt(declared)?.into_owned())
    }
}

fn from_tract(value: &TractTensor) -> Result<Tensor, RunnerError> {
    let data: TensorData = match value.datum_type().unquantized() {
        DatumType::F16 => {
            let wide = value.cast_to::<f32>().map_err(decode_error)?;
            let narrow: Vec<f16> = wide
                .as_slice::<f32>()
                .map_err(decode_error)?
                .iter()
                .map(|&x| f16::from_f32(x))
                .collect();
            narrow.into()
        }
        DatumType::F32 => elements::<f32>(value)?.into(),
        DatumType::F64 => elements::<f64>(value)?.into(),
        DatumType::I8 => elements::<i8>(value)?.into(),
        DatumType::I16 => elements::<i16>(value)?.into(),
        DatumType::I32 => elements::<i32>(value)?.into(),
        DatumType::I64 => elements::<i64>(value)?.into(),
        DatumType::U8 => elements::<u8>(value)?.into(),
        other => {
            return Err(RunnerError::Decode(
                format!("unsupported output element type {:?}", other).into(),
            ));
        }
    };
    Tensor::new(value.shape().to_vec(), data).map_err(|e| RunnerError::Decode(Box::new(e)))
}

fn elements<T: Datum + Copy>(value: &TractTensor) -> Result<Vec<T>, RunnerError> {
    value
        .as_slice::<T>()
        .map(<[T]>::to_vec)
        .map_err(decode_error)
}

fn decode_error(error: TractError) -> RunnerError {
    RunnerError::Decode(error.into())
}
