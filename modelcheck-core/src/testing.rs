//! Test Fixtures
//!
//! Builds small TFLite models with the `flatbuffers` builder and the schema
//! bindings shipped by `tract-tflite`. Signature-only models carry a tensor table
//! and the subgraph's input/output indices; [`tflite_add_model`] also carries one
//! `ADD` operator so the interpreter can execute it.

use crate::DType;
use flatbuffers::{FlatBufferBuilder, WIPOffset};
use tract_tflite::tflite;

/// One tensor to place in a generated model
#[derive(Debug, Clone)]
pub struct TensorFixture {
    pub name: String,
    pub shape: Vec<i32>,
    pub dtype: DType,
}

impl TensorFixture {
    pub fn new(name: &str, shape: &[usize], dtype: DType) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.iter().map(|&d| d as i32).collect(),
            dtype,
        }
    }

    /// Fixture with a raw (possibly non-positive) shape
    pub fn with_raw_shape(name: &str, shape: &[i32], dtype: DType) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.to_vec(),
            dtype,
        }
    }
}

/// Serialize a single-subgraph model whose tensors are `inputs` followed by `outputs`
pub fn tflite_model(inputs: &[TensorFixture], outputs: &[TensorFixture]) -> Vec<u8> {
    let tensors: Vec<TensorFixture> = inputs.iter().chain(outputs).cloned().collect();
    let input_ids: Vec<i32> = (0..inputs.len() as i32).collect();
    let output_ids: Vec<i32> = (inputs.len() as i32..tensors.len() as i32).collect();
    build_model(&tensors, &input_ids, &output_ids, false)
}

/// Executable model computing `sum = a + b` element-wise
pub fn tflite_add_model(shape: &[usize], dtype: DType) -> Vec<u8> {
    let tensors = [
        TensorFixture::new("a", shape, dtype),
        TensorFixture::new("b", shape, dtype),
        TensorFixture::new("sum", shape, dtype),
    ];
    build_model(&tensors, &[0, 1], &[2], true)
}

fn push_tensor<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    fixture: &TensorFixture,
) -> WIPOffset<tflite::Tensor<'a>> {
    let name = fbb.create_string(&fixture.name);
    let shape = fbb.create_vector(fixture.shape.as_slice());
    tflite::Tensor::create(
        fbb,
        &tflite::TensorArgs {
            shape: Some(shape),
            type_: tflite::TensorType(fixture.dtype.tflite_code() as i8),
            // buffer 0 is the empty sentinel: no constant data
            buffer: 0,
            name: Some(name),
            ..Default::default()
        },
    )
}

fn build_model(tensors: &[TensorFixture], inputs: &[i32], outputs: &[i32], add: bool) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::new();

    let tensors: Vec<_> = tensors.iter().map(|t| push_tensor(&mut fbb, t)).collect();
    let tensors = fbb.create_vector(&tensors);
    let subgraph_inputs = fbb.create_vector(inputs);
    let subgraph_outputs = fbb.create_vector(outputs);

    let mut operator_codes = Vec::new();
    let mut operators = Vec::new();
    if add {
        operator_codes.push(tflite::OperatorCode::create(
            &mut fbb,
            &tflite::OperatorCodeArgs {
                deprecated_builtin_code: tflite::BuiltinOperator::ADD.0 as i8,
                builtin_code: tflite::BuiltinOperator::ADD,
                version: 1,
                ..Default::default()
            },
        ));
        let options = tflite::AddOptions::create(&mut fbb, &tflite::AddOptionsArgs::default());
        let op_inputs = fbb.create_vector(inputs);
        let op_outputs = fbb.create_vector(outputs);
        operators.push(tflite::Operator::create(
            &mut fbb,
            &tflite::OperatorArgs {
                opcode_index: 0,
                inputs: Some(op_inputs),
                outputs: Some(op_outputs),
                builtin_options_type: tflite::BuiltinOptions::AddOptions,
                builtin_options: Some(options.as_union_value()),
                ..Default::default()
            },
        ));
    }
    let operators = fbb.create_vector(&operators);

    let subgraph = tflite::SubGraph::create(
        &mut fbb,
        &tflite::SubGraphArgs {
            tensors: Some(tensors),
            inputs: Some(subgraph_inputs),
            outputs: Some(subgraph_outputs),
            operators: Some(operators),
            ..Default::default()
        },
    );
    let subgraphs = fbb.create_vector(&[subgraph]);
    let operator_codes = fbb.create_vector(&operator_codes);
    let empty = tflite::Buffer::create(&mut fbb, &tflite::BufferArgs::default());
    let buffers = fbb.create_vector(&[empty]);

    let model = tflite::Model::create(
        &mut fbb,
        &tflite::ModelArgs {
            version: 3,
            operator_codes: Some(operator_codes),
            subgraphs: Some(subgraphs),
            buffers: Some(buffers),
            ..Default::default()
        },
    );
    tflite::finish_model_buffer(&mut fbb, model);
    fbb.finished_data().to_vec()
}
