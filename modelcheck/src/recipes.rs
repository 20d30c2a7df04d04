//! Recipe Catalog
//!
//! The fixed set of models checked by `modelcheck`. Every entry names a compiled
//! model inside the models directory and the uniform random inputs it is fed.
//! Classification heads compare top-5 index sets instead of raw logits.

use modelcheck_core::{DType, InputSpec, PolicyOverrides, RecipeDef, RecipeRegistry};

macro_rules! recipe {
    ($name:literal, $model:literal, $inputs:expr) => {
        recipe!($name, $model, $inputs, PolicyOverrides::NONE);
    };
    ($name:literal, $model:literal, $inputs:expr, $overrides:expr) => {
        inventory::submit! {
            RecipeDef {
                name: $name,
                model_file: $model,
                inputs: $inputs,
                overrides: $overrides,
                file: file!(),
                line: line!(),
            }
        }
    };
}

/// Every recipe submitted by this crate (and any other linked crate)
pub fn catalog() -> RecipeRegistry {
    RecipeRegistry::from_inventory()
}

static PAIR_2X2_F32: [InputSpec; 2] = [
    InputSpec::new(&[2, 2], DType::F32),
    InputSpec::new(&[2, 2], DType::F32),
];
static PAIR_2X2_I8: [InputSpec; 2] = [
    InputSpec::new(&[2, 2], DType::I8).range(0.0, 10.0),
    InputSpec::new(&[2, 2], DType::I8).range(0.0, 10.0),
];
static FRAME_720P: [InputSpec; 1] = [InputSpec::new(&[1, 720, 1080, 3], DType::F32)];
static ACTIVATION: [InputSpec; 1] = [InputSpec::new(&[32], DType::F32).range(-1.0, 1.0)];
static DENSE: [InputSpec; 1] = [InputSpec::new(&[32], DType::F32).range(-3.0, 3.0)];
static DEPTHWISE: [InputSpec; 1] =
    [InputSpec::new(&[1, 32, 32, 32], DType::F32).range(-3.0, 3.0)];
static TRANSPOSE: [InputSpec; 1] = [InputSpec::new(&[3, 2], DType::F32).range(-10.0, 10.0)];
static CONV_F32: [InputSpec; 1] =
    [InputSpec::new(&[1, 512, 512, 3], DType::F32).range(0.0, 16.0)];
static CONV_I8: [InputSpec; 1] = [InputSpec::new(&[1, 512, 512, 3], DType::I8).range(0.0, 16.0)];
static MAXPOOL: [InputSpec; 1] = [InputSpec::new(&[1, 32, 32, 1], DType::F32).range(0.0, 16.0)];
static RESHAPE: [InputSpec; 1] =
    [InputSpec::new(&[2, 720, 1080], DType::F32).range(-10.0, 10.0)];
static PAD: [InputSpec; 1] = [InputSpec::new(&[1, 3, 3, 1], DType::F32).range(0.0, 5.0)];
static IMAGE_224: [InputSpec; 1] =
    [InputSpec::new(&[1, 224, 224, 3], DType::F32).range(0.0, 255.0)];
static IMAGE_299: [InputSpec; 1] =
    [InputSpec::new(&[1, 299, 299, 3], DType::F32).range(0.0, 255.0)];
static SPLIT_F32: [InputSpec; 1] =
    [InputSpec::new(&[1, 720, 4, 3], DType::F32).range(-128.0, 127.0)];
static SPLIT_I8: [InputSpec; 1] =
    [InputSpec::new(&[1, 720, 4, 3], DType::I8).range(-128.0, 127.0)];
// input_ids, input_mask, segment_ids
static BERT_384: [InputSpec; 3] = [
    InputSpec::new(&[1, 384], DType::I32).range(0.0, 255.0),
    InputSpec::new(&[1, 384], DType::I32).range(0.0, 255.0),
    InputSpec::new(&[1, 384], DType::I32).range(0.0, 255.0),
];
static UNPACK_F32: [InputSpec; 1] = [InputSpec::new(&[3, 4], DType::F32).range(0.0, 100.0)];
static UNPACK_I8: [InputSpec; 1] = [InputSpec::new(&[3, 4], DType::I8).range(0.0, 100.0)];
static CAST: [InputSpec; 1] = [InputSpec::new(&[2, 3, 4], DType::I8).range(0.0, 100.0)];
static STRIDED_SLICE: [InputSpec; 1] =
    [InputSpec::new(&[3, 2, 3], DType::F32).range(0.0, 100.0)];

// Single operators
recipe!("add", "add_fp16.tflite", &PAIR_2X2_F32);
recipe!("mul", "mul_int8.tflite", &PAIR_2X2_I8);
recipe!("argmax", "argmax.tflite", &FRAME_720P);
recipe!("relu", "relu.tflite", &ACTIVATION);
recipe!("relu6", "relu6.tflite", &ACTIVATION);
recipe!("elu", "elu.tflite", &ACTIVATION);
recipe!("prelu", "prelu.tflite", &ACTIVATION);
recipe!("tanh", "tanh.tflite", &ACTIVATION);
recipe!("dense", "dense.tflite", &DENSE);
recipe!("depthwiseconv2d", "depthwise_conv2d.tflite", &DEPTHWISE);
recipe!("transpose", "transpose.tflite", &TRANSPOSE);
recipe!("conv2d", "conv2d.tflite", &CONV_F32);
recipe!("conv2d_int8", "conv2d_int8.tflite", &CONV_I8);
recipe!("maxpool2d", "maxpool2d.tflite", &MAXPOOL);
recipe!("reshape", "reshape_2X720X1080.tflite", &RESHAPE);
recipe!("pad", "pad.tflite", &PAD);
recipe!("split", "split_fp32.tflite", &SPLIT_F32);
recipe!("split_int8", "split_int8.tflite", &SPLIT_I8);
recipe!("unpack", "unpack.tflite", &UNPACK_F32);
recipe!("unpack_int8", "unpack_int8_quant.tflite", &UNPACK_I8);
recipe!("cast", "cast_int8_quant.tflite", &CAST);
recipe!("stridedslice", "strided_slice.tflite", &STRIDED_SLICE);

// Full networks
recipe!("densenet", "densenet.tflite", &IMAGE_224);
recipe!("inception", "inception_v3.tflite", &IMAGE_299);
recipe!(
    "mobilenet",
    "mobilenet_v2_1.0_224.tflite",
    &IMAGE_224,
    PolicyOverrides::top_k(5)
);
recipe!(
    "mobilebert",
    "mobilebert_1_default_1.tflite",
    &BERT_384,
    PolicyOverrides::top_k(5)
);
