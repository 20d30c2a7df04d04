//! modelcheck Core - Data Model
//!
//! This crate provides the types shared by every other modelcheck crate:
//! - `Tensor` / `DType` for immutable typed n-dimensional arrays
//! - `ModelSignature` read from a compiled TFLite flatbuffer
//! - `RecipeDef` catalog entries and the `Recipe` trait
//! - The `TargetRunner` trait every execution backend implements

mod dtype;
mod model;
mod recipe;
mod runner;
mod tensor;

#[doc(hidden)]
pub mod testing;

pub use dtype::DType;
pub use model::{ModelError, ModelSignature, TFLITE_IDENTIFIER, TensorSpec};
pub use recipe::{
    InputSet, InputSpec, Metric, PolicyOverrides, PreparedRecipe, Recipe, RecipeDef,
    RecipeRegistry,
};
pub use runner::{RunnerError, TargetRunner};
pub use tensor::{OutputSet, Tensor, TensorData, TensorError};
