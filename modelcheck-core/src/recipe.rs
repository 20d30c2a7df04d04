//! Recipes
//!
//! A recipe names one compiled model and describes how to generate its inputs.
//! The fixed catalog registers `RecipeDef`s through `inventory`; the harness only
//! sees the [`Recipe`] trait, so ad-hoc recipes (tests, tooling) plug in the same way.

use crate::{DType, Tensor, TensorError};
use half::f16;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Comparison metric requested by a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Element-wise tolerance band
    Strict,
    /// Same set of top-k indices
    TopK,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Strict => f.write_str("Strict"),
            Metric::TopK => f.write_str("TopK"),
        }
    }
}

/// Per-recipe comparison keyword overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyOverrides {
    pub metric: Option<Metric>,
    pub k: Option<usize>,
}

impl PolicyOverrides {
    /// No overrides: process defaults apply
    pub const NONE: Self = Self {
        metric: None,
        k: None,
    };

    /// Compare the top-`k` index sets
    pub const fn top_k(k: usize) -> Self {
        Self {
            metric: Some(Metric::TopK),
            k: Some(k),
        }
    }
}

/// Uniform random generator for one model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub shape: &'static [usize],
    pub dtype: DType,
    pub low: f64,
    pub high: f64,
}

impl InputSpec {
    /// Values drawn from `[0, 1)`
    pub const fn new(shape: &'static [usize], dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            low: 0.0,
            high: 1.0,
        }
    }

    /// Values drawn from `[low, high)`
    pub const fn range(self, low: f64, high: f64) -> Self {
        Self { low, high, ..self }
    }

    /// Draw a fresh tensor.
    ///
    /// Integer types are sampled as floats and truncated toward zero, saturating at
    /// the type bounds.
    pub fn generate(&self, rng: &mut dyn RngCore) -> Result<Tensor, TensorError> {
        let count = self.shape.iter().product::<usize>();
        let (low, high) = (self.low, self.high);
        let mut draw = || {
            if high > low {
                rng.gen_range(low..high)
            } else {
                low
            }
        };
        let shape = self.shape.to_vec();
        match self.dtype {
            DType::F16 => Tensor::new(shape, (0..count).map(|_| f16::from_f64(draw())).collect::<Vec<_>>()),
            DType::F32 => Tensor::new(shape, (0..count).map(|_| draw() as f32).collect::<Vec<_>>()),
            DType::F64 => Tensor::new(shape, (0..count).map(|_| draw()).collect::<Vec<_>>()),
            DType::I8 => Tensor::new(shape, (0..count).map(|_| draw() as i8).collect::<Vec<_>>()),
            DType::I16 => Tensor::new(shape, (0..count).map(|_| draw() as i16).collect::<Vec<_>>()),
            DType::I32 => Tensor::new(shape, (0..count).map(|_| draw() as i32).collect::<Vec<_>>()),
            DType::I64 => Tensor::new(shape, (0..count).map(|_| draw() as i64).collect::<Vec<_>>()),
            DType::U8 => Tensor::new(shape, (0..count).map(|_| draw() as u8).collect::<Vec<_>>()),
        }
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        write!(
            f,
            "({}) {} [{}, {})",
            dims.join("x"),
            self.dtype,
            self.low,
            self.high
        )
    }
}

/// Ordered model inputs; a single tensor is a one-element set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSet(Vec<Tensor>);

impl InputSet {
    pub fn as_slice(&self) -> &[Tensor] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Tensor> {
        self.0
    }
}

impl From<Tensor> for InputSet {
    fn from(tensor: Tensor) -> Self {
        Self(vec![tensor])
    }
}

impl From<Vec<Tensor>> for InputSet {
    fn from(tensors: Vec<Tensor>) -> Self {
        Self(tensors)
    }
}

/// What a recipe hands to the harness
#[derive(Debug, Clone)]
pub struct PreparedRecipe {
    pub model_path: PathBuf,
    pub inputs: InputSet,
}

/// A named, parameterless producer of one `(model, inputs)` pair
pub trait Recipe {
    /// Unique name, used by `--model`
    fn name(&self) -> &str;

    /// Resolve the model path and generate fresh inputs
    fn prepare(
        &self,
        models_dir: &Path,
        rng: &mut dyn RngCore,
    ) -> Result<PreparedRecipe, TensorError>;

    /// Comparison keyword overrides; none by default
    fn overrides(&self) -> PolicyOverrides {
        PolicyOverrides::NONE
    }
}

/// Catalog entry registered with `inventory::submit!`
#[derive(Debug, Clone)]
pub struct RecipeDef {
    /// Unique identifier
    pub name: &'static str,
    /// Model file name inside the models directory
    pub model_file: &'static str,
    /// Input generators, in model input order
    pub inputs: &'static [InputSpec],
    /// Comparison overrides
    pub overrides: PolicyOverrides,
    /// Source file path
    pub file: &'static str,
    /// Source line number
    pub line: u32,
}

impl Recipe for RecipeDef {
    fn name(&self) -> &str {
        self.name
    }

    fn prepare(
        &self,
        models_dir: &Path,
        rng: &mut dyn RngCore,
    ) -> Result<PreparedRecipe, TensorError> {
        let inputs = self
            .inputs
            .iter()
            .map(|spec| spec.generate(rng))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PreparedRecipe {
            model_path: models_dir.join(self.model_file),
            inputs: inputs.into(),
        })
    }

    fn overrides(&self) -> PolicyOverrides {
        self.overrides
    }
}

inventory::collect!(RecipeDef);

/// Name-ordered view over the registered recipes
#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<&'static str, &'static RecipeDef>,
}

impl RecipeRegistry {
    /// Collect every `RecipeDef` submitted to `inventory`
    pub fn from_inventory() -> Self {
        Self::from_defs(inventory::iter::<RecipeDef>)
    }

    /// Build a registry from explicit definitions.
    ///
    /// A duplicate name keeps the first definition.
    pub fn from_defs(defs: impl IntoIterator<Item = &'static RecipeDef>) -> Self {
        let mut recipes: BTreeMap<&'static str, &'static RecipeDef> = BTreeMap::new();
        for def in defs {
            if let Some(existing) = recipes.get(def.name) {
                tracing::warn!(
                    "duplicate recipe '{}' at {}:{} ignored (first defined at {}:{})",
                    def.name,
                    def.file,
                    def.line,
                    existing.file,
                    existing.line
                );
                continue;
            }
            recipes.insert(def.name, def);
        }
        Self { recipes }
    }

    pub fn get(&self, name: &str) -> Option<&'static RecipeDef> {
        self.recipes.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.recipes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static RecipeDef> + '_ {
        self.recipes.values().copied()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
