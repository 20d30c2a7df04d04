//! Recipe Planner
//!
//! Builds the execution plan from the registered catalog.
//!
//! Selection options:
//! - `all` or one exact recipe name
//! - Optional regex narrowing on recipe names
//!
//! Ordering: recipes run in name order for deterministic execution.

use crate::harness::HarnessError;
use modelcheck_core::{RecipeDef, RecipeRegistry};
use regex::Regex;

/// Selects every registered recipe
pub const ALL_RECIPES: &str = "all";

/// Execution plan for one run
#[derive(Debug)]
pub struct ExecutionPlan {
    /// Ordered list of recipes to run
    pub recipes: Vec<&'static RecipeDef>,
}

/// Build the execution plan for a `--model` selection
pub fn build_plan(
    registry: &RecipeRegistry,
    selection: &str,
    filter: Option<&Regex>,
) -> Result<ExecutionPlan, HarnessError> {
    let selected: Vec<&'static RecipeDef> = if selection == ALL_RECIPES {
        registry.iter().collect()
    } else {
        let def = registry
            .get(selection)
            .ok_or_else(|| HarnessError::UnknownRecipe {
                name: selection.to_string(),
                available: registry.names().collect::<Vec<_>>().join(", "),
            })?;
        vec![def]
    };

    let recipes = selected
        .into_iter()
        .filter(|def| filter.is_none_or(|re| re.is_match(def.name)))
        .collect();

    Ok(ExecutionPlan { recipes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelcheck_core::{DType, InputSpec, PolicyOverrides};

    static INPUT: [InputSpec; 1] = [InputSpec::new(&[32], DType::F32)];

    macro_rules! def {
        ($name:literal) => {
            RecipeDef {
                name: $name,
                model_file: "m.tflite",
                inputs: &INPUT,
                overrides: PolicyOverrides::NONE,
                file: file!(),
                line: line!(),
            }
        };
    }

    static DEFS: [RecipeDef; 4] = [def!("relu6"), def!("add"), def!("relu"), def!("conv2d")];

    fn registry() -> RecipeRegistry {
        RecipeRegistry::from_defs(DEFS.iter())
    }

    fn names(plan: &ExecutionPlan) -> Vec<&'static str> {
        plan.recipes.iter().map(|d| d.name).collect()
    }

    #[test]
    fn test_all_is_sorted() {
        let plan = build_plan(&registry(), ALL_RECIPES, None).unwrap();
        assert_eq!(names(&plan), vec!["add", "conv2d", "relu", "relu6"]);
    }

    #[test]
    fn test_single_recipe() {
        let plan = build_plan(&registry(), "relu", None).unwrap();
        assert_eq!(names(&plan), vec!["relu"]);
    }

    #[test]
    fn test_unknown_recipe_lists_available() {
        let err = build_plan(&registry(), "softmax", None).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("add, conv2d, relu, relu6"));
    }

    #[test]
    fn test_filter_narrows_all() {
        let re = Regex::new("^relu").unwrap();
        let plan = build_plan(&registry(), ALL_RECIPES, Some(&re)).unwrap();
        assert_eq!(names(&plan), vec!["relu", "relu6"]);
    }
}
