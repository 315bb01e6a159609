//! Compatibility between pipeline steps
//!
//! Provides:
//! - [`get_match_array`]: which combinations of choice candidates can be chained
//! - [`find_active_choices`]: candidates of one choice that appear in a legal combination
//! - [`add_forbidden`]: forbidden clauses excluding the illegal combinations

mod active;
mod forbidden;
mod matrix;

pub use active::find_active_choices;
pub use forbidden::add_forbidden;
pub use matrix::{get_match_array, CompatibilityMatrix, MatrixAxis};

use crate::autopipeline::PipelineStep;
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component names per step name, used for include and exclude restrictions
pub type Selectors = BTreeMap<String, Vec<String>>;

/// How data properties flow between steps while checking compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityMode {
    /// Each step sees the output properties of the step before it
    #[default]
    Propagate,
    /// Every step is checked against the dataset properties as given
    Static,
}

/// Reject selector keys that do not name a step
pub(crate) fn validate_selectors(steps: &[PipelineStep], include: &Selectors, exclude: &Selectors) -> Result<()> {
    for (label, selectors) in [("include", include), ("exclude", exclude)] {
        for key in selectors.keys() {
            if !steps.iter().any(|s| &s.name == key) {
                return Err(KolosalError::InvalidSelector(format!(
                    "Invalid key in {}: '{}'; should be one of {:?}",
                    label,
                    key,
                    steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn step_selectors<'a>(
    step: &str,
    include: &'a Selectors,
    exclude: &'a Selectors,
) -> (Option<&'a [String]>, Option<&'a [String]>) {
    (
        include.get(step).map(Vec::as_slice),
        exclude.get(step).map(Vec::as_slice),
    )
}
