//! Search-space composition
//!
//! Builds the joint configuration space of a pipeline from its steps:
//! - Fixed components contribute their space under `<step>:`
//! - Choices contribute a `<step>:__choice__` selector restricted to the
//!   components that can take part in a legal pipeline
//! - Illegal combinations across choices become forbidden clauses

use super::config::PipelineConfig;
use super::step::{PipelineNode, PipelineStep};
use crate::compat::{add_forbidden, find_active_choices, get_match_array, CompatibilityMatrix};
use crate::configspace::ConfigurationSpace;
use crate::error::Result;
use std::collections::BTreeMap;

/// Result of composing a pipeline's search space
#[derive(Debug, Clone)]
pub struct ComposedSpace {
    pub space: ConfigurationSpace,
    pub matrix: CompatibilityMatrix,
    /// Active components per choice step, in axis order
    pub active: BTreeMap<String, Vec<String>>,
    /// Default component per choice step
    pub defaults: BTreeMap<String, String>,
    pub forbidden_clauses: usize,
}

/// Composes configuration spaces for a given pipeline configuration
pub struct SearchSpaceComposer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SearchSpaceComposer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Compose the joint space of `steps`
    pub fn compose(&self, steps: &[PipelineStep]) -> Result<ComposedSpace> {
        let props = &self.config.dataset_properties;
        let (include, exclude) = (&self.config.include, &self.config.exclude);

        let matrix = get_match_array(steps, props, include, exclude, self.config.compatibility_mode)?;

        let mut active = BTreeMap::new();
        let mut preferred = Vec::with_capacity(matrix.axes().len());
        for axis in matrix.axes() {
            let step = &steps[axis.step_index];
            let names = find_active_choices(&matrix, step, axis.step_index, props, include, exclude)?;
            let preference = step
                .node
                .as_choice()
                .and_then(|choice| choice.default_choice(&names))
                .and_then(|name| axis.candidates.iter().position(|c| c == name))
                .unwrap_or(0);
            preferred.push(preference);
            active.insert(step.name.clone(), names);
        }

        let coordinate = legal_default(&matrix, &preferred);
        let defaults: BTreeMap<String, String> = matrix
            .axes()
            .iter()
            .zip(&coordinate)
            .map(|(axis, &i)| (axis.step.clone(), axis.candidates[i].clone()))
            .collect();

        let mut space = ConfigurationSpace::new();
        for step in steps {
            let sub_space = match &step.node {
                PipelineNode::Component(node) => node.component().hyperparameter_search_space(props)?,
                PipelineNode::Choice(choice) => choice.hyperparameter_search_space(
                    props,
                    active.get(&step.name).map(Vec::as_slice),
                    None,
                    defaults.get(&step.name).map(String::as_str),
                )?,
            };
            space.add_configuration_space(&step.name, &sub_space, None)?;
        }

        let forbidden_clauses = add_forbidden(&mut space, steps, &matrix, props, include, exclude)?;
        tracing::debug!(
            hyperparameters = space.len(),
            forbidden_clauses,
            "composed search space"
        );

        Ok(ComposedSpace {
            space,
            matrix,
            active,
            defaults,
            forbidden_clauses,
        })
    }
}

/// Coordinate used for the choices' defaults.
///
/// The preferred coordinate when it is legal, otherwise the legal coordinate
/// agreeing with the most preferences; ties go to the first in row-major order.
fn legal_default(matrix: &CompatibilityMatrix, preferred: &[usize]) -> Vec<usize> {
    if matrix.get(preferred) {
        return preferred.to_vec();
    }
    let mut best: Option<(usize, Vec<usize>)> = None;
    for coordinate in matrix.legal_coordinates() {
        let agreement = coordinate.iter().zip(preferred).filter(|(a, b)| a == b).count();
        if best.as_ref().map_or(true, |(score, _)| agreement > *score) {
            best = Some((agreement, coordinate));
        }
    }
    // a built matrix always has a legal coordinate
    best.map(|(_, c)| c).unwrap_or_else(|| preferred.to_vec())
}
