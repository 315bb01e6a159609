//! Compatibility matrix over choice candidates

use super::{step_selectors, validate_selectors, CompatibilityMode, Selectors};
use crate::autopipeline::{PipelineNode, PipelineStep};
use crate::components::{ComponentProperties, DataKind};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{ArrayD, Dimension, IxDyn};
use serde::Serialize;

/// One matrix dimension: a choice step and its available candidates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixAxis {
    pub step: String,
    pub step_index: usize,
    /// Candidate short names in index order
    pub candidates: Vec<String>,
}

/// Boolean tensor with one axis per choice step; `true` marks a legal combination
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityMatrix {
    values: ArrayD<bool>,
    axes: Vec<MatrixAxis>,
}

impl CompatibilityMatrix {
    pub fn values(&self) -> &ArrayD<bool> {
        &self.values
    }

    pub fn axes(&self) -> &[MatrixAxis] {
        &self.axes
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of legal combinations
    pub fn true_count(&self) -> usize {
        self.values.iter().filter(|&&v| v).count()
    }

    /// Axis belonging to the step at `step_index`
    pub fn axis_of(&self, step_index: usize) -> Option<usize> {
        self.axes.iter().position(|a| a.step_index == step_index)
    }

    pub fn get(&self, coordinate: &[usize]) -> bool {
        self.values.get(IxDyn(coordinate)).copied().unwrap_or(false)
    }

    /// Legal coordinates in row-major order
    pub fn legal_coordinates(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        self.values
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|(idx, _)| idx.slice().to_vec())
    }
}

/// Candidates of one step as seen by the matrix
enum StepCandidates {
    Fixed(Option<ComponentProperties>),
    Choice(Vec<ComponentProperties>),
}

/// Running data state while walking a pipeline
#[derive(Debug, Clone, Copy)]
struct DataState {
    sparse: bool,
    signed: bool,
}

impl DataState {
    fn accepted_by(&self, props: &ComponentProperties) -> bool {
        let density = if self.sparse { DataKind::Sparse } else { DataKind::Dense };
        let sign = if self.signed { DataKind::SignedData } else { DataKind::UnsignedData };
        props.accepts(density) && props.accepts(sign)
    }

    fn after(self, props: &ComponentProperties) -> Self {
        if props.produces(DataKind::Predictions) {
            return self;
        }
        let sparse = match (props.produces(DataKind::Dense), props.produces(DataKind::Sparse)) {
            (true, false) => false,
            (false, true) => true,
            _ => self.sparse,
        };
        let signed = match (props.produces(DataKind::SignedData), props.produces(DataKind::UnsignedData)) {
            (true, false) => true,
            (false, true) => false,
            _ => self.signed,
        };
        Self { sparse, signed }
    }
}

fn is_chain_legal(chain: &[&ComponentProperties], initial: DataState, mode: CompatibilityMode) -> bool {
    let mut state = initial;
    for props in chain {
        if !state.accepted_by(props) {
            return false;
        }
        if mode == CompatibilityMode::Propagate {
            state = state.after(props);
        }
    }
    true
}

/// Build the compatibility matrix for `steps` under `dataset_properties`.
///
/// Fails with [`KolosalError::NoValidPipeline`] when no combination is legal.
pub fn get_match_array(
    steps: &[PipelineStep],
    dataset_properties: &DatasetProperties,
    include: &Selectors,
    exclude: &Selectors,
    mode: CompatibilityMode,
) -> Result<CompatibilityMatrix> {
    validate_selectors(steps, include, exclude)?;

    let mut axes = Vec::new();
    let mut per_step = Vec::with_capacity(steps.len());
    for (step_index, step) in steps.iter().enumerate() {
        let (inc, exc) = step_selectors(&step.name, include, exclude);
        match &step.node {
            PipelineNode::Component(node) => {
                let props = node.properties();
                let kept = inc.map_or(true, |i| i.contains(&props.short_name))
                    && exc.map_or(true, |e| !e.contains(&props.short_name));
                per_step.push(StepCandidates::Fixed(kept.then_some(props)));
            }
            PipelineNode::Choice(choice) => {
                let available = choice.available_components(dataset_properties, inc, exc)?;
                axes.push(MatrixAxis {
                    step: step.name.clone(),
                    step_index,
                    candidates: available.iter().map(|(name, _)| name.clone()).collect(),
                });
                per_step.push(StepCandidates::Choice(available.into_iter().map(|(_, p)| p).collect()));
            }
        }
    }

    let initial = DataState {
        sparse: dataset_properties.sparse(),
        signed: dataset_properties.signed(),
    };
    let shape: Vec<usize> = axes.iter().map(|a| a.candidates.len()).collect();
    let values = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        let mut chain = Vec::with_capacity(per_step.len());
        let mut axis = 0;
        for candidates in &per_step {
            match candidates {
                StepCandidates::Fixed(Some(props)) => chain.push(props),
                StepCandidates::Fixed(None) => return false,
                StepCandidates::Choice(options) => {
                    chain.push(&options[idx[axis]]);
                    axis += 1;
                }
            }
        }
        is_chain_legal(&chain, initial, mode)
    });

    let matrix = CompatibilityMatrix { values, axes };
    tracing::debug!(
        shape = ?matrix.shape(),
        true_count = matrix.true_count(),
        ?mode,
        "built compatibility matrix"
    );
    if matrix.true_count() == 0 {
        return Err(KolosalError::NoValidPipeline(format!(
            "no legal combination of {:?} for dataset properties {}",
            matrix.axes.iter().map(|a| &a.candidates).collect::<Vec<_>>(),
            dataset_properties
        )));
    }
    Ok(matrix)
}
