use super::{step_selectors, CompatibilityMatrix, Selectors};
use crate::autopipeline::{PipelineNode, PipelineStep};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::Axis;

/// Candidates of a choice step that take part in at least one legal combination.
///
/// The result keeps the axis order of the matrix. Candidates that never lead
/// to a legal pipeline are dropped.
pub fn find_active_choices(
    matrix: &CompatibilityMatrix,
    step: &PipelineStep,
    step_index: usize,
    dataset_properties: &DatasetProperties,
    include: &Selectors,
    exclude: &Selectors,
) -> Result<Vec<String>> {
    let PipelineNode::Choice(choice) = &step.node else {
        return Err(KolosalError::InvalidSelector(format!(
            "Step '{}' is a {}, not a choice",
            step.name,
            step.node.kind_name()
        )));
    };
    let axis = matrix
        .axis_of(step_index)
        .filter(|&a| matrix.axes()[a].step == step.name)
        .ok_or_else(|| {
            KolosalError::InvalidSelector(format!("Step '{}' has no axis in the compatibility matrix", step.name))
        })?;

    let (inc, exc) = step_selectors(&step.name, include, exclude);
    let available: Vec<String> = choice
        .available_components(dataset_properties, inc, exc)?
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let candidates = &matrix.axes()[axis].candidates;
    if &available != candidates {
        return Err(KolosalError::InvalidSelector(format!(
            "Matrix axis {:?} does not match available components {:?} of step '{}'",
            candidates, available, step.name
        )));
    }

    let active: Vec<String> = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| matrix.values().index_axis(Axis(axis), *i).iter().any(|&v| v))
        .map(|(_, name)| name.clone())
        .collect();
    if active.len() < candidates.len() {
        tracing::debug!(
            step = %step.name,
            pruned = ?candidates.iter().filter(|c| !active.contains(c)).collect::<Vec<_>>(),
            "pruned incompatible components"
        );
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::{get_match_array, CompatibilityMode};
    use crate::components::classification::{GaussianNaiveBayes, KNearestNeighbors, MultinomialNaiveBayes};
    use crate::components::data_preprocessing::Imputation;
    use crate::components::{factory, ComponentChoice};

    fn steps() -> Vec<PipelineStep> {
        vec![
            PipelineStep::component("imputation", factory::<Imputation>()),
            PipelineStep::choice(
                "classifier",
                ComponentChoice::new(vec![
                    factory::<GaussianNaiveBayes>(),
                    factory::<KNearestNeighbors>(),
                    factory::<MultinomialNaiveBayes>(),
                ])
                .unwrap(),
            ),
        ]
    }

    #[test]
    fn test_sparse_prunes_dense_only() {
        let steps = steps();
        let props = DatasetProperties::new().with("sparse", true);
        let empty = Selectors::new();
        let matrix = get_match_array(&steps, &props, &empty, &empty, CompatibilityMode::Propagate).unwrap();
        let active = find_active_choices(&matrix, &steps[1], 1, &props, &empty, &empty).unwrap();
        assert_eq!(active, vec!["knn".to_string(), "multinomial_nb".to_string()]);
    }

    #[test]
    fn test_fixed_step_rejected() {
        let steps = steps();
        let props = DatasetProperties::new();
        let empty = Selectors::new();
        let matrix = get_match_array(&steps, &props, &empty, &empty, CompatibilityMode::Propagate).unwrap();
        let err = find_active_choices(&matrix, &steps[0], 0, &props, &empty, &empty).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidSelector(_)));
    }

    #[test]
    fn test_mismatched_selectors_rejected() {
        let steps = steps();
        let props = DatasetProperties::new();
        let empty = Selectors::new();
        let matrix = get_match_array(&steps, &props, &empty, &empty, CompatibilityMode::Propagate).unwrap();
        let mut exclude = Selectors::new();
        exclude.insert("classifier".to_string(), vec!["knn".to_string()]);
        let err = find_active_choices(&matrix, &steps[1], 1, &props, &empty, &exclude).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidSelector(_)));
    }
}
