use super::{find_active_choices, CompatibilityMatrix, Selectors};
use crate::autopipeline::PipelineStep;
use crate::components::CHOICE_HYPERPARAMETER;
use crate::configspace::{qualified_name, ConfigurationSpace, ForbiddenClause};
use crate::dataset::DatasetProperties;
use crate::error::Result;
use ndarray::Dimension;
use std::collections::BTreeSet;

/// `(axis, candidate index)` pairs of one window assignment
type Assignment = Vec<(usize, usize)>;

/// Cartesian product of the given index lists, first list varying slowest
fn product(lists: &[Vec<usize>]) -> Vec<Vec<usize>> {
    lists.iter().fold(vec![Vec::new()], |acc, list| {
        acc.iter()
            .flat_map(|prefix| {
                list.iter().map(move |&i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect()
    })
}

/// Whether some strictly shorter contiguous part of `assignment` was already forbidden
fn covered(assignment: &Assignment, emitted: &BTreeSet<Assignment>) -> bool {
    let n = assignment.len();
    (2..n).any(|len| (0..=n - len).any(|start| emitted.contains(&assignment[start..start + len].to_vec())))
}

/// Add forbidden clauses on the `<step>:__choice__` hyperparameters for every
/// illegal combination of active candidates.
///
/// Choice axes are treated as a single chain in pipeline order; windows of
/// two or more neighbouring choices are checked, shortest first, so a
/// combination already excluded by a shorter clause is not repeated.
/// Returns the number of clauses added.
pub fn add_forbidden(
    space: &mut ConfigurationSpace,
    steps: &[PipelineStep],
    matrix: &CompatibilityMatrix,
    dataset_properties: &DatasetProperties,
    include: &Selectors,
    exclude: &Selectors,
) -> Result<usize> {
    if matrix.true_count() == matrix.len() {
        return Ok(0);
    }

    let axes = matrix.axes();
    let mut active = Vec::with_capacity(axes.len());
    for axis in axes {
        let names = find_active_choices(
            matrix,
            &steps[axis.step_index],
            axis.step_index,
            dataset_properties,
            include,
            exclude,
        )?;
        let indices: Vec<usize> = axis
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| names.contains(c))
            .map(|(i, _)| i)
            .collect();
        active.push(indices);
    }

    let mut emitted: BTreeSet<Assignment> = BTreeSet::new();
    let mut clauses = Vec::new();
    for len in 2..=axes.len() {
        for start in 0..=axes.len() - len {
            let window = start..start + len;
            for combination in product(&active[window.clone()]) {
                let assignment: Assignment = window.clone().zip(combination).collect();
                if covered(&assignment, &emitted) {
                    continue;
                }
                let possible = matrix
                    .values()
                    .indexed_iter()
                    .any(|(idx, &legal)| legal && assignment.iter().all(|&(a, i)| idx.slice()[a] == i));
                if possible {
                    continue;
                }

                let mut terms = assignment.iter().map(|&(a, i)| {
                    (
                        qualified_name(&axes[a].step, CHOICE_HYPERPARAMETER),
                        axes[a].candidates[i].clone(),
                    )
                });
                // windows have at least two terms
                if let Some((name, value)) = terms.next() {
                    let clause = terms.fold(ForbiddenClause::equals(name, value), |c, (n, v)| c.and(n, v));
                    clauses.push(clause);
                }
                emitted.insert(assignment);
            }
        }
    }

    let count = clauses.len();
    for clause in clauses {
        space.add_forbidden_clause(clause)?;
    }
    tracing::debug!(count, "added forbidden clauses");
    Ok(count)
}
