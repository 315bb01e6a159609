//! K-Nearest Neighbors classifier

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::components::base::{argmax_labels, check_fitted_width, param_str, param_usize, unique_classes, Component};
use crate::components::properties::ComponentProperties;
use crate::configspace::{Configuration, ConfigurationSpace, Hyperparameter};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainingData {
    x: Array2<f64>,
    /// Index into `classes` per training row
    labels: Vec<usize>,
    classes: Vec<f64>,
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    n_neighbors: usize,
    weights: WeightScheme,
    /// Minkowski exponent; 1 is Manhattan, 2 Euclidean
    p: i64,
    fitted: Option<TrainingData>,
}

impl Default for KNearestNeighbors {
    fn default() -> Self {
        Self {
            n_neighbors: 1,
            weights: WeightScheme::Uniform,
            p: 2,
            fitted: None,
        }
    }
}

impl KNearestNeighbors {
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.p {
            1 => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
            _ => a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
        }
    }

    /// Class vote shares for one query row
    fn votes(&self, data: &TrainingData, row: ArrayView1<f64>) -> Vec<f64> {
        let mut neighbors: Vec<(f64, usize)> = data
            .x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, train)| (self.distance(row, train), i))
            .collect();
        // ties resolved by training order
        neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
        neighbors.truncate(self.n_neighbors.min(data.labels.len()));

        let mut votes = vec![0.0; data.classes.len()];
        let exact = neighbors.iter().any(|(d, _)| *d == 0.0);
        for &(dist, idx) in &neighbors {
            let weight = match self.weights {
                WeightScheme::Uniform => 1.0,
                // exact matches take all the weight
                WeightScheme::Distance if exact => f64::from(u8::from(dist == 0.0)),
                WeightScheme::Distance => 1.0 / dist,
            };
            votes[data.labels[idx]] += weight;
        }
        let total: f64 = votes.iter().sum();
        if total > 0.0 {
            votes.iter_mut().for_each(|v| *v /= total);
        }
        votes
    }

    fn all_votes(&self, x: &Array2<f64>) -> Result<(Array2<f64>, &[f64])> {
        let data = self.fitted.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        check_fitted_width(data.x.ncols(), x)?;
        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.votes(data, x.row(i)))
            .collect();
        let mut proba = Array2::zeros((x.nrows(), data.classes.len()));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                proba[[i, j]] = v;
            }
        }
        Ok((proba, &data.classes))
    }
}

impl Component for KNearestNeighbors {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("knn", "K-Nearest Neighbors").classifier(true, false)
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameters([
            Hyperparameter::log_int("n_neighbors", 1, 100, 1)?,
            Hyperparameter::categorical("weights", &["uniform", "distance"], Some("uniform"))?,
            Hyperparameter::int("p", 1, 2, 2)?,
        ])?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.n_neighbors = param_usize(configuration, "n_neighbors")?.max(1);
        self.weights = match param_str(configuration, "weights")? {
            "distance" => WeightScheme::Distance,
            _ => WeightScheme::Uniform,
        };
        self.p = param_usize(configuration, "p")? as i64;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(KolosalError::TrainingError("Empty dataset".into()));
        }
        if x.nrows() != y.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }
        let classes = unique_classes(y);
        let labels = y
            .iter()
            .map(|yi| classes.iter().position(|c| c == yi).unwrap_or(0))
            .collect();
        self.fitted = Some(TrainingData {
            x: x.clone(),
            labels,
            classes,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (proba, classes) = self.all_votes(x)?;
        Ok(argmax_labels(&proba, classes))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(self.all_votes(x)?.0)
    }
}
