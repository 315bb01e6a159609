//! Naive Bayes classifiers
//!
//! Gaussian Naive Bayes for continuous dense features and Multinomial
//! Naive Bayes for non-negative count features.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::components::base::{argmax_labels, check_fitted_width, param_bool, param_f64, unique_classes, Component};
use crate::components::properties::{ComponentProperties, DataKind};
use crate::configspace::{Configuration, ConfigurationSpace, Hyperparameter};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};

/// Row-wise log-sum-exp normalization, then exponentiation
fn normalize_log_proba(mut log_probs: Array2<f64>) -> Array2<f64> {
    for mut row in log_probs.rows_mut() {
        let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let log_sum: f64 = row.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln();
        row.mapv_inplace(|v| (v - max_val - log_sum).exp());
    }
    log_probs
}

fn class_indices(y: &Array1<f64>, class: f64) -> Vec<usize> {
    y.iter()
        .enumerate()
        .filter(|(_, &yi)| yi == class)
        .map(|(i, _)| i)
        .collect()
}

fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(KolosalError::TrainingError("Empty dataset".into()));
    }
    if x.nrows() != y.len() {
        return Err(KolosalError::ShapeError {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }
    Ok(())
}

/// Gaussian Naive Bayes Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Mean of each feature, one row per class
    means: Vec<Vec<f64>>,
    /// Variance of each feature, one row per class
    variances: Vec<Vec<f64>>,
    /// Prior probability of each class
    priors: Vec<f64>,
    classes: Vec<f64>,
    /// Smoothing added to every variance
    var_smoothing: f64,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self {
            means: Vec::new(),
            variances: Vec::new(),
            priors: Vec::new(),
            classes: Vec::new(),
            var_smoothing: 1e-9,
        }
    }
}

impl GaussianNaiveBayes {
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn log_likelihood(&self, x: ArrayView1<f64>, class_idx: usize) -> f64 {
        x.iter()
            .zip(self.means[class_idx].iter())
            .zip(self.variances[class_idx].iter())
            .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
            .sum()
    }

    fn joint_log_likelihood(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(KolosalError::ModelNotFitted);
        }
        check_fitted_width(self.means[0].len(), x)?;
        let mut log_probs = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for j in 0..self.classes.len() {
                log_probs[[i, j]] = self.priors[j].ln() + self.log_likelihood(row, j);
            }
        }
        Ok(log_probs)
    }
}

impl Component for GaussianNaiveBayes {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("gaussian_nb", "Gaussian Naive Bayes")
            .classifier(true, false)
            .with_input(&[DataKind::Dense, DataKind::SignedData, DataKind::UnsignedData])
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::log_float("var_smoothing", 1e-11, 1e-5, 1e-9)?)?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.var_smoothing = param_f64(configuration, "var_smoothing")?;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();

        self.classes = unique_classes(y);
        self.means.clear();
        self.variances.clear();
        self.priors.clear();

        for &class in &self.classes {
            let indices = class_indices(y, class);
            self.priors.push(indices.len() as f64 / n_samples);

            // Single-pass Welford's algorithm for mean and variance
            let mut feature_means = vec![0.0; n_features];
            let mut feature_m2 = vec![0.0; n_features];
            for (count, &idx) in indices.iter().enumerate() {
                for (j, &val) in x.row(idx).iter().enumerate() {
                    let delta = val - feature_means[j];
                    feature_means[j] += delta / (count + 1) as f64;
                    feature_m2[j] += delta * (val - feature_means[j]);
                }
            }
            let n_class = indices.len() as f64;
            self.variances
                .push(feature_m2.iter().map(|&m2| m2 / n_class + self.var_smoothing).collect());
            self.means.push(feature_means);
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(argmax_labels(&self.joint_log_likelihood(x)?, &self.classes))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(normalize_log_proba(self.joint_log_likelihood(x)?))
    }
}

/// Multinomial Naive Bayes (for count data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNaiveBayes {
    /// Log probability of each feature, one row per class
    feature_log_probs: Vec<Vec<f64>>,
    class_log_priors: Vec<f64>,
    classes: Vec<f64>,
    /// Additive (Laplace) smoothing
    alpha: f64,
    /// Learn class priors; uniform priors otherwise
    fit_prior: bool,
}

impl Default for MultinomialNaiveBayes {
    fn default() -> Self {
        Self {
            feature_log_probs: Vec::new(),
            class_log_priors: Vec::new(),
            classes: Vec::new(),
            alpha: 1.0,
            fit_prior: true,
        }
    }
}

impl MultinomialNaiveBayes {
    fn joint_log_likelihood(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(KolosalError::ModelNotFitted);
        }
        check_fitted_width(self.feature_log_probs[0].len(), x)?;
        let mut log_probs = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for j in 0..self.classes.len() {
                let ll: f64 = row
                    .iter()
                    .zip(self.feature_log_probs[j].iter())
                    .map(|(&count, &lp)| count * lp)
                    .sum();
                log_probs[[i, j]] = self.class_log_priors[j] + ll;
            }
        }
        Ok(log_probs)
    }
}

impl Component for MultinomialNaiveBayes {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("multinomial_nb", "Multinomial Naive Bayes")
            .classifier(true, false)
            .with_input(&[DataKind::Dense, DataKind::Sparse, DataKind::UnsignedData])
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::log_float("alpha", 1e-2, 100.0, 1.0)?)?;
        cs.add_hyperparameter(Hyperparameter::boolean("fit_prior", true))?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.alpha = param_f64(configuration, "alpha")?;
        self.fit_prior = param_bool(configuration, "fit_prior")?;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if x.iter().any(|&v| v < 0.0) {
            return Err(KolosalError::TrainingError(
                "Multinomial Naive Bayes requires non-negative features".into(),
            ));
        }
        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();

        self.classes = unique_classes(y);
        self.feature_log_probs.clear();
        self.class_log_priors.clear();
        let n_classes = self.classes.len() as f64;

        for &class in &self.classes {
            let indices = class_indices(y, class);
            self.class_log_priors.push(if self.fit_prior {
                (indices.len() as f64 / n_samples).ln()
            } else {
                (1.0 / n_classes).ln()
            });

            let mut feature_counts = vec![0.0; n_features];
            for &idx in &indices {
                for (j, &val) in x.row(idx).iter().enumerate() {
                    feature_counts[j] += val;
                }
            }
            let total = feature_counts.iter().sum::<f64>() + self.alpha * n_features as f64;
            self.feature_log_probs
                .push(feature_counts.iter().map(|&c| ((c + self.alpha) / total).ln()).collect());
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(argmax_labels(&self.joint_log_likelihood(x)?, &self.classes))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(normalize_log_proba(self.joint_log_likelihood(x)?))
    }
}
