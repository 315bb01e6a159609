//! Stochastic Gradient Descent (SGD) classifier
//!
//! One-vs-rest linear models trained one sample at a time. Supports
//! incremental training through [`Component::iterative_fit`].

use crate::components::base::{
    argmax_labels, check_fitted_width, param_f64, param_str, unique_classes, Component,
};
use crate::components::properties::ComponentProperties;
use crate::configspace::{Condition, Configuration, ConfigurationSpace, Hyperparameter};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Epoch budget after which a configuration counts as fully fitted
pub const MAX_ITER: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SgdLoss {
    Hinge,         // SVM-like
    Log,           // Logistic regression
    ModifiedHuber, // Smooth hinge
}

impl SgdLoss {
    /// Loss and its derivative with respect to the margin score
    fn evaluate(&self, y: f64, score: f64) -> (f64, f64) {
        let z = y * score;
        match self {
            Self::Hinge => {
                if z < 1.0 {
                    (1.0 - z, -y)
                } else {
                    (0.0, 0.0)
                }
            }
            Self::Log => {
                let loss = if z > 18.0 { (-z).exp() } else { (1.0 + (-z).exp()).ln() };
                (loss, -y / (1.0 + z.exp()))
            }
            Self::ModifiedHuber => {
                if z >= 1.0 {
                    (0.0, 0.0)
                } else if z >= -1.0 {
                    ((1.0 - z).powi(2), -2.0 * y * (1.0 - z))
                } else {
                    (-4.0 * z, -4.0 * y)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningRateSchedule {
    Constant,
    Optimal,    // 1 / (alpha * (t + t0))
    InvScaling, // eta0 / t^power_t
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdConfig {
    pub loss: SgdLoss,
    pub learning_rate: LearningRateSchedule,
    pub eta0: f64,
    pub alpha: f64, // L2 regularization
    pub tol: f64,
    pub power_t: f64, // For InvScaling schedule
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            loss: SgdLoss::Log,
            learning_rate: LearningRateSchedule::InvScaling,
            eta0: 0.01,
            alpha: 0.0001,
            tol: 1e-4,
            power_t: 0.5,
        }
    }
}

fn get_lr(config: &SgdConfig, t: usize) -> f64 {
    match config.learning_rate {
        LearningRateSchedule::Constant => config.eta0,
        LearningRateSchedule::Optimal => {
            let t0 = 1.0 / (config.alpha * config.eta0);
            1.0 / (config.alpha * (t as f64 + t0))
        }
        LearningRateSchedule::InvScaling => config.eta0 / (t as f64).powf(config.power_t),
    }
}

/// Training progress kept between `iterative_fit` calls
#[derive(Debug, Clone)]
struct SgdState {
    classes: Vec<f64>,
    /// One weight row per class
    weights: Array2<f64>,
    bias: Array1<f64>,
    rng: Xoshiro256PlusPlus,
    t: usize,
    epochs: usize,
    prev_loss: f64,
    converged: bool,
}

#[derive(Debug, Clone)]
pub struct SgdClassifier {
    pub config: SgdConfig,
    random_state: u64,
    state: Option<SgdState>,
}

impl Default for SgdClassifier {
    fn default() -> Self {
        Self {
            config: SgdConfig::default(),
            random_state: 1,
            state: None,
        }
    }
}

impl SgdClassifier {
    /// Epochs run since the last reset
    pub fn n_iter(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.epochs)
    }

    fn init_state(&self, x: &Array2<f64>, y: &Array1<f64>) -> SgdState {
        let classes = unique_classes(y);
        SgdState {
            weights: Array2::zeros((classes.len(), x.ncols())),
            bias: Array1::zeros(classes.len()),
            classes,
            rng: Xoshiro256PlusPlus::seed_from_u64(self.random_state),
            t: 1,
            epochs: 0,
            prev_loss: f64::MAX,
            converged: false,
        }
    }

    fn run_epochs(&self, state: &mut SgdState, x: &Array2<f64>, y: &Array1<f64>, n_iter: usize) {
        let n = x.nrows();
        let mut indices: Vec<usize> = (0..n).collect();
        let budget = n_iter.min(MAX_ITER.saturating_sub(state.epochs));

        for _ in 0..budget {
            if state.converged {
                break;
            }
            indices.shuffle(&mut state.rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = x.row(i);
                let lr = get_lr(&self.config, state.t);
                for (k, &class) in state.classes.iter().enumerate() {
                    let target = if y[i] == class { 1.0 } else { -1.0 };
                    let score = xi.dot(&state.weights.row(k)) + state.bias[k];
                    let (loss, dloss) = self.config.loss.evaluate(target, score);
                    epoch_loss += loss;

                    let mut w = state.weights.row_mut(k);
                    w *= 1.0 - lr * self.config.alpha;
                    w.scaled_add(-lr * dloss, &xi);
                    state.bias[k] -= lr * dloss;
                }
                state.t += 1;
            }

            epoch_loss /= n as f64;
            state.epochs += 1;
            if state.prev_loss - epoch_loss < self.config.tol && state.epochs > 1 {
                state.converged = true;
            }
            state.prev_loss = epoch_loss;
        }
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<(Array2<f64>, &[f64])> {
        let state = self.state.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        check_fitted_width(state.weights.ncols(), x)?;
        let scores = x.dot(&state.weights.t()) + &state.bias;
        Ok((scores, &state.classes))
    }
}

impl Component for SgdClassifier {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("sgd", "Stochastic Gradient Descent Classifier")
            .classifier(true, false)
            .non_deterministic()
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameters([
            Hyperparameter::categorical("loss", &["hinge", "log", "modified_huber"], Some("log"))?,
            Hyperparameter::log_float("alpha", 1e-7, 1e-1, 1e-4)?,
            Hyperparameter::log_float("tol", 1e-5, 1e-1, 1e-4)?,
            Hyperparameter::categorical("learning_rate", &["optimal", "invscaling", "constant"], Some("invscaling"))?,
            Hyperparameter::log_float("eta0", 1e-7, 1e-1, 1e-2)?,
            Hyperparameter::float("power_t", 1e-5, 1.0, 0.5)?,
        ])?;
        cs.add_condition(Condition::equals("power_t", "learning_rate", "invscaling"))?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.config.loss = match param_str(configuration, "loss")? {
            "hinge" => SgdLoss::Hinge,
            "modified_huber" => SgdLoss::ModifiedHuber,
            _ => SgdLoss::Log,
        };
        self.config.learning_rate = match param_str(configuration, "learning_rate")? {
            "optimal" => LearningRateSchedule::Optimal,
            "constant" => LearningRateSchedule::Constant,
            _ => LearningRateSchedule::InvScaling,
        };
        self.config.alpha = param_f64(configuration, "alpha")?;
        self.config.tol = param_f64(configuration, "tol")?;
        self.config.eta0 = param_f64(configuration, "eta0")?;
        if self.config.learning_rate == LearningRateSchedule::InvScaling {
            self.config.power_t = param_f64(configuration, "power_t")?;
        }
        Ok(())
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = seed;
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.state = None;
        self.iterative_fit(x, y, MAX_ITER)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (scores, classes) = self.decision_function(x)?;
        Ok(argmax_labels(&scores, classes))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (scores, _) = self.decision_function(x)?;
        let mut proba = scores.mapv(|s| 1.0 / (1.0 + (-s).exp()));
        let n_classes = proba.ncols() as f64;
        for mut row in proba.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                row.fill(1.0 / n_classes);
            }
        }
        Ok(proba)
    }

    fn supports_iterative_fit(&self) -> bool {
        true
    }

    fn iterative_fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, n_iter: usize) -> Result<()> {
        if x.nrows() == 0 {
            return Err(KolosalError::TrainingError("Empty dataset".into()));
        }
        if x.nrows() != y.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }
        let mut state = match self.state.take() {
            Some(state) if state.weights.ncols() == x.ncols() => state,
            _ => self.init_state(x, y),
        };
        self.run_epochs(&mut state, x, y, n_iter);
        tracing::debug!(epochs = state.epochs, converged = state.converged, "sgd iterative fit");
        self.state = Some(state);
        Ok(())
    }

    fn configuration_fully_fitted(&self) -> bool {
        self.state
            .as_ref()
            .map_or(false, |s| s.converged || s.epochs >= MAX_ITER)
    }
}
