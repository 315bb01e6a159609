//! Component trait shared by every pipeline building block

use super::properties::ComponentProperties;
use crate::configspace::{Configuration, ConfigurationSpace, HyperparameterValue};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use std::fmt;
use std::sync::Arc;

/// A single concrete algorithm with its own hyperparameters.
///
/// Capability queries (`properties`, `hyperparameter_search_space`) are pure.
/// Runtime methods a component does not implement report
/// [`KolosalError::UnsupportedOperation`].
pub trait Component: Send + Sync + fmt::Debug {
    /// Static compatibility metadata
    fn properties(&self) -> ComponentProperties;

    /// The component's own hyperparameters for the given data
    fn hyperparameter_search_space(&self, dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace>;

    /// Apply a configuration of [`Component::hyperparameter_search_space`]
    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()>;

    /// Seed for components with randomised fitting
    fn set_random_state(&mut self, _seed: u64) {}

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn transform(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(unsupported(&self.properties(), "transform"))
    }

    fn predict(&self, _x: &Array2<f64>) -> Result<Array1<f64>> {
        Err(unsupported(&self.properties(), "predict"))
    }

    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(unsupported(&self.properties(), "predict_proba"))
    }

    fn supports_iterative_fit(&self) -> bool {
        false
    }

    /// Continue fitting for `n_iter` more iterations
    fn iterative_fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>, _n_iter: usize) -> Result<()> {
        Err(unsupported(&self.properties(), "iterative_fit"))
    }

    /// Whether fitting has reached the configured budget
    fn configuration_fully_fitted(&self) -> bool {
        true
    }
}

/// Creates fresh, unconfigured component instances
pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Factory for any component with a `Default` constructor
pub fn factory<C: Component + Default + 'static>() -> ComponentFactory {
    Arc::new(|| Box::new(C::default()) as Box<dyn Component>)
}

pub(crate) fn unsupported(props: &ComponentProperties, operation: &str) -> KolosalError {
    KolosalError::UnsupportedOperation(format!("{} does not support {}", props.short_name, operation))
}

fn param<'a>(configuration: &'a Configuration, name: &str) -> Result<&'a HyperparameterValue> {
    configuration.get(name).ok_or_else(|| KolosalError::InvalidParameter {
        name: name.to_string(),
        value: "<missing>".to_string(),
        reason: "required hyperparameter not set".to_string(),
    })
}

fn wrong_type(name: &str, value: &HyperparameterValue, expected: &str) -> KolosalError {
    KolosalError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("expected {}", expected),
    }
}

pub(crate) fn param_f64(configuration: &Configuration, name: &str) -> Result<f64> {
    let value = param(configuration, name)?;
    value.as_float().ok_or_else(|| wrong_type(name, value, "a float"))
}

pub(crate) fn param_usize(configuration: &Configuration, name: &str) -> Result<usize> {
    let value = param(configuration, name)?;
    value
        .as_int()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| wrong_type(name, value, "a non-negative integer"))
}

pub(crate) fn param_str<'a>(configuration: &'a Configuration, name: &str) -> Result<&'a str> {
    let value = param(configuration, name)?;
    value.as_str().ok_or_else(|| wrong_type(name, value, "a string"))
}

pub(crate) fn param_bool(configuration: &Configuration, name: &str) -> Result<bool> {
    let value = param(configuration, name)?;
    value.as_bool().ok_or_else(|| wrong_type(name, value, "a boolean"))
}

pub(crate) fn check_fitted_width(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(KolosalError::ShapeError {
            expected: format!("{} columns", expected),
            actual: format!("{} columns", x.ncols()),
        });
    }
    Ok(())
}

/// Sorted distinct class labels
pub(crate) fn unique_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    classes.dedup();
    classes
}

/// Index of the largest entry of each row mapped to its class label
pub(crate) fn argmax_labels(scores: &Array2<f64>, classes: &[f64]) -> Array1<f64> {
    scores
        .rows()
        .into_iter()
        .map(|row| {
            let best = row
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(0);
            classes[best]
        })
        .collect()
}
