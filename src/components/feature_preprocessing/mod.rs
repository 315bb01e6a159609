//! Feature preprocessing components

mod densifier;
mod select_percentile;

pub use densifier::Densifier;
pub use select_percentile::SelectPercentile;

use super::base::{factory, Component};
use super::choice::ComponentChoice;
use super::properties::ComponentProperties;
use crate::configspace::{Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::Result;
use ndarray::{Array1, Array2};

/// Passes features through unchanged
#[derive(Debug, Clone, Default)]
pub struct NoPreprocessing;

impl Component for NoPreprocessing {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("no_preprocessing", "No Preprocessing")
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(x.clone())
    }
}

/// Choice over the built-in feature preprocessors
pub fn feature_preprocessor_choice() -> Result<ComponentChoice> {
    Ok(ComponentChoice::new(vec![
        factory::<NoPreprocessing>(),
        factory::<Densifier>(),
        factory::<SelectPercentile>(),
    ])?
    .with_default_preferences(&["no_preprocessing"]))
}
