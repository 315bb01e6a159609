use crate::components::base::Component;
use crate::components::properties::{ComponentProperties, DataKind};
use crate::configspace::{Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::Result;
use ndarray::{Array1, Array2};

/// Converts sparse input into dense output.
///
/// Arrays are always stored densely, so the transform itself is the identity;
/// what matters is the declared `Sparse -> Dense` signature, which lets
/// dense-only estimators follow it on sparse datasets.
#[derive(Debug, Clone, Default)]
pub struct Densifier;

impl Component for Densifier {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("densifier", "Densifier")
            .with_input(&[DataKind::Sparse, DataKind::SignedData, DataKind::UnsignedData])
            .with_output(&[DataKind::Dense, DataKind::Input])
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
        Ok(x.to_owned())
    }
}
