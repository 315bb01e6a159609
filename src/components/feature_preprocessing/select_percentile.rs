use crate::components::base::{check_fitted_width, param_f64, Component};
use crate::components::properties::ComponentProperties;
use crate::configspace::{Configuration, ConfigurationSpace, Hyperparameter};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Keeps the given percentile of features with the highest variance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectPercentile {
    percentile: f64,
    /// Indices of retained columns, in original order
    selected: Option<Vec<usize>>,
    n_features_in: usize,
}

impl Default for SelectPercentile {
    fn default() -> Self {
        Self {
            percentile: 50.0,
            selected: None,
            n_features_in: 0,
        }
    }
}

impl SelectPercentile {
    pub fn selected_features(&self) -> Option<&[usize]> {
        self.selected.as_deref()
    }
}

impl Component for SelectPercentile {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("select_percentile", "Select Percentile")
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::float("percentile", 1.0, 99.0, 50.0)?)?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.percentile = param_f64(configuration, "percentile")?;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(KolosalError::TrainingError("Empty dataset".into()));
        }
        let variances = x.var_axis(Axis(0), 0.0);
        let n_keep = ((self.percentile / 100.0 * x.ncols() as f64).ceil() as usize).clamp(1, x.ncols());

        let mut ranked: Vec<usize> = (0..x.ncols()).collect();
        // stable sort keeps lower indices first among equal variances
        ranked.sort_by(|&a, &b| {
            variances[b]
                .partial_cmp(&variances[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut selected = ranked[..n_keep].to_vec();
        selected.sort_unstable();

        self.n_features_in = x.ncols();
        self.selected = Some(selected);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let selected = self.selected.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        check_fitted_width(self.n_features_in, x)?;
        Ok(x.select(Axis(1), selected))
    }
}
