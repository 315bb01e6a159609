//! Feature rescaling

use crate::components::base::{check_fitted_width, Component};
use crate::components::properties::{ComponentProperties, DataKind};
use crate::configspace::{Configuration, ConfigurationSpace};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column `(center, scale)` pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScalerParams {
    center: Vec<f64>,
    scale: Vec<f64>,
}

impl ScalerParams {
    fn apply(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_fitted_width(self.center.len(), x)?;
        let mut out = x.clone();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (center, scale) = (self.center[j], self.scale[j]);
            col.mapv_inplace(|v| (v - center) / scale);
        }
        Ok(out)
    }
}

/// Leaves the data untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoRescaling;

impl Component for NoRescaling {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("none", "No Rescaling")
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

/// z-score normalization: (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Option<ScalerParams>,
}

impl Component for StandardScaler {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("standardize", "Standard Scaler").with_output(&[DataKind::Input, DataKind::SignedData])
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(KolosalError::TrainingError("Empty dataset".into()));
        }
        let mut params = ScalerParams::default();
        for col in x.columns() {
            let n = col.len() as f64;
            let mean = col.sum() / n;
            let std = (col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
            params.center.push(mean);
            params.scale.push(if std > 0.0 { std } else { 1.0 });
        }
        self.params = Some(params);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.params.as_ref().ok_or(KolosalError::ModelNotFitted)?.apply(x)
    }
}

/// Min-Max scaling into [0, 1]; produces non-negative dense data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Option<ScalerParams>,
}

impl Component for MinMaxScaler {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("minmax", "Min-Max Scaler")
            .with_input(&[DataKind::Dense, DataKind::SignedData, DataKind::UnsignedData])
            .with_output(&[DataKind::Input, DataKind::UnsignedData])
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(KolosalError::TrainingError("Empty dataset".into()));
        }
        let mut params = ScalerParams::default();
        for col in x.columns() {
            let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            params.center.push(min);
            params.scale.push(if range > 0.0 { range } else { 1.0 });
        }
        self.params = Some(params);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.params.as_ref().ok_or(KolosalError::ModelNotFitted)?.apply(x)
    }
}
