//! Missing value imputation

use crate::components::base::{check_fitted_width, param_str, Component};
use crate::components::properties::ComponentProperties;
use crate::configspace::{Configuration, ConfigurationSpace, Hyperparameter};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Imputation strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    Mean,
    Median,
    MostFrequent,
}

impl ImputeStrategy {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "most_frequent" => Ok(Self::MostFrequent),
            other => Err(KolosalError::InvalidParameter {
                name: "strategy".to_string(),
                value: other.to_string(),
                reason: "unknown imputation strategy".to_string(),
            }),
        }
    }

    fn fill_value(&self, mut valid: Vec<f64>) -> f64 {
        if valid.is_empty() {
            return 0.0;
        }
        match self {
            Self::Mean => valid.iter().sum::<f64>() / valid.len() as f64,
            Self::Median => {
                valid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = valid.len() / 2;
                if valid.len() % 2 == 0 {
                    (valid[mid - 1] + valid[mid]) / 2.0
                } else {
                    valid[mid]
                }
            }
            Self::MostFrequent => {
                valid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                // smallest value wins ties
                let mut best = (valid[0], 0usize);
                let mut run = (valid[0], 0usize);
                for &v in &valid {
                    if v == run.0 {
                        run.1 += 1;
                    } else {
                        run = (v, 1);
                    }
                    if run.1 > best.1 {
                        best = run;
                    }
                }
                best.0
            }
        }
    }
}

/// Replaces NaN entries column by column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputation {
    strategy: ImputeStrategy,
    fill_values: Option<Vec<f64>>,
}

impl Default for Imputation {
    fn default() -> Self {
        Self {
            strategy: ImputeStrategy::Mean,
            fill_values: None,
        }
    }
}

impl Imputation {
    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }
}

impl Component for Imputation {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("imputation", "Imputation")
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::categorical(
            "strategy",
            &["mean", "median", "most_frequent"],
            Some("mean"),
        )?)?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.strategy = ImputeStrategy::parse(param_str(configuration, "strategy")?)?;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        let fill_values = x
            .columns()
            .into_iter()
            .map(|col| {
                let valid: Vec<f64> = col.iter().filter(|v| !v.is_nan()).copied().collect();
                self.strategy.fill_value(valid)
            })
            .collect();
        self.fill_values = Some(fill_values);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fill_values = self.fill_values.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        check_fitted_width(fill_values.len(), x)?;
        let mut out = x.clone();
        for (mut col, &fill) in out.columns_mut().into_iter().zip(fill_values.iter()) {
            col.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mean_imputation() {
        let x = array![[1.0, f64::NAN], [3.0, 4.0], [f64::NAN, 8.0]];
        let mut imputer = Imputation::default();
        imputer.fit(&x, &Array1::zeros(3)).unwrap();
        let out = imputer.transform(&x).unwrap();
        assert_eq!(out, array![[1.0, 6.0], [3.0, 4.0], [2.0, 8.0]]);
    }

    #[test]
    fn test_most_frequent_and_median() {
        assert_eq!(ImputeStrategy::MostFrequent.fill_value(vec![2.0, 1.0, 2.0, 1.0, 3.0]), 1.0);
        assert_eq!(ImputeStrategy::Median.fill_value(vec![4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(ImputeStrategy::Mean.fill_value(vec![]), 0.0);
    }

    #[test]
    fn test_transform_requires_fit() {
        let imputer = Imputation::default();
        let err = imputer.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, KolosalError::ModelNotFitted));
    }
}
