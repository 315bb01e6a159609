//! Pipeline configuration

use crate::compat::{CompatibilityMode, Selectors};
use crate::dataset::{DatasetProperties, PropertyValue};
use serde::{Deserialize, Serialize};

/// How the final estimator's predictions are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Rounded to the nearest integer (class labels)
    #[default]
    Integer,
    /// Returned unchanged
    Float,
}

impl OutputKind {
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            Self::Integer => value.round(),
            Self::Float => value,
        }
    }
}

/// Configuration for building a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset facts driving compatibility and search-space shape
    pub dataset_properties: DatasetProperties,

    /// Components allowed per step name
    pub include: Selectors,

    /// Components removed per step name
    pub exclude: Selectors,

    /// Seed handed to every component
    pub random_state: u64,

    pub compatibility_mode: CompatibilityMode,

    pub output_kind: OutputKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_properties: DatasetProperties::new(),
            include: Selectors::new(),
            exclude: Selectors::new(),
            random_state: 1,
            compatibility_mode: CompatibilityMode::Propagate,
            output_kind: OutputKind::Integer,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset_properties(mut self, properties: DatasetProperties) -> Self {
        self.dataset_properties = properties;
        self
    }

    /// Set a single dataset property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.dataset_properties.set(key, value);
        self
    }

    /// Restrict `step` to the given components
    pub fn with_include<S: AsRef<str>>(mut self, step: impl Into<String>, components: &[S]) -> Self {
        self.include
            .insert(step.into(), components.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    /// Remove the given components from `step`
    pub fn with_exclude<S: AsRef<str>>(mut self, step: impl Into<String>, components: &[S]) -> Self {
        self.exclude
            .insert(step.into(), components.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_compatibility_mode(mut self, mode: CompatibilityMode) -> Self {
        self.compatibility_mode = mode;
        self
    }

    pub fn with_output_kind(mut self, kind: OutputKind) -> Self {
        self.output_kind = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .with_property("sparse", true)
            .with_include("classifier", &["knn"])
            .with_random_state(7);
        assert!(config.dataset_properties.sparse());
        assert_eq!(config.include["classifier"], vec!["knn".to_string()]);
        assert_eq!(config.random_state, 7);
        assert_eq!(config.output_kind, OutputKind::Integer);
    }

    #[test]
    fn test_json_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"output_kind": "float"}"#).unwrap();
        assert_eq!(config.output_kind, OutputKind::Float);
        assert_eq!(config.random_state, 1);
        assert_eq!(config.compatibility_mode, CompatibilityMode::Propagate);
    }

    #[test]
    fn test_output_cast() {
        assert_eq!(OutputKind::Integer.cast(1.6), 2.0);
        assert_eq!(OutputKind::Float.cast(1.6), 1.6);
    }
}
