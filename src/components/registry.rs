//! Name-based lookup of component factories

use super::base::{factory, ComponentFactory};
use super::classification::{GaussianNaiveBayes, KNearestNeighbors, MultinomialNaiveBayes, SgdClassifier};
use super::data_preprocessing::{Imputation, MinMaxScaler, NoRescaling, StandardScaler};
use super::feature_preprocessing::{Densifier, NoPreprocessing, SelectPercentile};
use crate::error::{KolosalError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Component factories keyed by short name
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: BTreeMap<String, ComponentFactory>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every component shipped with the crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for f in [
            factory::<Imputation>(),
            factory::<NoRescaling>(),
            factory::<StandardScaler>(),
            factory::<MinMaxScaler>(),
            factory::<NoPreprocessing>(),
            factory::<Densifier>(),
            factory::<SelectPercentile>(),
            factory::<GaussianNaiveBayes>(),
            factory::<KNearestNeighbors>(),
            factory::<MultinomialNaiveBayes>(),
            factory::<SgdClassifier>(),
        ] {
            // built-in names are distinct
            let _ = registry.register(f);
        }
        registry
    }

    /// Add a factory under its component's short name
    pub fn register(&mut self, factory: ComponentFactory) -> Result<()> {
        let name = factory().properties().short_name;
        if self.factories.contains_key(&name) {
            return Err(KolosalError::ConfigError(format!("Component '{}' is already registered", name)));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<ComponentFactory> {
        self.factories.get(name).cloned().ok_or_else(|| {
            KolosalError::ConfigError(format!(
                "Unknown component '{}'; registered: {:?}",
                name,
                self.names()
            ))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
