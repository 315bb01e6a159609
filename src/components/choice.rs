//! Polymorphic selection among interchangeable components

use super::base::{Component, ComponentFactory};
use super::properties::ComponentProperties;
use crate::configspace::{Configuration, ConfigurationSpace, Hyperparameter, HyperparameterValue};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the categorical hyperparameter selecting the active component
pub const CHOICE_HYPERPARAMETER: &str = "__choice__";

/// A named set of components of which exactly one is active per configuration
pub struct ComponentChoice {
    /// Keyed by short name, so iteration order is the sorted name order
    candidates: BTreeMap<String, ComponentFactory>,
    preferences: Vec<String>,
    random_state: Option<u64>,
    selected: Option<(String, Box<dyn Component>)>,
}

impl fmt::Debug for ComponentChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentChoice")
            .field("candidates", &self.candidates.keys().collect::<Vec<_>>())
            .field("preferences", &self.preferences)
            .field("selected", &self.selected_name())
            .finish()
    }
}

impl ComponentChoice {
    /// Create a choice over the given factories; names come from each component's properties
    pub fn new(factories: impl IntoIterator<Item = ComponentFactory>) -> Result<Self> {
        let mut candidates = BTreeMap::new();
        for factory in factories {
            let name = factory().properties().short_name;
            if candidates.insert(name.clone(), factory).is_some() {
                return Err(KolosalError::ConfigError(format!("Duplicate component '{}' in choice", name)));
            }
        }
        if candidates.is_empty() {
            return Err(KolosalError::ConfigError("A choice needs at least one component".to_string()));
        }
        Ok(Self {
            candidates,
            preferences: Vec::new(),
            random_state: None,
            selected: None,
        })
    }

    /// Components tried in order when picking the default selection
    pub fn with_default_preferences(mut self, preferences: &[&str]) -> Self {
        self.preferences = preferences.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Copy with the same candidates and nothing selected
    pub fn unconfigured(&self) -> Self {
        Self {
            candidates: self.candidates.clone(),
            preferences: self.preferences.clone(),
            random_state: self.random_state,
            selected: None,
        }
    }

    /// All candidate names, sorted
    pub fn component_names(&self) -> Vec<&str> {
        self.candidates.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.candidates.contains_key(name)
    }

    /// Fresh, unconfigured instance of a candidate
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Component>> {
        let factory = self
            .candidates
            .get(name)
            .ok_or_else(|| KolosalError::InvalidSelector(format!("Unknown component '{}'", name)))?;
        let mut component = factory();
        if let Some(seed) = self.random_state {
            component.set_random_state(seed);
        }
        Ok(component)
    }

    /// Candidates usable under `dataset_properties`, restricted by `include` or `exclude`.
    ///
    /// `include` and `exclude` cannot be combined and may only name known
    /// components. Components that cannot serve the dataset's task flags
    /// (multiclass, multilabel, target type) are left out.
    pub fn available_components(
        &self,
        dataset_properties: &DatasetProperties,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Result<Vec<(String, ComponentProperties)>> {
        if include.is_some() && exclude.is_some() {
            return Err(KolosalError::InvalidSelector(
                "The arguments include and exclude cannot be used together".to_string(),
            ));
        }
        for name in include.into_iter().chain(exclude).flatten() {
            if !self.candidates.contains_key(name) {
                return Err(KolosalError::InvalidSelector(format!(
                    "Unknown component '{}'; should be one of {:?}",
                    name,
                    self.component_names()
                )));
            }
        }

        let mut available = Vec::new();
        for (name, factory) in &self.candidates {
            if include.map_or(false, |inc| !inc.contains(name)) || exclude.map_or(false, |exc| exc.contains(name)) {
                continue;
            }
            let properties = factory().properties();
            if !properties.supports_task(dataset_properties) {
                continue;
            }
            available.push((name.clone(), properties));
        }
        Ok(available)
    }

    /// Default selection among `available`: first available preference, else the first name
    pub fn default_choice<'a>(&self, available: &'a [String]) -> Option<&'a str> {
        self.preferences
            .iter()
            .find_map(|p| available.iter().find(|a| *a == p))
            .or_else(|| available.first())
            .map(String::as_str)
    }

    /// Composite space: `__choice__` plus every available component's space
    /// under `<component>:`, active only while that component is selected.
    pub fn hyperparameter_search_space(
        &self,
        dataset_properties: &DatasetProperties,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        default: Option<&str>,
    ) -> Result<ConfigurationSpace> {
        let available: Vec<String> = self
            .available_components(dataset_properties, include, exclude)?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        if available.is_empty() {
            return Err(KolosalError::NoValidPipeline(format!(
                "no component of {:?} is available for {}",
                self.component_names(),
                dataset_properties
            )));
        }

        let default = match default {
            Some(d) if available.iter().any(|a| a == d) => Some(d),
            Some(d) => {
                return Err(KolosalError::InvalidSelector(format!(
                    "Default component '{}' is not available",
                    d
                )))
            }
            None => self.default_choice(&available),
        };

        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::categorical(CHOICE_HYPERPARAMETER, &available, default)?)?;
        for name in &available {
            let sub_space = self.instantiate(name)?.hyperparameter_search_space(dataset_properties)?;
            cs.add_configuration_space(
                name,
                &sub_space,
                Some((CHOICE_HYPERPARAMETER, HyperparameterValue::Str(name.clone()))),
            )?;
        }
        Ok(cs)
    }

    /// Instantiate the selected component and apply its share of `configuration`
    pub fn set_hyperparameters(
        &mut self,
        configuration: &Configuration,
        dataset_properties: &DatasetProperties,
    ) -> Result<()> {
        let choice = configuration
            .get(CHOICE_HYPERPARAMETER)
            .and_then(HyperparameterValue::as_str)
            .ok_or_else(|| {
                KolosalError::ValidationError(format!("Configuration has no '{}' value", CHOICE_HYPERPARAMETER))
            })?
            .to_string();

        let mut component = self.instantiate(&choice)?;
        let sub_space = Arc::new(component.hyperparameter_search_space(dataset_properties)?);
        let sub_configuration = Configuration::new(sub_space, configuration.sub_values(&choice))?;
        component.set_hyperparameters(&sub_configuration)?;

        self.selected = Some((choice, component));
        Ok(())
    }

    pub fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
        if let Some((_, component)) = self.selected.as_mut() {
            component.set_random_state(seed);
        }
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn selected(&self) -> Option<&dyn Component> {
        self.selected.as_ref().map(|(_, c)| c.as_ref())
    }

    pub fn selected_mut(&mut self) -> Option<&mut dyn Component> {
        match self.selected.as_mut() {
            Some((_, component)) => Some(component.as_mut()),
            None => None,
        }
    }
}
