//! Routing a pipeline configuration to its steps

use super::config::PipelineConfig;
use super::step::{PipelineNode, PipelineStep};
use crate::compat::step_selectors;
use crate::configspace::{Configuration, ConfigurationSpace};
use crate::error::Result;
use std::sync::Arc;

/// Splits a pipeline configuration into per-step configurations and applies them
pub struct HyperparameterRouter<'a> {
    config: &'a PipelineConfig,
}

impl<'a> HyperparameterRouter<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// The step's own space, built fresh from the current dataset properties
    fn step_space(&self, step: &PipelineStep) -> Result<ConfigurationSpace> {
        let props = &self.config.dataset_properties;
        match &step.node {
            PipelineNode::Component(node) => node.component().hyperparameter_search_space(props),
            PipelineNode::Choice(choice) => {
                let (include, exclude) = step_selectors(&step.name, &self.config.include, &self.config.exclude);
                choice.hyperparameter_search_space(props, include, exclude, None)
            }
        }
    }

    /// Values of `configuration` prefixed with the step name, validated
    /// against the step's space
    pub fn step_configuration(&self, step: &PipelineStep, configuration: &Configuration) -> Result<Configuration> {
        let space = Arc::new(self.step_space(step)?);
        Configuration::new(space, configuration.sub_values(&step.name))
    }

    /// Configure fresh copies of `steps`.
    ///
    /// Nothing is returned unless every step accepts its share, so callers
    /// can swap the result in without leaving a half-configured pipeline.
    pub fn route(&self, steps: &[PipelineStep], configuration: &Configuration) -> Result<Vec<PipelineStep>> {
        let props = &self.config.dataset_properties;
        let mut staged = Vec::with_capacity(steps.len());
        for step in steps {
            let sub_configuration = self.step_configuration(step, configuration)?;
            let mut fresh = step.unconfigured();
            fresh.node.set_random_state(self.config.random_state);
            match &mut fresh.node {
                PipelineNode::Component(node) => node.component_mut().set_hyperparameters(&sub_configuration)?,
                PipelineNode::Choice(choice) => choice.set_hyperparameters(&sub_configuration, props)?,
            }
            tracing::trace!(step = %step.name, values = sub_configuration.len(), "configured step");
            staged.push(fresh);
        }
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopipeline::{ClassificationTemplate, PipelineTemplate, SearchSpaceComposer};
    use crate::configspace::HyperparameterValue;

    #[test]
    fn test_route_default_configuration() {
        let steps = ClassificationTemplate.steps().unwrap();
        let config = PipelineConfig::default();
        let space = Arc::new(SearchSpaceComposer::new(&config).compose(&steps).unwrap().space);
        let default = space.default_configuration().unwrap();

        let routed = HyperparameterRouter::new(&config).route(&steps, &default).unwrap();
        assert_eq!(routed.len(), 4);
        let classifier = routed[3].node.as_choice().unwrap();
        assert_eq!(classifier.selected_name(), Some("sgd"));
        // originals stay untouched
        assert!(steps[3].node.as_choice().unwrap().selected_name().is_none());
    }

    #[test]
    fn test_step_configuration_strips_prefix() {
        let steps = ClassificationTemplate.steps().unwrap();
        let config = PipelineConfig::default();
        let space = Arc::new(SearchSpaceComposer::new(&config).compose(&steps).unwrap().space);
        let default = space.default_configuration().unwrap();

        let router = HyperparameterRouter::new(&config);
        let imputation = router.step_configuration(&steps[0], &default).unwrap();
        assert_eq!(imputation.get("strategy"), Some(&HyperparameterValue::from("mean")));
        let classifier = router.step_configuration(&steps[3], &default).unwrap();
        assert_eq!(classifier.get("__choice__"), Some(&HyperparameterValue::from("sgd")));
        assert!(classifier.get("sgd:alpha").is_some());
    }
}
