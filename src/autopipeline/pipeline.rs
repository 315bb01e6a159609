//! Configurable pipeline execution

use super::composer::SearchSpaceComposer;
use super::config::PipelineConfig;
use super::router::HyperparameterRouter;
use super::step::PipelineStep;
use super::template::{ClassificationTemplate, PipelineTemplate};
use crate::compat::CompatibilityMatrix;
use crate::components::Component;
use crate::configspace::{Configuration, ConfigurationSpace, HyperparameterValue};
use crate::dataset::DatasetProperties;
use crate::error::{KolosalError, Result};
use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Unconfigured,
    Configured,
    Fitted,
    /// Estimator trained incrementally, budget not yet exhausted
    IterativelyFitting,
    FullyFitted,
}

impl PipelineState {
    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted | Self::IterativelyFitting | Self::FullyFitted)
    }
}

/// How the initial configuration is supplied
#[derive(Debug, Clone, Default)]
enum InitialConfiguration {
    #[default]
    Default,
    Configuration(Configuration),
    Values(BTreeMap<String, HyperparameterValue>),
}

/// Builder for [`Pipeline`]
#[derive(Default)]
pub struct PipelineBuilder {
    steps: Option<Vec<PipelineStep>>,
    template: Option<Box<dyn PipelineTemplate>>,
    config: PipelineConfig,
    initial: InitialConfiguration,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit steps; take precedence over a template
    pub fn steps(mut self, steps: Vec<PipelineStep>) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn template(mut self, template: impl PipelineTemplate + 'static) -> Self {
        self.template = Some(Box::new(template));
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from a configuration of an equal search space
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.initial = InitialConfiguration::Configuration(configuration);
        self
    }

    /// Start from raw values, validated against the rebuilt search space
    pub fn values(mut self, values: BTreeMap<String, HyperparameterValue>) -> Self {
        self.initial = InitialConfiguration::Values(values);
        self
    }

    pub fn build(mut self) -> Result<Pipeline> {
        let steps = match (self.steps, self.template) {
            (Some(steps), _) => steps,
            (None, Some(template)) => template.steps()?,
            (None, None) => ClassificationTemplate.steps()?,
        };
        if steps.is_empty() {
            return Err(KolosalError::ConfigError("A pipeline needs at least one step".to_string()));
        }
        for (index, step) in steps.iter().enumerate() {
            // ':' separates a step name from its hyperparameter names
            if step.name.is_empty() || step.name.contains(':') {
                return Err(KolosalError::ConfigError(format!("Invalid step name '{}'", step.name)));
            }
            if steps[..index].iter().any(|s| s.name == step.name) {
                return Err(KolosalError::ConfigError(format!("Duplicate step name '{}'", step.name)));
            }
        }
        self.config.dataset_properties = self.config.dataset_properties.with_defaults();

        let composed = SearchSpaceComposer::new(&self.config).compose(&steps)?;
        let space = Arc::new(composed.space);

        let configuration = match self.initial {
            InitialConfiguration::Default => space.default_configuration()?,
            InitialConfiguration::Configuration(configuration) => configuration,
            InitialConfiguration::Values(values) => Configuration::new(Arc::clone(&space), values)?,
        };

        let mut pipeline = Pipeline {
            steps,
            config: self.config,
            space,
            matrix: composed.matrix,
            configuration: None,
            state: PipelineState::Unconfigured,
        };
        pipeline.set_hyperparameters(&configuration)?;

        tracing::info!(
            steps = pipeline.steps.len(),
            hyperparameters = pipeline.space.len(),
            forbidden_clauses = composed.forbidden_clauses,
            "pipeline constructed"
        );
        Ok(pipeline)
    }
}

/// An ordered chain of preprocessing steps ending in an estimator, configured
/// from a single point of its joint search space
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    config: PipelineConfig,
    space: Arc<ConfigurationSpace>,
    matrix: CompatibilityMatrix,
    configuration: Option<Configuration>,
    state: PipelineState,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps)
            .field("state", &self.state)
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dataset_properties(&self) -> &DatasetProperties {
        &self.config.dataset_properties
    }

    /// The joint search space of all steps
    pub fn configuration_space(&self) -> &Arc<ConfigurationSpace> {
        &self.space
    }

    pub fn compatibility_matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    /// Current configuration
    pub fn configuration(&self) -> Result<&Configuration> {
        self.configuration
            .as_ref()
            .ok_or_else(|| KolosalError::ValidationError("Pipeline is not configured".to_string()))
    }

    /// Share of the current configuration belonging to step `name`
    pub fn step_configuration(&self, name: &str) -> Result<Configuration> {
        let step = self
            .step(name)
            .ok_or_else(|| KolosalError::InvalidArgument(format!("No step named '{}'", name)))?;
        HyperparameterRouter::new(&self.config).step_configuration(step, self.configuration()?)
    }

    /// Apply `configuration` to every step.
    ///
    /// The configuration must come from a space equal to this pipeline's.
    /// Steps are rebuilt from scratch, so any fitted state is dropped; on
    /// error the pipeline is left as it was.
    pub fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        let supplied = configuration.space();
        if !Arc::ptr_eq(supplied, &self.space) && **supplied != *self.space {
            return Err(KolosalError::ConfigurationMismatch {
                diff: self.space.diff(supplied),
            });
        }

        let staged = HyperparameterRouter::new(&self.config).route(&self.steps, configuration)?;
        self.steps = staged;
        self.configuration = Some(configuration.clone());
        self.state = PipelineState::Configured;
        Ok(())
    }

    fn require_configured(&self) -> Result<()> {
        if self.state == PipelineState::Unconfigured {
            return Err(KolosalError::ValidationError("Pipeline is not configured".to_string()));
        }
        Ok(())
    }

    fn require_fitted(&self) -> Result<()> {
        if !self.state.is_fitted() {
            return Err(KolosalError::ModelNotFitted);
        }
        Ok(())
    }

    fn unselected(step: &PipelineStep) -> KolosalError {
        KolosalError::ValidationError(format!("Step '{}' has no selected component", step.name))
    }

    fn component_at(&self, index: usize) -> Result<&dyn Component> {
        let step = &self.steps[index];
        step.node.component().ok_or_else(|| Self::unselected(step))
    }

    fn estimator(&self) -> Result<&dyn Component> {
        self.component_at(self.steps.len() - 1)
    }

    fn estimator_mut(&mut self) -> Result<&mut dyn Component> {
        let step = self
            .steps
            .last_mut()
            .ok_or_else(|| KolosalError::ConfigError("Pipeline has no steps".to_string()))?;
        let name = step.name.clone();
        step.node
            .component_mut()
            .ok_or_else(|| KolosalError::ValidationError(format!("Step '{}' has no selected component", name)))
    }

    /// Fit every step but the last, returning the transformed training data.
    ///
    /// Earlier fitted state is invalidated first; the pipeline only counts as
    /// fitted again once the estimator has been fitted on the new data.
    pub fn fit_transformer(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
        self.require_configured()?;
        self.state = PipelineState::Configured;
        let n_transformers = self.steps.len() - 1;
        let mut xt = x.clone();
        for step in &mut self.steps[..n_transformers] {
            let name = step.name.clone();
            let component = step
                .node
                .component_mut()
                .ok_or_else(|| KolosalError::ValidationError(format!("Step '{}' has no selected component", name)))?;
            component.fit(&xt, y)?;
            xt = component.transform(&xt)?;
            tracing::debug!(step = %name, n_features = xt.ncols(), "fitted transformer");
        }
        Ok(xt)
    }

    /// Fit the final step on already transformed data
    pub fn fit_estimator(&mut self, xt: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.require_configured()?;
        self.estimator_mut()?.fit(xt, y)?;
        self.state = PipelineState::Fitted;
        Ok(())
    }

    /// Fit all steps in order
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let xt = self.fit_transformer(x, y)?;
        self.fit_estimator(&xt, y)
    }

    pub fn estimator_supports_iterative_fit(&self) -> bool {
        self.estimator().map_or(false, |e| e.supports_iterative_fit())
    }

    /// Train the estimator for `n_iter` more iterations on transformed data
    pub fn iterative_fit(&mut self, xt: &Array2<f64>, y: &Array1<f64>, n_iter: usize) -> Result<()> {
        self.require_configured()?;
        if !self.estimator_supports_iterative_fit() {
            return Err(KolosalError::UnsupportedOperation(format!(
                "estimator of step '{}' does not support iterative fitting",
                self.steps[self.steps.len() - 1].name
            )));
        }
        let estimator = self.estimator_mut()?;
        estimator.iterative_fit(xt, y, n_iter)?;
        let fully_fitted = estimator.configuration_fully_fitted();
        self.state = if fully_fitted {
            PipelineState::FullyFitted
        } else {
            PipelineState::IterativelyFitting
        };
        Ok(())
    }

    /// Whether the estimator has used up its training budget
    pub fn configuration_fully_fitted(&self) -> Result<bool> {
        self.require_fitted()?;
        Ok(self.estimator()?.configuration_fully_fitted())
    }

    /// Apply every step but the last
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.require_fitted()?;
        self.transform_view(x.view())
    }

    fn transform_view(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mut xt = x.to_owned();
        for index in 0..self.steps.len() - 1 {
            xt = self.component_at(index)?.transform(&xt)?;
        }
        Ok(xt)
    }

    fn predict_unbatched(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        let xt = self.transform_view(x)?;
        let output_kind = self.config.output_kind;
        Ok(self.estimator()?.predict(&xt)?.mapv(|v| output_kind.cast(v)))
    }

    fn predict_proba_unbatched(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let xt = self.transform_view(x)?;
        self.estimator()?.predict_proba(&xt)
    }

    /// Row ranges of at most `batch_size` rows covering `0..n_rows`
    fn batches(n_rows: usize, batch_size: usize) -> Vec<(usize, usize)> {
        (0..n_rows)
            .step_by(batch_size)
            .map(|start| (start, (start + batch_size).min(n_rows)))
            .collect()
    }

    fn check_batch_size(batch_size: Option<usize>) -> Result<()> {
        if batch_size == Some(0) {
            return Err(KolosalError::InvalidArgument("batch_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Predict with the fitted pipeline.
    ///
    /// With a `batch_size`, rows are processed in consecutive chunks and the
    /// results concatenated in order; the output equals the unbatched one.
    pub fn predict(&self, x: &Array2<f64>, batch_size: Option<usize>) -> Result<Array1<f64>> {
        Self::check_batch_size(batch_size)?;
        self.require_fitted()?;
        match batch_size {
            Some(b) if x.nrows() > 0 => {
                let n_batches = Self::batches(x.nrows(), b).len();
                tracing::debug!(batch_size = b, n_batches, "batched prediction");
                let parts = Self::batches(x.nrows(), b)
                    .into_iter()
                    .map(|(start, end)| self.predict_unbatched(x.slice(s![start..end, ..])))
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
                Ok(concatenate(Axis(0), &views)?)
            }
            _ => self.predict_unbatched(x.view()),
        }
    }

    /// Class probabilities, batched like [`Pipeline::predict`]
    pub fn predict_proba(&self, x: &Array2<f64>, batch_size: Option<usize>) -> Result<Array2<f64>> {
        Self::check_batch_size(batch_size)?;
        self.require_fitted()?;
        match batch_size {
            Some(b) if x.nrows() > 0 => {
                let parts = Self::batches(x.nrows(), b)
                    .into_iter()
                    .map(|(start, end)| self.predict_proba_unbatched(x.slice(s![start..end, ..])))
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
                Ok(concatenate(Axis(0), &views)?)
            }
            _ => self.predict_proba_unbatched(x.view()),
        }
    }

    /// Batched prediction with batches processed in parallel.
    ///
    /// Without a `batch_size`, rows are split evenly across the rayon pool.
    pub fn par_predict(&self, x: &Array2<f64>, batch_size: Option<usize>) -> Result<Array1<f64>> {
        Self::check_batch_size(batch_size)?;
        self.require_fitted()?;
        if x.nrows() == 0 {
            return self.predict_unbatched(x.view());
        }
        let b = batch_size.unwrap_or_else(|| x.nrows().div_ceil(rayon::current_num_threads()).max(1));
        let parts = Self::batches(x.nrows(), b)
            .into_par_iter()
            .map(|(start, end)| self.predict_unbatched(x.slice(s![start..end, ..])))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .configuration
            .iter()
            .flat_map(|c| c.iter())
            .map(|(name, value)| format!("'{}': {}", name, value))
            .collect();
        write!(f, "Pipeline(configuration={{\n  {}}}", entries.join(",\n  "))?;

        let props = &self.config.dataset_properties;
        if !props.is_empty() {
            let entries: Vec<String> = props.iter().map(|(k, v)| format!("'{}': {}", k, v)).collect();
            write!(f, ",\ndataset_properties={{\n  {}}}", entries.join(",\n  "))?;
        }
        write!(f, ")")
    }
}
