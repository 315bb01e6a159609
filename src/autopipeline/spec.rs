//! Declarative pipeline descriptions

use super::step::PipelineStep;
use crate::components::{ComponentChoice, ComponentRegistry};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};

/// One step of a [`PipelineSpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    /// `component` or `choice`
    pub kind: String,
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl StepSpec {
    pub fn component(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "component".to_string(),
            components: vec![component.into()],
            default: None,
        }
    }

    pub fn choice<S: AsRef<str>>(name: impl Into<String>, components: &[S]) -> Self {
        Self {
            name: name.into(),
            kind: "choice".to_string(),
            components: components.iter().map(|c| c.as_ref().to_string()).collect(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn build(&self, registry: &ComponentRegistry) -> Result<PipelineStep> {
        match self.kind.as_str() {
            "component" => match self.components.as_slice() {
                [component] => Ok(PipelineStep::component(&self.name, registry.get(component)?)),
                other => Err(KolosalError::ConfigError(format!(
                    "Component step '{}' needs exactly one component, got {}",
                    self.name,
                    other.len()
                ))),
            },
            "choice" => {
                let factories = self
                    .components
                    .iter()
                    .map(|c| registry.get(c))
                    .collect::<Result<Vec<_>>>()?;
                let mut choice = ComponentChoice::new(factories)?;
                if let Some(default) = &self.default {
                    if !choice.contains(default) {
                        return Err(KolosalError::ConfigError(format!(
                            "Default '{}' of step '{}' is not one of its components",
                            default, self.name
                        )));
                    }
                    choice = choice.with_default_preferences(&[default.as_str()]);
                }
                Ok(PipelineStep::choice(&self.name, choice))
            }
            other => Err(KolosalError::UnsupportedNodeKind(format!(
                "step '{}' has kind '{}'; expected 'component' or 'choice'",
                self.name, other
            ))),
        }
    }
}

/// Serializable list of steps resolved against a [`ComponentRegistry`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub steps: Vec<StepSpec>,
}

impl PipelineSpec {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        Self { steps }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Instantiate the steps; fails on unknown components or node kinds
    pub fn build_steps(&self, registry: &ComponentRegistry) -> Result<Vec<PipelineStep>> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if steps.iter().any(|s: &PipelineStep| s.name == step.name) {
                return Err(KolosalError::ConfigError(format!("Duplicate step name '{}'", step.name)));
            }
            steps.push(step.build(registry)?);
        }
        Ok(steps)
    }
}
