//! Compatibility metadata declared by components

use crate::dataset::{DatasetProperties, TargetType};
use serde::{Deserialize, Serialize};

/// What a component consumes or produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataKind {
    Dense,
    Sparse,
    SignedData,
    UnsignedData,
    /// Output keeps the corresponding property of the input
    Input,
    /// Output is a prediction, nothing downstream consumes it as data
    Predictions,
}

/// Static description of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProperties {
    /// Identifier used as the choice value and as a name prefix
    pub short_name: String,
    /// Human readable name
    pub name: String,
    pub handles_classification: bool,
    pub handles_regression: bool,
    pub handles_multiclass: bool,
    pub handles_multilabel: bool,
    pub is_deterministic: bool,
    pub input: Vec<DataKind>,
    pub output: Vec<DataKind>,
}

impl ComponentProperties {
    /// Accepts any input, keeps its properties and handles every task
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            name: name.into(),
            handles_classification: true,
            handles_regression: true,
            handles_multiclass: true,
            handles_multilabel: true,
            is_deterministic: true,
            input: vec![DataKind::Dense, DataKind::Sparse, DataKind::SignedData, DataKind::UnsignedData],
            output: vec![DataKind::Input],
        }
    }

    pub fn with_input(mut self, input: &[DataKind]) -> Self {
        self.input = input.to_vec();
        self
    }

    pub fn with_output(mut self, output: &[DataKind]) -> Self {
        self.output = output.to_vec();
        self
    }

    /// Builder method for classifiers
    pub fn classifier(mut self, handles_multiclass: bool, handles_multilabel: bool) -> Self {
        self.handles_classification = true;
        self.handles_regression = false;
        self.handles_multiclass = handles_multiclass;
        self.handles_multilabel = handles_multilabel;
        self.output = vec![DataKind::Predictions];
        self
    }

    pub fn non_deterministic(mut self) -> Self {
        self.is_deterministic = false;
        self
    }

    pub fn accepts(&self, kind: DataKind) -> bool {
        self.input.contains(&kind)
    }

    pub fn produces(&self, kind: DataKind) -> bool {
        self.output.contains(&kind)
    }

    /// Whether the task-level flags of `props` can be served
    pub fn supports_task(&self, props: &DatasetProperties) -> bool {
        if props.multiclass() && !self.handles_multiclass {
            return false;
        }
        if props.multilabel() && !self.handles_multilabel {
            return false;
        }
        match props.target_type() {
            Some(TargetType::Classification) => self.handles_classification,
            Some(TargetType::Regression) => self.handles_regression,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_builder() {
        let props = ComponentProperties::new("gaussian_nb", "Gaussian Naive Bayes").classifier(true, false);
        assert!(props.produces(DataKind::Predictions));
        assert!(!props.handles_regression);

        let multilabel = DatasetProperties::new().with("multilabel", true);
        assert!(!props.supports_task(&multilabel));
        let regression = DatasetProperties::new().with("target_type", "regression");
        assert!(!props.supports_task(&regression));
    }
}
