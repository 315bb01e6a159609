//! Predefined pipeline layouts

use super::step::PipelineStep;
use crate::components::classification::classifier_choice;
use crate::components::data_preprocessing::{rescaling_choice, Imputation};
use crate::components::factory;
use crate::components::feature_preprocessing::feature_preprocessor_choice;
use crate::error::Result;

/// Supplies the ordered steps of a pipeline
pub trait PipelineTemplate {
    fn name(&self) -> &str;

    /// Fresh, unconfigured steps
    fn steps(&self) -> Result<Vec<PipelineStep>>;
}

/// `imputation -> rescaling -> feature_preprocessor -> classifier`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationTemplate;

impl PipelineTemplate for ClassificationTemplate {
    fn name(&self) -> &str {
        "classification"
    }

    fn steps(&self) -> Result<Vec<PipelineStep>> {
        Ok(vec![
            PipelineStep::component("imputation", factory::<Imputation>()),
            PipelineStep::choice("rescaling", rescaling_choice()?),
            PipelineStep::choice("feature_preprocessor", feature_preprocessor_choice()?),
            PipelineStep::choice("classifier", classifier_choice()?),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_steps() {
        let steps = ClassificationTemplate.steps().unwrap();
        let names: Vec<_> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["imputation", "rescaling", "feature_preprocessor", "classifier"]);
        assert_eq!(steps[0].node.kind_name(), "component");
        assert_eq!(steps[3].node.kind_name(), "choice");
    }
}
