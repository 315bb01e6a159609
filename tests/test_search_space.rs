//! Integration test: search-space composition and compatibility pruning

use kolosal_pipeline::autopipeline::SearchSpaceComposer;
use kolosal_pipeline::compat::{add_forbidden, find_active_choices, get_match_array};
use kolosal_pipeline::components::classification::classifier_choice;
use kolosal_pipeline::components::data_preprocessing::Imputation;
use kolosal_pipeline::prelude::*;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockSvm {
    c: f64,
}

impl Component for MockSvm {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("svm", "Mock SVM")
            .classifier(true, false)
            .with_input(&[DataKind::Dense, DataKind::SignedData, DataKind::UnsignedData])
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::log_float("C", 0.03125, 32768.0, 1.0)?)?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.c = configuration.get("C").and_then(|v| v.as_float()).unwrap_or(1.0);
        Ok(())
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::zeros(x.nrows()))
    }
}

#[derive(Debug, Default)]
struct MockForest {
    n_estimators: i64,
}

impl Component for MockForest {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("random_forest", "Mock Random Forest").classifier(true, false)
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::int("n_estimators", 10, 100, 10)?)?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        self.n_estimators = configuration.get("n_estimators").and_then(|v| v.as_int()).unwrap_or(10);
        Ok(())
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::ones(x.nrows()))
    }
}

fn svm_forest_steps() -> Vec<PipelineStep> {
    let classifier = ComponentChoice::new(vec![factory::<MockSvm>(), factory::<MockForest>()]).unwrap();
    vec![
        PipelineStep::component("imputation", factory::<Imputation>()),
        PipelineStep::choice("classifier", classifier),
    ]
}

fn sparse() -> DatasetProperties {
    DatasetProperties::new().with("sparse", true)
}

fn empty() -> Selectors {
    BTreeMap::new()
}

#[test]
fn test_sparse_data_prunes_dense_only_classifier() {
    let steps = svm_forest_steps();
    let matrix = get_match_array(&steps, &sparse(), &empty(), &empty(), CompatibilityMode::Propagate).unwrap();

    assert_eq!(matrix.shape(), &[2]);
    let axis = &matrix.axes()[0];
    assert_eq!(axis.step, "classifier");
    let svm = axis.candidates.iter().position(|c| c == "svm").unwrap();
    let forest = axis.candidates.iter().position(|c| c == "random_forest").unwrap();
    assert!(!matrix.get(&[svm]));
    assert!(matrix.get(&[forest]));

    let active = find_active_choices(&matrix, &steps[1], 1, &sparse(), &empty(), &empty()).unwrap();
    assert_eq!(active, vec!["random_forest".to_string()]);

    let config = PipelineConfig::new().with_dataset_properties(sparse());
    let composed = SearchSpaceComposer::new(&config).compose(&steps).unwrap();
    let names = composed.space.hyperparameter_names();
    assert!(names.iter().any(|n| n == "classifier:random_forest:n_estimators"));
    assert!(!names.iter().any(|n| n.starts_with("classifier:svm")));
    assert_eq!(composed.defaults["classifier"], "random_forest");
}

#[test]
fn test_dense_data_keeps_both_classifiers() {
    let steps = svm_forest_steps();
    let config = PipelineConfig::new();
    let composed = SearchSpaceComposer::new(&config).compose(&steps).unwrap();
    assert_eq!(composed.matrix.true_count(), 2);
    assert_eq!(composed.active["classifier"].len(), 2);
    assert_eq!(composed.forbidden_clauses, 0);
}

#[test]
fn test_include_only_incompatible_component() {
    let steps = svm_forest_steps();
    let config = PipelineConfig::new()
        .with_dataset_properties(sparse())
        .with_include("classifier", &["svm"]);
    let err = SearchSpaceComposer::new(&config).compose(&steps).unwrap_err();
    assert!(matches!(err, KolosalError::NoValidPipeline(_)));
}

#[test]
fn test_selectors_validated() {
    let steps = svm_forest_steps();

    let config = PipelineConfig::new().with_include("regressor", &["svm"]);
    let err = SearchSpaceComposer::new(&config).compose(&steps).unwrap_err();
    assert!(matches!(err, KolosalError::InvalidSelector(_)));

    let config = PipelineConfig::new()
        .with_include("classifier", &["svm"])
        .with_exclude("classifier", &["random_forest"]);
    let err = SearchSpaceComposer::new(&config).compose(&steps).unwrap_err();
    assert!(matches!(err, KolosalError::InvalidSelector(_)));

    let config = PipelineConfig::new().with_exclude("classifier", &["libsvm_svc"]);
    let err = SearchSpaceComposer::new(&config).compose(&steps).unwrap_err();
    assert!(matches!(err, KolosalError::InvalidSelector(_)));
}

#[test]
fn test_find_active_choices_rejects_fixed_step() {
    let steps = svm_forest_steps();
    let matrix = get_match_array(&steps, &sparse(), &empty(), &empty(), CompatibilityMode::Propagate).unwrap();
    let err = find_active_choices(&matrix, &steps[0], 0, &sparse(), &empty(), &empty()).unwrap_err();
    assert!(matches!(err, KolosalError::InvalidSelector(_)));
}

#[test]
fn test_active_choices_are_matrix_candidates() {
    for props in [DatasetProperties::new(), sparse(), DatasetProperties::new().with("signed", true)] {
        let steps = ClassificationTemplate.steps().unwrap();
        let config = PipelineConfig::new().with_dataset_properties(props);
        let composed = SearchSpaceComposer::new(&config).compose(&steps).unwrap();
        for axis in composed.matrix.axes() {
            let active = &composed.active[&axis.step];
            assert!(!active.is_empty());
            assert!(active.iter().all(|a| axis.candidates.contains(a)));
        }
    }
}

#[test]
fn test_recomposing_with_active_choices_is_stable() {
    for props in [DatasetProperties::new(), sparse()] {
        let steps = ClassificationTemplate.steps().unwrap();
        let config = PipelineConfig::new().with_dataset_properties(props.clone());
        let first = SearchSpaceComposer::new(&config).compose(&steps).unwrap();

        let mut narrowed = PipelineConfig::new().with_dataset_properties(props);
        for (step, active) in &first.active {
            narrowed = narrowed.with_include(step.clone(), active.as_slice());
        }
        let second = SearchSpaceComposer::new(&narrowed).compose(&steps).unwrap();

        assert_eq!(first.active, second.active);
        assert_eq!(first.defaults, second.defaults);
        assert_eq!(first.space, second.space);
    }
}

#[test]
fn test_sparse_classification_needs_densifier_for_gaussian_nb() {
    let steps = ClassificationTemplate.steps().unwrap();
    let config = PipelineConfig::new().with_dataset_properties(sparse());
    let composed = SearchSpaceComposer::new(&config).compose(&steps).unwrap();

    // minmax cannot take sparse input
    assert!(!composed.active["rescaling"].contains(&"minmax".to_string()));
    assert!(composed.active["feature_preprocessor"].contains(&"densifier".to_string()));
    assert!(composed.active["classifier"].contains(&"gaussian_nb".to_string()));

    let space = &composed.space;
    let mut values: BTreeMap<String, HyperparameterValue> = BTreeMap::new();
    values.insert("rescaling:__choice__".into(), "none".into());
    values.insert("feature_preprocessor:__choice__".into(), "no_preprocessing".into());
    values.insert("classifier:__choice__".into(), "gaussian_nb".into());
    assert!(space.violated_clause(&values).is_some());

    values.insert("feature_preprocessor:__choice__".into(), "densifier".into());
    assert!(space.violated_clause(&values).is_none());
}

#[test]
fn test_default_found_by_agreement() {
    let mut steps = ClassificationTemplate.steps().unwrap();
    let classifier = classifier_choice().unwrap().with_default_preferences(&["multinomial_nb"]);
    steps[3] = PipelineStep::choice("classifier", classifier);

    let config = PipelineConfig::new();
    let composed = SearchSpaceComposer::new(&config).compose(&steps).unwrap();

    // standardize followed by multinomial_nb is illegal; the first legal
    // coordinate agreeing on two preferences swaps the rescaler
    assert_eq!(composed.defaults["classifier"], "multinomial_nb");
    assert_eq!(composed.defaults["rescaling"], "minmax");
    assert_eq!(composed.defaults["feature_preprocessor"], "no_preprocessing");

    let space = Arc::new(composed.space);
    let default = space.default_configuration().unwrap();
    assert_eq!(default.get("classifier:__choice__"), Some(&HyperparameterValue::from("multinomial_nb")));
}

#[test]
fn test_compatibility_modes() {
    let steps = ClassificationTemplate.steps().unwrap();

    let propagate = PipelineConfig::new();
    let composed = SearchSpaceComposer::new(&propagate).compose(&steps).unwrap();
    assert_eq!(composed.forbidden_clauses, 2);
    assert!(composed.matrix.true_count() < composed.matrix.len());

    // every step judged against the raw data: standardize no longer poisons multinomial_nb
    let static_mode = PipelineConfig::new().with_compatibility_mode(CompatibilityMode::Static);
    let composed = SearchSpaceComposer::new(&static_mode).compose(&steps).unwrap();
    assert_eq!(composed.forbidden_clauses, 0);
    assert!(!composed.active["feature_preprocessor"].contains(&"densifier".to_string()));
    assert!(composed.active["classifier"].contains(&"multinomial_nb".to_string()));
}

#[test]
fn test_add_forbidden_over_active_candidates() {
    let steps = ClassificationTemplate.steps().unwrap();
    let props = DatasetProperties::new();
    let matrix = get_match_array(&steps, &props, &empty(), &empty(), CompatibilityMode::Propagate).unwrap();

    let mut space = ConfigurationSpace::new();
    for step in &steps {
        let sub_space = match step.node.as_choice() {
            Some(choice) => choice.hyperparameter_search_space(&props, None, None, None).unwrap(),
            None => step.node.component().unwrap().hyperparameter_search_space(&props).unwrap(),
        };
        space.add_configuration_space(&step.name, &sub_space, None).unwrap();
    }
    let added = add_forbidden(&mut space, &steps, &matrix, &props, &empty(), &empty()).unwrap();
    assert_eq!(added, space.forbidden_clauses().len());
    assert!(space
        .forbidden_clauses()
        .iter()
        .all(|clause| !clause.terms().iter().any(|t| t.value == HyperparameterValue::from("densifier"))));
}

#[test]
fn test_space_json_roundtrip() {
    let steps = ClassificationTemplate.steps().unwrap();
    let composed = SearchSpaceComposer::new(&PipelineConfig::new()).compose(&steps).unwrap();
    let parsed = ConfigurationSpace::from_json(&composed.space.to_json().unwrap()).unwrap();
    assert_eq!(parsed, composed.space);
}
