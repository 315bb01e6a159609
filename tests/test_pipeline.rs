//! Integration test: configure → fit → predict through the pipeline driver

use approx::assert_abs_diff_eq;
use kolosal_pipeline::components::classification::{KNearestNeighbors, MAX_ITER};
use kolosal_pipeline::components::data_preprocessing::Imputation;
use kolosal_pipeline::components::CHOICE_HYPERPARAMETER;
use kolosal_pipeline::prelude::*;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::sync::Arc;

fn create_classification_dataset() -> (Array2<f64>, Array1<f64>) {
    let n = 40;
    let mut x = Array2::zeros((n, 3));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let class = if i < n / 2 { 0.0 } else { 1.0 };
        let offset = class * 5.0;
        x[[i, 0]] = offset + (i % 5) as f64 * 0.2;
        x[[i, 1]] = offset + 1.0 + (i % 3) as f64 * 0.1;
        x[[i, 2]] = (i % 4) as f64;
        y[i] = class;
    }
    // one missing value for the imputer
    x[[3, 2]] = f64::NAN;
    (x, y)
}

fn knn_pipeline() -> Pipeline {
    Pipeline::builder()
        .config(PipelineConfig::new().with_include("classifier", &["knn"]))
        .build()
        .unwrap()
}

#[derive(Debug, Default)]
struct Flaky;

impl Component for Flaky {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("flaky", "Flaky Transformer")
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::categorical("mode", &["ok", "fail"], Some("ok"))?)?;
        Ok(cs)
    }

    fn set_hyperparameters(&mut self, configuration: &Configuration) -> Result<()> {
        match configuration.get("mode").and_then(|v| v.as_str()) {
            Some("fail") => Err(KolosalError::ConfigError("flaky refused its configuration".into())),
            _ => Ok(()),
        }
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(x.clone())
    }
}

#[derive(Debug, Default)]
struct Fractional;

impl Component for Fractional {
    fn properties(&self) -> ComponentProperties {
        ComponentProperties::new("fractional", "Fractional Estimator")
    }

    fn hyperparameter_search_space(&self, _dataset_properties: &DatasetProperties) -> Result<ConfigurationSpace> {
        Ok(ConfigurationSpace::new())
    }

    fn set_hyperparameters(&mut self, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), 0.6))
    }
}

#[test]
fn test_default_pipeline_fit_predict() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = Pipeline::builder().build().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Configured);

    pipeline.fit(&x, &y).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Fitted);

    let predictions = pipeline.predict(&x, None).unwrap();
    assert_eq!(predictions.len(), x.nrows());
    assert!(predictions.iter().all(|&p| p == 0.0 || p == 1.0));
}

#[test]
fn test_predict_before_fit() {
    let (x, _) = create_classification_dataset();
    let pipeline = knn_pipeline();
    assert!(matches!(pipeline.predict(&x, None), Err(KolosalError::ModelNotFitted)));
}

#[test]
fn test_default_configuration_routes_back() {
    let pipeline = Pipeline::builder().build().unwrap();
    let configuration = pipeline.configuration().unwrap();

    for step in pipeline.steps() {
        let routed = pipeline.step_configuration(&step.name).unwrap();
        assert_eq!(routed.values(), &configuration.sub_values(&step.name));

        if let Some(choice) = step.node.as_choice() {
            let selected = configuration
                .get(&format!("{}:{}", step.name, CHOICE_HYPERPARAMETER))
                .and_then(|v| v.as_str());
            assert_eq!(choice.selected_name(), selected);
        }
    }
    assert_eq!(
        pipeline.step_configuration("imputation").unwrap().get("strategy"),
        Some(&HyperparameterValue::from("mean"))
    );
}

#[test]
fn test_unknown_step_configuration() {
    let pipeline = knn_pipeline();
    assert!(matches!(
        pipeline.step_configuration("ensemble"),
        Err(KolosalError::InvalidArgument(_))
    ));
}

#[test]
fn test_set_hyperparameters_idempotent() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = knn_pipeline();
    let configuration = pipeline.configuration().unwrap().clone();

    pipeline.set_hyperparameters(&configuration).unwrap();
    pipeline.fit(&x, &y).unwrap();
    let first = pipeline.predict(&x, None).unwrap();
    let first_display = pipeline.to_string();

    pipeline.set_hyperparameters(&configuration).unwrap();
    // reconfiguring drops the fitted state
    assert_eq!(pipeline.state(), PipelineState::Configured);
    pipeline.fit(&x, &y).unwrap();
    let second = pipeline.predict(&x, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_display, pipeline.to_string());
    assert_eq!(pipeline.configuration().unwrap().values(), configuration.values());
}

#[test]
fn test_configuration_from_other_properties_rejected() {
    let dense = Pipeline::builder().build().unwrap();
    let configuration = dense.configuration().unwrap().clone();

    let err = Pipeline::builder()
        .config(PipelineConfig::new().with_property("sparse", true))
        .configuration(configuration.clone())
        .build()
        .unwrap_err();
    match err {
        KolosalError::ConfigurationMismatch { diff } => assert!(!diff.is_empty()),
        other => panic!("expected a configuration mismatch, got {:?}", other),
    }

    // an equal but separately built space is accepted
    let rebuilt = Pipeline::builder().configuration(configuration).build();
    assert!(rebuilt.is_ok());
}

#[test]
fn test_failed_reconfiguration_keeps_pipeline() {
    let (x, y) = create_classification_dataset();
    let steps = vec![
        PipelineStep::component("imputation", factory::<Imputation>()),
        PipelineStep::component("flaky", factory::<Flaky>()),
        PipelineStep::choice(
            "classifier",
            ComponentChoice::new(vec![factory::<KNearestNeighbors>()]).unwrap(),
        ),
    ];
    let mut pipeline = Pipeline::builder().steps(steps).build().unwrap();
    pipeline.fit(&x, &y).unwrap();
    let before = pipeline.predict(&x, None).unwrap();
    let configuration = pipeline.configuration().unwrap().clone();

    let mut values = configuration.values().clone();
    values.insert("flaky:mode".to_string(), "fail".into());
    values.insert("classifier:knn:n_neighbors".to_string(), HyperparameterValue::Int(7));
    let failing = Configuration::new(Arc::clone(pipeline.configuration_space()), values).unwrap();

    assert!(pipeline.set_hyperparameters(&failing).is_err());
    assert_eq!(pipeline.state(), PipelineState::Fitted);
    assert_eq!(pipeline.configuration().unwrap().values(), configuration.values());
    assert_eq!(pipeline.predict(&x, None).unwrap(), before);
}

#[test]
fn test_iterative_fit_until_budget() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = Pipeline::builder()
        .config(PipelineConfig::new().with_include("classifier", &["sgd"]))
        .build()
        .unwrap();
    assert!(pipeline.estimator_supports_iterative_fit());

    let xt = pipeline.fit_transformer(&x, &y).unwrap();
    pipeline.iterative_fit(&xt, &y, 1).unwrap();
    assert!(pipeline.state().is_fitted());

    let mut rounds = 0;
    while !pipeline.configuration_fully_fitted().unwrap() {
        assert_eq!(pipeline.state(), PipelineState::IterativelyFitting);
        pipeline.iterative_fit(&xt, &y, 2).unwrap();
        rounds += 1;
        assert!(rounds <= MAX_ITER);
    }
    assert_eq!(pipeline.state(), PipelineState::FullyFitted);
    assert_eq!(pipeline.predict(&x, None).unwrap().len(), x.nrows());
}

#[test]
fn test_iterative_fit_unsupported() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = knn_pipeline();
    assert!(!pipeline.estimator_supports_iterative_fit());
    let xt = pipeline.fit_transformer(&x, &y).unwrap();
    assert!(matches!(
        pipeline.iterative_fit(&xt, &y, 1),
        Err(KolosalError::UnsupportedOperation(_))
    ));
}

#[test]
fn test_batched_prediction_matches_unbatched() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = knn_pipeline();
    pipeline.fit(&x, &y).unwrap();

    let full = pipeline.predict(&x, None).unwrap();
    for batch_size in [1, 7, x.nrows(), x.nrows() + 10] {
        assert_eq!(pipeline.predict(&x, Some(batch_size)).unwrap(), full);
        assert_eq!(pipeline.par_predict(&x, Some(batch_size)).unwrap(), full);
    }
    assert_eq!(pipeline.par_predict(&x, None).unwrap(), full);

    let proba = pipeline.predict_proba(&x, None).unwrap();
    assert_eq!(proba.dim(), (x.nrows(), 2));
    let batched = pipeline.predict_proba(&x, Some(3)).unwrap();
    assert_abs_diff_eq!(proba, batched, epsilon = 1e-12);
    for row in proba.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_zero_batch_size_rejected() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = knn_pipeline();
    pipeline.fit(&x, &y).unwrap();
    assert!(matches!(pipeline.predict(&x, Some(0)), Err(KolosalError::InvalidArgument(_))));
    assert!(matches!(pipeline.predict_proba(&x, Some(0)), Err(KolosalError::InvalidArgument(_))));
    assert!(matches!(pipeline.par_predict(&x, Some(0)), Err(KolosalError::InvalidArgument(_))));
}

#[test]
fn test_empty_input_predicts_nothing() {
    let (x, y) = create_classification_dataset();
    let mut pipeline = knn_pipeline();
    pipeline.fit(&x, &y).unwrap();
    let empty = Array2::<f64>::zeros((0, x.ncols()));
    assert_eq!(pipeline.predict(&empty, Some(4)).unwrap().len(), 0);
}

#[test]
fn test_output_kind() {
    let (x, y) = create_classification_dataset();
    let steps = || vec![PipelineStep::component("estimator", factory::<Fractional>())];

    let mut rounded = Pipeline::builder().steps(steps()).build().unwrap();
    rounded.fit(&x, &y).unwrap();
    assert!(rounded.predict(&x, None).unwrap().iter().all(|&p| p == 1.0));

    let mut raw = Pipeline::builder()
        .steps(steps())
        .config(PipelineConfig::new().with_output_kind(OutputKind::Float))
        .build()
        .unwrap();
    raw.fit(&x, &y).unwrap();
    assert!(raw.predict(&x, None).unwrap().iter().all(|&p| (p - 0.6).abs() < 1e-12));
}

#[test]
fn test_build_from_values() {
    let mut values: BTreeMap<String, HyperparameterValue> = BTreeMap::new();
    values.insert("imputation:strategy".into(), "median".into());
    values.insert("rescaling:__choice__".into(), "minmax".into());
    values.insert("feature_preprocessor:__choice__".into(), "select_percentile".into());
    values.insert("feature_preprocessor:select_percentile:percentile".into(), HyperparameterValue::Float(60.0));
    values.insert("classifier:__choice__".into(), "multinomial_nb".into());
    values.insert("classifier:multinomial_nb:alpha".into(), HyperparameterValue::Float(0.5));
    values.insert("classifier:multinomial_nb:fit_prior".into(), HyperparameterValue::Bool(false));

    let (x, y) = create_classification_dataset();
    let mut pipeline = Pipeline::builder().values(values).build().unwrap();
    pipeline.fit(&x, &y).unwrap();
    assert_eq!(
        pipeline.step("classifier").unwrap().node.as_choice().unwrap().selected_name(),
        Some("multinomial_nb")
    );
    assert_eq!(pipeline.predict(&x, None).unwrap().len(), x.nrows());
}

#[test]
fn test_forbidden_values_rejected() {
    let mut values: BTreeMap<String, HyperparameterValue> = BTreeMap::new();
    values.insert("imputation:strategy".into(), "mean".into());
    values.insert("rescaling:__choice__".into(), "standardize".into());
    values.insert("feature_preprocessor:__choice__".into(), "no_preprocessing".into());
    values.insert("classifier:__choice__".into(), "multinomial_nb".into());
    values.insert("classifier:multinomial_nb:alpha".into(), HyperparameterValue::Float(1.0));
    values.insert("classifier:multinomial_nb:fit_prior".into(), HyperparameterValue::Bool(true));

    assert!(Pipeline::builder().values(values).build().is_err());
}

#[test]
fn test_pipeline_from_spec() {
    let json = r#"{
        "steps": [
            {"name": "imputation", "kind": "component", "components": ["imputation"]},
            {"name": "rescaling", "kind": "choice", "components": ["none", "standardize"]},
            {"name": "classifier", "kind": "choice", "components": ["gaussian_nb", "knn"], "default": "knn"}
        ]
    }"#;
    let steps = PipelineSpec::from_json(json)
        .unwrap()
        .build_steps(&ComponentRegistry::builtin())
        .unwrap();

    let (x, y) = create_classification_dataset();
    let mut pipeline = Pipeline::builder().steps(steps).build().unwrap();
    assert_eq!(
        pipeline.configuration().unwrap().get("classifier:__choice__"),
        Some(&HyperparameterValue::from("knn"))
    );
    pipeline.fit(&x, &y).unwrap();
    assert_eq!(pipeline.predict(&x, Some(16)).unwrap().len(), x.nrows());
}

#[test]
fn test_display() {
    let pipeline = Pipeline::builder()
        .config(PipelineConfig::new().with_property("multiclass", true))
        .build()
        .unwrap();
    let text = pipeline.to_string();
    assert!(text.starts_with("Pipeline(configuration={\n"));
    assert!(text.contains("'imputation:strategy': 'mean'"));
    assert!(text.contains("dataset_properties={\n  'multiclass': true"));
    assert!(text.ends_with(')'));
}
