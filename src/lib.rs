//! Kolosal Pipeline - configurable AutoML pipelines
//!
//! This crate builds the joint hyperparameter search space of a multi-stage
//! ML pipeline and routes configurations sampled from it to the stages:
//! - Fixed steps and choices among interchangeable components
//! - Compatibility pruning driven by dataset properties
//! - Forbidden clauses for illegal component combinations
//! - Fitting, iterative fitting and batched prediction
//!
//! # Modules
//!
//! - [`configspace`] - Hyperparameters, conditions, forbidden clauses, configurations
//! - [`dataset`] - Dataset properties
//! - [`components`] - Component trait, choices and built-in components
//! - [`compat`] - Compatibility matrix, active choices, forbidden clauses
//! - [`autopipeline`] - Search-space composition, routing and the pipeline driver

// Core error handling
pub mod error;

pub mod configspace;
pub mod dataset;

pub mod components;
pub mod compat;

pub mod autopipeline;

pub use error::{KolosalError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::autopipeline::{
        ClassificationTemplate, OutputKind, Pipeline, PipelineBuilder, PipelineConfig, PipelineSpec, PipelineState,
        PipelineStep, PipelineTemplate, StepSpec,
    };
    pub use crate::compat::{CompatibilityMode, Selectors};
    pub use crate::components::{factory, Component, ComponentChoice, ComponentProperties, ComponentRegistry, DataKind};
    pub use crate::configspace::{
        Condition, Configuration, ConfigurationSpace, ForbiddenClause, Hyperparameter, HyperparameterValue,
    };
    pub use crate::dataset::DatasetProperties;
    pub use crate::error::{KolosalError, Result};
}
