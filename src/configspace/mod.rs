//! Configuration spaces
//!
//! Provides the hierarchical search-space structure the pipeline builder
//! composes and decomposes:
//! - Float, integer, categorical, constant and boolean hyperparameters
//! - Activation conditions (child active only for certain parent values)
//! - Forbidden clauses (value combinations no configuration may take)
//! - Prefix-qualified merging of sub-spaces
//! - Validated configurations, defaults and uniform sampling

mod conditions;
mod configuration;
mod hyperparameter;
mod space;

pub use conditions::{Condition, ForbiddenClause, ForbiddenTerm};
pub use configuration::Configuration;
pub use hyperparameter::{Hyperparameter, HyperparameterKind, HyperparameterValue};
pub use space::{qualified_name, ConfigurationSpace, SEPARATOR};
