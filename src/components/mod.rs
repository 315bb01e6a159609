//! Pipeline components
//!
//! Provides:
//! - The [`Component`] trait and its static [`ComponentProperties`]
//! - [`ComponentChoice`] for selecting one of several components per configuration
//! - Built-in data preprocessing, feature preprocessing and classification components
//! - A [`ComponentRegistry`] for looking components up by name

mod base;
mod choice;
mod properties;
mod registry;

pub mod classification;
pub mod data_preprocessing;
pub mod feature_preprocessing;

pub use base::{factory, Component, ComponentFactory};
pub use choice::{ComponentChoice, CHOICE_HYPERPARAMETER};
pub use properties::{ComponentProperties, DataKind};
pub use registry::ComponentRegistry;
