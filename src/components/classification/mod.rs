//! Classification components
//!
//! Provides:
//! - Gaussian and Multinomial Naive Bayes
//! - K-Nearest Neighbors
//! - SGD linear classifier with iterative fitting

mod knn;
mod naive_bayes;
mod sgd;

pub use knn::{KNearestNeighbors, WeightScheme};
pub use naive_bayes::{GaussianNaiveBayes, MultinomialNaiveBayes};
pub use sgd::{LearningRateSchedule, SgdClassifier, SgdConfig, SgdLoss, MAX_ITER};

use super::base::factory;
use super::choice::ComponentChoice;
use crate::error::Result;

/// Choice over the built-in classifiers
pub fn classifier_choice() -> Result<ComponentChoice> {
    Ok(ComponentChoice::new(vec![
        factory::<GaussianNaiveBayes>(),
        factory::<KNearestNeighbors>(),
        factory::<MultinomialNaiveBayes>(),
        factory::<SgdClassifier>(),
    ])?
    .with_default_preferences(&["sgd", "gaussian_nb", "knn"]))
}
