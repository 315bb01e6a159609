//! Data preprocessing components
//!
//! Provides:
//! - Missing value imputation (a fixed pipeline step)
//! - Rescaling candidates for the `rescaling` choice

mod imputation;
mod rescaling;

pub use imputation::{Imputation, ImputeStrategy};
pub use rescaling::{MinMaxScaler, NoRescaling, StandardScaler};

use super::base::factory;
use super::choice::ComponentChoice;
use crate::error::Result;

/// Choice over the built-in rescalers, preferring standardization
pub fn rescaling_choice() -> Result<ComponentChoice> {
    Ok(ComponentChoice::new(vec![
        factory::<NoRescaling>(),
        factory::<StandardScaler>(),
        factory::<MinMaxScaler>(),
    ])?
    .with_default_preferences(&["standardize"]))
}
