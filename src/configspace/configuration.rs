//! Concrete assignment of values to a configuration space

use super::hyperparameter::HyperparameterValue;
use super::space::{ConfigurationSpace, SEPARATOR};
use crate::error::{KolosalError, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Values for every active hyperparameter of one space.
///
/// A configuration keeps a handle to the space it was validated against;
/// two configurations are equal only if their spaces are structurally equal
/// and they assign the same values.
#[derive(Debug, Clone)]
pub struct Configuration {
    space: Arc<ConfigurationSpace>,
    values: BTreeMap<String, HyperparameterValue>,
}

impl Configuration {
    /// Validate `values` against `space`.
    ///
    /// Every active hyperparameter needs a legal value, inactive ones must be
    /// absent and no forbidden clause may match.
    pub fn new(space: Arc<ConfigurationSpace>, values: BTreeMap<String, HyperparameterValue>) -> Result<Self> {
        let mut coerced = BTreeMap::new();
        for (name, value) in values {
            let hp = space.get_hyperparameter(&name).ok_or_else(|| KolosalError::InvalidParameter {
                name: name.clone(),
                value: value.to_string(),
                reason: "not part of the configuration space".to_string(),
            })?;
            let value = hp.coerce(&value).ok_or_else(|| KolosalError::InvalidParameter {
                name: name.clone(),
                value: value.to_string(),
                reason: format!("illegal value for {}", hp),
            })?;
            coerced.insert(name, value);
        }

        let active = space.active_hyperparameters(&coerced);
        for name in space.topological_order() {
            match (active.contains(name), coerced.contains_key(name)) {
                (true, false) => {
                    return Err(KolosalError::ValidationError(format!(
                        "Active hyperparameter '{}' not specified",
                        name
                    )))
                }
                (false, true) => {
                    return Err(KolosalError::ValidationError(format!(
                        "Inactive hyperparameter '{}' must not be specified",
                        name
                    )))
                }
                _ => {}
            }
        }

        if let Some(clause) = space.violated_clause(&coerced) {
            return Err(KolosalError::ValidationError(format!(
                "Given configuration violates forbidden clause {}",
                clause
            )));
        }

        Ok(Self { space, values: coerced })
    }

    /// Space this configuration was validated against
    pub fn space(&self) -> &Arc<ConfigurationSpace> {
        &self.space
    }

    pub fn get(&self, name: &str) -> Option<&HyperparameterValue> {
        self.values.get(name)
    }

    pub fn values(&self) -> &BTreeMap<String, HyperparameterValue> {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HyperparameterValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values under `prefix:` with the prefix stripped
    pub fn sub_values(&self, prefix: &str) -> BTreeMap<String, HyperparameterValue> {
        let head = format!("{}{}", prefix, SEPARATOR);
        self.values
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(head.as_str())
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect()
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.space, &other.space) || self.space == other.space) && self.values == other.values
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        for (name, value) in &self.values {
            writeln!(f, "  {}, Value: {}", name, value)?;
        }
        Ok(())
    }
}
