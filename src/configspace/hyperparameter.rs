//! Hyperparameter definitions and values

use crate::error::{KolosalError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind and domain of a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HyperparameterKind {
    /// Continuous float parameter
    Float {
        low: f64,
        high: f64,
        log_scale: bool,
        default: f64,
    },
    /// Integer parameter
    Int {
        low: i64,
        high: i64,
        log_scale: bool,
        default: i64,
    },
    /// Categorical parameter
    Categorical {
        choices: Vec<String>,
        default: String,
    },
    /// Single fixed value
    Constant { value: String },
    /// Boolean parameter
    Boolean { default: bool },
}

/// A single hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameter {
    name: String,
    kind: HyperparameterKind,
}

fn invalid(name: &str, value: impl ToString, reason: impl Into<String>) -> KolosalError {
    KolosalError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

impl Hyperparameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64, default: f64) -> Result<Self> {
        Self::float_with_scale(name.into(), low, high, default, false)
    }

    /// Create a log-scale float parameter
    pub fn log_float(name: impl Into<String>, low: f64, high: f64, default: f64) -> Result<Self> {
        Self::float_with_scale(name.into(), low, high, default, true)
    }

    fn float_with_scale(name: String, low: f64, high: f64, default: f64, log_scale: bool) -> Result<Self> {
        if !(low < high) {
            return Err(invalid(&name, format!("[{}, {}]", low, high), "lower bound must be below upper bound"));
        }
        if log_scale && low <= 0.0 {
            return Err(invalid(&name, low, "log-scale bounds must be positive"));
        }
        if !(low..=high).contains(&default) {
            return Err(invalid(&name, default, "default outside of range"));
        }
        Ok(Self {
            name,
            kind: HyperparameterKind::Float { low, high, log_scale, default },
        })
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64, default: i64) -> Result<Self> {
        Self::int_with_scale(name.into(), low, high, default, false)
    }

    /// Create a log-scale integer parameter
    pub fn log_int(name: impl Into<String>, low: i64, high: i64, default: i64) -> Result<Self> {
        Self::int_with_scale(name.into(), low, high, default, true)
    }

    fn int_with_scale(name: String, low: i64, high: i64, default: i64, log_scale: bool) -> Result<Self> {
        if low > high {
            return Err(invalid(&name, format!("[{}, {}]", low, high), "lower bound must not exceed upper bound"));
        }
        if log_scale && low <= 0 {
            return Err(invalid(&name, low, "log-scale bounds must be positive"));
        }
        if !(low..=high).contains(&default) {
            return Err(invalid(&name, default, "default outside of range"));
        }
        Ok(Self {
            name,
            kind: HyperparameterKind::Int { low, high, log_scale, default },
        })
    }

    /// Create a categorical parameter; the default falls back to the first choice
    pub fn categorical<S: AsRef<str>>(name: impl Into<String>, choices: &[S], default: Option<&str>) -> Result<Self> {
        let name = name.into();
        let choices: Vec<String> = choices.iter().map(|c| c.as_ref().to_string()).collect();
        if choices.is_empty() {
            return Err(invalid(&name, "[]", "categorical needs at least one choice"));
        }
        for (i, choice) in choices.iter().enumerate() {
            if choices[..i].contains(choice) {
                return Err(invalid(&name, choice, "duplicate choice"));
            }
        }
        let default = match default {
            Some(d) if choices.iter().any(|c| c == d) => d.to_string(),
            Some(d) => return Err(invalid(&name, d, "default is not one of the choices")),
            None => choices[0].clone(),
        };
        Ok(Self {
            name,
            kind: HyperparameterKind::Categorical { choices, default },
        })
    }

    /// Create a constant parameter
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: HyperparameterKind::Constant { value: value.into() },
        }
    }

    /// Create a boolean parameter
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: HyperparameterKind::Boolean { default },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &HyperparameterKind {
        &self.kind
    }

    /// Same hyperparameter under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: self.kind.clone(),
        }
    }

    /// Default value
    pub fn default_value(&self) -> HyperparameterValue {
        match &self.kind {
            HyperparameterKind::Float { default, .. } => HyperparameterValue::Float(*default),
            HyperparameterKind::Int { default, .. } => HyperparameterValue::Int(*default),
            HyperparameterKind::Categorical { default, .. } => HyperparameterValue::Str(default.clone()),
            HyperparameterKind::Constant { value } => HyperparameterValue::Str(value.clone()),
            HyperparameterKind::Boolean { default } => HyperparameterValue::Bool(*default),
        }
    }

    /// Normalise a value to this hyperparameter's representation.
    ///
    /// Integers are accepted for float parameters and integral floats for
    /// integer parameters, since JSON input does not keep the distinction.
    /// Returns `None` when the value cannot be represented or is out of domain.
    pub fn coerce(&self, value: &HyperparameterValue) -> Option<HyperparameterValue> {
        let coerced = match (&self.kind, value) {
            (HyperparameterKind::Float { .. }, HyperparameterValue::Float(v)) => HyperparameterValue::Float(*v),
            (HyperparameterKind::Float { .. }, HyperparameterValue::Int(v)) => HyperparameterValue::Float(*v as f64),
            (HyperparameterKind::Int { .. }, HyperparameterValue::Int(v)) => HyperparameterValue::Int(*v),
            (HyperparameterKind::Int { .. }, HyperparameterValue::Float(v)) if v.fract() == 0.0 => {
                HyperparameterValue::Int(*v as i64)
            }
            (HyperparameterKind::Categorical { .. }, HyperparameterValue::Str(s))
            | (HyperparameterKind::Constant { .. }, HyperparameterValue::Str(s)) => HyperparameterValue::Str(s.clone()),
            (HyperparameterKind::Boolean { .. }, HyperparameterValue::Bool(b)) => HyperparameterValue::Bool(*b),
            _ => return None,
        };
        if self.is_legal(&coerced) {
            Some(coerced)
        } else {
            None
        }
    }

    /// Check whether a value lies inside this hyperparameter's domain
    pub fn is_legal(&self, value: &HyperparameterValue) -> bool {
        match (&self.kind, value) {
            (HyperparameterKind::Float { low, high, .. }, HyperparameterValue::Float(v)) => (*low..=*high).contains(v),
            (HyperparameterKind::Int { low, high, .. }, HyperparameterValue::Int(v)) => (*low..=*high).contains(v),
            (HyperparameterKind::Categorical { choices, .. }, HyperparameterValue::Str(s)) => choices.contains(s),
            (HyperparameterKind::Constant { value }, HyperparameterValue::Str(s)) => value == s,
            (HyperparameterKind::Boolean { .. }, HyperparameterValue::Bool(_)) => true,
            _ => false,
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> HyperparameterValue {
        match &self.kind {
            HyperparameterKind::Float { low, high, log_scale, .. } => {
                let val = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                HyperparameterValue::Float(val.clamp(*low, *high))
            }
            HyperparameterKind::Int { low, high, log_scale, .. } => {
                let val = if *log_scale {
                    let log_low = (*low as f64).ln();
                    let log_high = (*high as f64).ln();
                    ((rng.gen::<f64>() * (log_high - log_low) + log_low).exp().round() as i64).clamp(*low, *high)
                } else {
                    rng.gen_range(*low..=*high)
                };
                HyperparameterValue::Int(val)
            }
            HyperparameterKind::Categorical { choices, .. } => {
                let idx = rng.gen_range(0..choices.len());
                HyperparameterValue::Str(choices[idx].clone())
            }
            HyperparameterKind::Constant { value } => HyperparameterValue::Str(value.clone()),
            HyperparameterKind::Boolean { .. } => HyperparameterValue::Bool(rng.gen()),
        }
    }
}

impl fmt::Display for Hyperparameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            HyperparameterKind::Float { low, high, log_scale, default } => {
                write!(f, "{}, Type: Float, Range: [{:?}, {:?}], Default: {:?}", self.name, low, high, default)?;
                if *log_scale {
                    write!(f, ", on log-scale")?;
                }
                Ok(())
            }
            HyperparameterKind::Int { low, high, log_scale, default } => {
                write!(f, "{}, Type: Int, Range: [{}, {}], Default: {}", self.name, low, high, default)?;
                if *log_scale {
                    write!(f, ", on log-scale")?;
                }
                Ok(())
            }
            HyperparameterKind::Categorical { choices, default } => {
                write!(f, "{}, Type: Categorical, Choices: {{{}}}, Default: {}", self.name, choices.join(", "), default)
            }
            HyperparameterKind::Constant { value } => write!(f, "{}, Type: Constant, Value: {}", self.name, value),
            HyperparameterKind::Boolean { default } => write!(f, "{}, Type: Boolean, Default: {}", self.name, default),
        }
    }
}

/// Concrete value of a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperparameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl HyperparameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            HyperparameterValue::Float(v) => Some(*v),
            HyperparameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HyperparameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HyperparameterValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HyperparameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for HyperparameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperparameterValue::Float(v) => write!(f, "{:?}", v),
            HyperparameterValue::Int(v) => write!(f, "{}", v),
            HyperparameterValue::Str(v) => write!(f, "'{}'", v),
            HyperparameterValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for HyperparameterValue {
    fn from(v: f64) -> Self {
        HyperparameterValue::Float(v)
    }
}

impl From<i64> for HyperparameterValue {
    fn from(v: i64) -> Self {
        HyperparameterValue::Int(v)
    }
}

impl From<bool> for HyperparameterValue {
    fn from(v: bool) -> Self {
        HyperparameterValue::Bool(v)
    }
}

impl From<&str> for HyperparameterValue {
    fn from(v: &str) -> Self {
        HyperparameterValue::Str(v.to_string())
    }
}

impl From<String> for HyperparameterValue {
    fn from(v: String) -> Self {
        HyperparameterValue::Str(v)
    }
}
