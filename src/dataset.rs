//! Dataset properties relevant to compatibility decisions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a single dataset property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Str(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

/// Learning task the dataset targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    Classification,
    Regression,
}

/// Descriptive flags about the input data (`sparse`, `signed`, `multiclass`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetProperties {
    values: BTreeMap<String, PropertyValue>,
}

impl DatasetProperties {
    pub const SPARSE: &'static str = "sparse";
    pub const SIGNED: &'static str = "signed";
    pub const MULTICLASS: &'static str = "multiclass";
    pub const MULTILABEL: &'static str = "multilabel";
    pub const TARGET_TYPE: &'static str = "target_type";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a property
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy with `sparse = false` and `signed = false` filled in when unset
    pub fn with_defaults(&self) -> Self {
        let mut props = self.clone();
        props
            .values
            .entry(Self::SPARSE.to_string())
            .or_insert(PropertyValue::Bool(false));
        props
            .values
            .entry(Self::SIGNED.to_string())
            .or_insert(PropertyValue::Bool(false));
        props
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(PropertyValue::Bool(true)))
    }

    pub fn sparse(&self) -> bool {
        self.flag(Self::SPARSE)
    }

    pub fn signed(&self) -> bool {
        self.flag(Self::SIGNED)
    }

    pub fn multiclass(&self) -> bool {
        self.flag(Self::MULTICLASS)
    }

    pub fn multilabel(&self) -> bool {
        self.flag(Self::MULTILABEL)
    }

    /// Target type, when declared as `"classification"` or `"regression"`
    pub fn target_type(&self) -> Option<TargetType> {
        match self.values.get(Self::TARGET_TYPE) {
            Some(PropertyValue::Str(s)) if s.eq_ignore_ascii_case("classification") => Some(TargetType::Classification),
            Some(PropertyValue::Str(s)) if s.eq_ignore_ascii_case("regression") => Some(TargetType::Regression),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for DatasetProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("'{}': {}", k, v))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}
