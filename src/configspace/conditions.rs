//! Activation conditions and forbidden clauses

use super::hyperparameter::HyperparameterValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// `child` is active only while `parent` is active and takes one of `values`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    child: String,
    parent: String,
    values: Vec<HyperparameterValue>,
}

impl Condition {
    /// Child active iff parent equals `value`
    pub fn equals(child: impl Into<String>, parent: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
            values: vec![value.into()],
        }
    }

    /// Child active iff parent takes any of `values`
    pub fn in_values(child: impl Into<String>, parent: impl Into<String>, values: Vec<HyperparameterValue>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
            values,
        }
    }

    pub fn child(&self) -> &str {
        &self.child
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn values(&self) -> &[HyperparameterValue] {
        &self.values
    }

    /// Evaluate against the parent's value; an inactive parent never satisfies
    pub fn is_satisfied_by(&self, parent_value: Option<&HyperparameterValue>) -> bool {
        parent_value.map_or(false, |v| self.values.contains(v))
    }

    pub(crate) fn renamed(&self, rename: impl Fn(&str) -> String) -> Self {
        Self {
            child: rename(&self.child),
            parent: rename(&self.parent),
            values: self.values.clone(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [value] = self.values.as_slice() {
            write!(f, "{} | {} == {}", self.child, self.parent, value)
        } else {
            let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
            write!(f, "{} | {} in {{{}}}", self.child, self.parent, values.join(", "))
        }
    }
}

/// One `name == value` term of a forbidden clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenTerm {
    pub name: String,
    pub value: HyperparameterValue,
}

/// Conjunction of equalities that no configuration may satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenClause {
    terms: Vec<ForbiddenTerm>,
}

impl ForbiddenClause {
    /// Single equality clause
    pub fn equals(name: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        Self {
            terms: vec![ForbiddenTerm {
                name: name.into(),
                value: value.into(),
            }],
        }
    }

    /// Extend the conjunction with another equality
    pub fn and(mut self, name: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        self.terms.push(ForbiddenTerm {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn terms(&self) -> &[ForbiddenTerm] {
        &self.terms
    }

    /// True when every term holds in `values`
    pub fn is_forbidden(&self, values: &BTreeMap<String, HyperparameterValue>) -> bool {
        self.terms
            .iter()
            .all(|term| values.get(&term.name).map_or(false, |v| *v == term.value))
    }

    pub(crate) fn renamed(&self, rename: impl Fn(&str) -> String) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|t| ForbiddenTerm {
                    name: rename(&t.name),
                    value: t.value.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for ForbiddenClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("Forbidden: {} == {}", t.name, t.value))
            .collect();
        if terms.len() == 1 {
            write!(f, "{}", terms[0])
        } else {
            write!(f, "({})", terms.join(" && "))
        }
    }
}
