//! Hierarchical configuration space

use super::conditions::{Condition, ForbiddenClause};
use super::configuration::Configuration;
use super::hyperparameter::{Hyperparameter, HyperparameterValue};
use crate::error::{KolosalError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Separator between a step prefix and a nested hyperparameter name
pub const SEPARATOR: &str = ":";

const MAX_SAMPLE_ATTEMPTS: usize = 1000;

/// Join a prefix and a name with [`SEPARATOR`]
pub fn qualified_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, SEPARATOR, name)
    }
}

/// Hyperparameters plus the conditions and forbidden clauses over them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSpace {
    hyperparameters: BTreeMap<String, Hyperparameter>,
    /// Keyed by child name; a child has at most one condition
    conditions: BTreeMap<String, Condition>,
    forbidden_clauses: Vec<ForbiddenClause>,
}

impl ConfigurationSpace {
    /// Create a new empty configuration space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hyperparameter; fails on name collision
    pub fn add_hyperparameter(&mut self, hyperparameter: Hyperparameter) -> Result<()> {
        if self.hyperparameters.contains_key(hyperparameter.name()) {
            return Err(KolosalError::ConfigError(format!(
                "Hyperparameter '{}' already in configuration space",
                hyperparameter.name()
            )));
        }
        self.hyperparameters
            .insert(hyperparameter.name().to_string(), hyperparameter);
        Ok(())
    }

    /// Add several hyperparameters
    pub fn add_hyperparameters(&mut self, hyperparameters: impl IntoIterator<Item = Hyperparameter>) -> Result<()> {
        for hp in hyperparameters {
            self.add_hyperparameter(hp)?;
        }
        Ok(())
    }

    /// Add an activation condition
    pub fn add_condition(&mut self, condition: Condition) -> Result<()> {
        let parent = self.hyperparameters.get(condition.parent()).ok_or_else(|| {
            KolosalError::ConfigError(format!("Unknown parent hyperparameter '{}'", condition.parent()))
        })?;
        if !self.hyperparameters.contains_key(condition.child()) {
            return Err(KolosalError::ConfigError(format!(
                "Unknown child hyperparameter '{}'",
                condition.child()
            )));
        }
        if self.conditions.contains_key(condition.child()) {
            return Err(KolosalError::ConfigError(format!(
                "Hyperparameter '{}' already has a condition",
                condition.child()
            )));
        }
        if let Some(bad) = condition.values().iter().find(|v| !parent.is_legal(v)) {
            return Err(KolosalError::ConfigError(format!(
                "Condition value {} is not legal for '{}'",
                bad,
                condition.parent()
            )));
        }
        if condition.parent() == condition.child() || self.ancestors(condition.parent()).contains(condition.child()) {
            return Err(KolosalError::ConfigError(format!(
                "Condition on '{}' would create a cycle",
                condition.child()
            )));
        }
        self.conditions.insert(condition.child().to_string(), condition);
        Ok(())
    }

    /// Add a forbidden clause
    pub fn add_forbidden_clause(&mut self, clause: ForbiddenClause) -> Result<()> {
        if clause.terms().is_empty() {
            return Err(KolosalError::ConfigError("Forbidden clause without terms".to_string()));
        }
        for term in clause.terms() {
            let hp = self.hyperparameters.get(&term.name).ok_or_else(|| {
                KolosalError::ConfigError(format!("Forbidden clause references unknown hyperparameter '{}'", term.name))
            })?;
            if !hp.is_legal(&term.value) {
                return Err(KolosalError::ConfigError(format!(
                    "Forbidden value {} is not legal for '{}'",
                    term.value, term.name
                )));
            }
        }
        if self.forbidden_clauses.contains(&clause) {
            return Err(KolosalError::ConfigError(format!("Duplicate forbidden clause {}", clause)));
        }
        self.forbidden_clauses.push(clause);
        Ok(())
    }

    /// Merge `other` into this space under `prefix`.
    ///
    /// With a `parent`, every hyperparameter of `other` that has no condition of
    /// its own becomes active only while the parent takes the given value. The
    /// merge is all-or-nothing.
    pub fn add_configuration_space(
        &mut self,
        prefix: &str,
        other: &ConfigurationSpace,
        parent: Option<(&str, HyperparameterValue)>,
    ) -> Result<()> {
        let rename = |name: &str| qualified_name(prefix, name);
        let mut merged = self.clone();

        for hp in other.hyperparameters.values() {
            merged.add_hyperparameter(hp.renamed(rename(hp.name())))?;
        }
        for condition in other.conditions.values() {
            merged.add_condition(condition.renamed(rename))?;
        }
        if let Some((parent_name, value)) = parent {
            for name in other.hyperparameters.keys() {
                if !other.conditions.contains_key(name) {
                    merged.add_condition(Condition::equals(rename(name), parent_name, value.clone()))?;
                }
            }
        }
        for clause in &other.forbidden_clauses {
            merged.add_forbidden_clause(clause.renamed(rename))?;
        }

        *self = merged;
        Ok(())
    }

    pub fn get_hyperparameter(&self, name: &str) -> Option<&Hyperparameter> {
        self.hyperparameters.get(name)
    }

    pub fn hyperparameters(&self) -> impl Iterator<Item = &Hyperparameter> {
        self.hyperparameters.values()
    }

    /// Hyperparameter names in sorted order
    pub fn hyperparameter_names(&self) -> Vec<String> {
        self.hyperparameters.keys().cloned().collect()
    }

    pub fn condition_for(&self, child: &str) -> Option<&Condition> {
        self.conditions.get(child)
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values()
    }

    pub fn forbidden_clauses(&self) -> &[ForbiddenClause] {
        &self.forbidden_clauses
    }

    pub fn len(&self) -> usize {
        self.hyperparameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hyperparameters.is_empty()
    }

    fn ancestors(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut current = name;
        while let Some(condition) = self.conditions.get(current) {
            if !seen.insert(condition.parent().to_string()) {
                break;
            }
            current = condition.parent();
        }
        seen
    }

    /// Names ordered so that every parent precedes its children
    pub fn topological_order(&self) -> Vec<&str> {
        let mut order: Vec<(usize, &str)> = self
            .hyperparameters
            .keys()
            .map(|name| (self.ancestors(name).len(), name.as_str()))
            .collect();
        order.sort();
        order.into_iter().map(|(_, name)| name).collect()
    }

    /// Active hyperparameters under a (possibly partial) assignment
    pub fn active_hyperparameters(&self, values: &BTreeMap<String, HyperparameterValue>) -> BTreeSet<String> {
        let mut active = BTreeSet::new();
        for name in self.topological_order() {
            let is_active = match self.conditions.get(name) {
                None => true,
                Some(cond) => active.contains(cond.parent()) && cond.is_satisfied_by(values.get(cond.parent())),
            };
            if is_active {
                active.insert(name.to_string());
            }
        }
        active
    }

    /// First forbidden clause matched by `values`, if any
    pub fn violated_clause(&self, values: &BTreeMap<String, HyperparameterValue>) -> Option<&ForbiddenClause> {
        self.forbidden_clauses.iter().find(|clause| clause.is_forbidden(values))
    }

    /// Assign values to active hyperparameters, parents first
    fn assign_active(&self, mut pick: impl FnMut(&Hyperparameter) -> HyperparameterValue) -> BTreeMap<String, HyperparameterValue> {
        let mut values = BTreeMap::new();
        for name in self.topological_order() {
            let is_active = match self.conditions.get(name) {
                None => true,
                Some(cond) => cond.is_satisfied_by(values.get(cond.parent())),
            };
            if is_active {
                let hp = &self.hyperparameters[name];
                values.insert(name.to_string(), pick(hp));
            }
        }
        values
    }

    /// Configuration made of every active hyperparameter's default
    pub fn default_configuration(self: &Arc<Self>) -> Result<Configuration> {
        let values = self.assign_active(|hp| hp.default_value());
        Configuration::new(Arc::clone(self), values)
    }

    /// Uniformly sample a configuration that satisfies all forbidden clauses
    pub fn sample_configuration(self: &Arc<Self>, rng: &mut impl Rng) -> Result<Configuration> {
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let values = self.assign_active(|hp| hp.sample(rng));
            if self.violated_clause(&values).is_none() {
                return Configuration::new(Arc::clone(self), values);
            }
        }
        warn!(
            attempts = MAX_SAMPLE_ATTEMPTS,
            n_forbidden = self.forbidden_clauses.len(),
            "Could not sample a configuration outside of the forbidden clauses"
        );
        Err(KolosalError::ValidationError(format!(
            "No legal configuration found after {} samples",
            MAX_SAMPLE_ATTEMPTS
        )))
    }

    /// Line diff of the textual forms, `-` for lines only in `self`, `+` for lines only in `other`
    pub fn diff(&self, other: &ConfigurationSpace) -> String {
        let ours = self.to_string();
        let theirs = other.to_string();
        let our_lines: BTreeSet<&str> = ours.lines().collect();
        let their_lines: BTreeSet<&str> = theirs.lines().collect();

        let mut out = vec!["--- expected".to_string(), "+++ supplied".to_string()];
        out.extend(
            ours.lines()
                .filter(|l| !their_lines.contains(l))
                .map(|l| format!("-{}", l)),
        );
        out.extend(
            theirs
                .lines()
                .filter(|l| !our_lines.contains(l))
                .map(|l| format!("+{}", l)),
        );
        out.join("\n")
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for ConfigurationSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration space object:")?;
        writeln!(f, "  Hyperparameters:")?;
        for hp in self.hyperparameters.values() {
            writeln!(f, "    {}", hp)?;
        }
        if !self.conditions.is_empty() {
            writeln!(f, "  Conditions:")?;
            for condition in self.conditions.values() {
                writeln!(f, "    {}", condition)?;
            }
        }
        if !self.forbidden_clauses.is_empty() {
            writeln!(f, "  Forbidden Clauses:")?;
            for clause in &self.forbidden_clauses {
                writeln!(f, "    {}", clause)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn svm_space() -> ConfigurationSpace {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::log_float("C", 0.03, 32768.0, 1.0).unwrap())
            .unwrap();
        cs.add_hyperparameter(Hyperparameter::categorical("kernel", &["rbf", "poly"], None).unwrap())
            .unwrap();
        cs.add_hyperparameter(Hyperparameter::int("degree", 2, 5, 3).unwrap())
            .unwrap();
        cs.add_condition(Condition::equals("degree", "kernel", "poly")).unwrap();
        cs
    }

    #[test]
    fn test_name_collision_fails() {
        let mut cs = svm_space();
        let err = cs
            .add_hyperparameter(Hyperparameter::float("C", 0.1, 1.0, 0.5).unwrap())
            .unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(_)));
    }

    #[test]
    fn test_condition_cycle_rejected() {
        let mut cs = svm_space();
        cs.add_hyperparameter(Hyperparameter::categorical("flag", &["a", "b"], None).unwrap())
            .unwrap();
        cs.add_condition(Condition::equals("flag", "degree", 3i64)).unwrap();
        assert!(cs.add_condition(Condition::equals("kernel", "flag", "a")).is_err());
    }

    #[test]
    fn test_default_respects_conditions() {
        let cs = Arc::new(svm_space());
        let default = cs.default_configuration().unwrap();
        assert_eq!(default.get("kernel"), Some(&HyperparameterValue::from("rbf")));
        assert!(default.get("degree").is_none());
    }

    #[test]
    fn test_add_configuration_space_with_parent() {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::categorical("__choice__", &["svm", "knn"], None).unwrap())
            .unwrap();
        cs.add_configuration_space("svm", &svm_space(), Some(("__choice__", "svm".into())))
            .unwrap();

        assert!(cs.get_hyperparameter("svm:C").is_some());
        assert_eq!(cs.condition_for("svm:C").unwrap().parent(), "__choice__");
        // nested condition keeps its own parent
        assert_eq!(cs.condition_for("svm:degree").unwrap().parent(), "svm:kernel");

        let cs = Arc::new(cs);
        let mut values = BTreeMap::new();
        values.insert("__choice__".to_string(), HyperparameterValue::from("knn"));
        assert_eq!(cs.active_hyperparameters(&values).len(), 1);
    }

    #[test]
    fn test_failed_merge_leaves_space_untouched() {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::float("svm:gamma", 0.1, 1.0, 0.5).unwrap())
            .unwrap();
        let mut sub = svm_space();
        sub.add_hyperparameter(Hyperparameter::float("gamma", 0.1, 1.0, 0.5).unwrap())
            .unwrap();
        let before = cs.clone();
        assert!(cs.add_configuration_space("svm", &sub, None).is_err());
        assert_eq!(cs, before);
    }

    #[test]
    fn test_sampling_avoids_forbidden() {
        let mut cs = ConfigurationSpace::new();
        cs.add_hyperparameter(Hyperparameter::categorical("a", &["x", "y"], None).unwrap())
            .unwrap();
        cs.add_hyperparameter(Hyperparameter::categorical("b", &["x", "y"], Some("y")).unwrap())
            .unwrap();
        cs.add_forbidden_clause(ForbiddenClause::equals("a", "x").and("b", "x"))
            .unwrap();
        let cs = Arc::new(cs);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..50 {
            let config = cs.sample_configuration(&mut rng).unwrap();
            assert!(!(config.get("a") == Some(&"x".into()) && config.get("b") == Some(&"x".into())));
        }
    }

    #[test]
    fn test_diff_lists_changed_lines() {
        let a = svm_space();
        let mut b = svm_space();
        b.add_hyperparameter(Hyperparameter::boolean("shrinking", true)).unwrap();
        let diff = a.diff(&b);
        assert!(diff.contains("+    shrinking, Type: Boolean, Default: true"));
        assert!(!diff.contains("-    C,"));
    }

    #[test]
    fn test_json_roundtrip_preserves_equality() {
        let cs = svm_space();
        let restored = ConfigurationSpace::from_json(&cs.to_json().unwrap()).unwrap();
        assert_eq!(cs, restored);
    }
}
